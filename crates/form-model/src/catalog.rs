//! Immutable element catalog built from a [`FormSpec`].
//!
//! Elements live in an arena owned by [`FormDefinition`] and refer to each other
//! through [`ElementId`]s, so parent links never form ownership cycles. The
//! root is a synthetic top-level group named after the form id; every other
//! element has exactly one parent.

use std::collections::BTreeSet;
use std::ops::Index;

use thiserror::Error;

use crate::spec::{ElementSpec, ElementType, FormSpec};

/// Handle to an element inside a [`FormDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(usize);

/// Data types of leaf fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Select,
    GeoPoint,
    Binary,
}

/// Structural role of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Group,
    Repeat,
    Field(FieldType),
}

impl From<ElementType> for ElementKind {
    fn from(kind: ElementType) -> Self {
        match kind {
            ElementType::Group => ElementKind::Group,
            ElementType::Repeat => ElementKind::Repeat,
            ElementType::String => ElementKind::Field(FieldType::String),
            ElementType::Integer => ElementKind::Field(FieldType::Integer),
            ElementType::Decimal => ElementKind::Field(FieldType::Decimal),
            ElementType::Boolean => ElementKind::Field(FieldType::Boolean),
            ElementType::Date => ElementKind::Field(FieldType::Date),
            ElementType::DateTime => ElementKind::Field(FieldType::DateTime),
            ElementType::Select => ElementKind::Field(FieldType::Select),
            ElementType::Geopoint => ElementKind::Field(FieldType::GeoPoint),
            ElementType::Binary => ElementKind::Field(FieldType::Binary),
        }
    }
}

/// Node in the schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FormElement {
    id: ElementId,
    name: String,
    label: Option<String>,
    kind: ElementKind,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl FormElement {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Label when present, otherwise the element name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn field_type(&self) -> Option<FieldType> {
        match self.kind {
            ElementKind::Field(field_type) => Some(field_type),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self.kind, ElementKind::Repeat)
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, ElementKind::Field(_))
    }
}

/// Errors raised while building the element catalog.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("form id must not be empty")]
    EmptyFormId,
    #[error("invalid element name '{name}' under '{parent}'")]
    InvalidName { parent: String, name: String },
    #[error("duplicate element '{name}' under '{parent}'")]
    DuplicateName { parent: String, name: String },
    #[error("field '{path}' declares children but is not a group or repeat")]
    ChildrenOnField { path: String },
}

/// Parsed, immutable form definition.
#[derive(Debug, Clone)]
pub struct FormDefinition {
    form_id: String,
    title: String,
    version: Option<String>,
    elements: Vec<FormElement>,
}

impl FormDefinition {
    /// Build the catalog, validating names and structure.
    pub fn from_spec(spec: &FormSpec) -> Result<Self, CatalogError> {
        if spec.id.trim().is_empty() {
            return Err(CatalogError::EmptyFormId);
        }

        let mut form = Self {
            form_id: spec.id.clone(),
            title: spec.title.clone(),
            version: spec.version.clone(),
            elements: vec![FormElement {
                id: ElementId(0),
                name: spec.id.clone(),
                label: Some(spec.title.clone()),
                kind: ElementKind::Group,
                parent: None,
                children: Vec::new(),
            }],
        };
        let root = form.root();
        form.add_children(root, &spec.elements)?;
        Ok(form)
    }

    fn add_children(
        &mut self,
        parent: ElementId,
        specs: &[ElementSpec],
    ) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for spec in specs {
            if spec.name.trim().is_empty() || spec.name.contains('/') {
                return Err(CatalogError::InvalidName {
                    parent: self.path(parent),
                    name: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(CatalogError::DuplicateName {
                    parent: self.path(parent),
                    name: spec.name.clone(),
                });
            }

            let id = ElementId(self.elements.len());
            self.elements.push(FormElement {
                id,
                name: spec.name.clone(),
                label: spec.label.clone(),
                kind: spec.kind.into(),
                parent: Some(parent),
                children: Vec::new(),
            });
            self.elements[parent.0].children.push(id);

            if spec.kind.is_container() {
                self.add_children(id, &spec.children)?;
            } else if !spec.children.is_empty() {
                return Err(CatalogError::ChildrenOnField {
                    path: self.path(id),
                });
            }
        }
        Ok(())
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Viewable name of the form.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn top_level_group(&self) -> &FormElement {
        &self.elements[0]
    }

    pub fn get(&self, id: ElementId) -> Option<&FormElement> {
        self.elements.get(id.0)
    }

    pub fn element(&self, id: ElementId) -> &FormElement {
        &self.elements[id.0]
    }

    pub fn parent(&self, id: ElementId) -> Option<&FormElement> {
        self.get(id)
            .and_then(FormElement::parent)
            .map(|parent| self.element(parent))
    }

    pub fn children(&self, id: ElementId) -> impl Iterator<Item = &FormElement> {
        self.get(id)
            .map(FormElement::children)
            .unwrap_or_default()
            .iter()
            .map(|child| self.element(*child))
    }

    /// True when `ancestor` is a strict ancestor of `id`.
    pub fn is_descendant_of(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut current = self.get(id).and_then(FormElement::parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.element(parent).parent;
        }
        false
    }

    /// Nearest repeat ancestor, or the root. Field values are stored in the
    /// submission set of this element.
    pub fn enclosing_set(&self, id: ElementId) -> ElementId {
        let mut current = self.get(id).and_then(FormElement::parent);
        while let Some(parent) = current {
            let element = self.element(parent);
            if element.is_repeat() || element.parent.is_none() {
                return parent;
            }
            current = element.parent;
        }
        self.root()
    }

    /// Resolve a slash separated name path relative to the root, e.g. `visits/gps`.
    pub fn find(&self, path: &str) -> Option<ElementId> {
        let mut current = self.root();
        let mut segments = path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .peekable();
        segments.peek()?;
        for segment in segments {
            current = self
                .children(current)
                .find(|child| child.name == segment)?
                .id;
        }
        Some(current)
    }

    /// Slash separated path of `id` relative to the root. The root's path is empty.
    pub fn path(&self, id: ElementId) -> String {
        let mut names = Vec::new();
        let mut current = self.get(id);
        while let Some(element) = current {
            if element.parent.is_none() {
                break;
            }
            names.push(element.name.as_str());
            current = element.parent.and_then(|parent| self.get(parent));
        }
        names.reverse();
        names.join("/")
    }

    /// Every leaf field in schema order.
    pub fn fields(&self) -> impl Iterator<Item = &FormElement> {
        let mut ordered = Vec::new();
        self.collect_fields(self.root(), &mut ordered);
        ordered.into_iter()
    }

    fn collect_fields<'a>(&'a self, id: ElementId, out: &mut Vec<&'a FormElement>) {
        for child in self.children(id) {
            if child.is_field() {
                out.push(child);
            } else {
                self.collect_fields(child.id, out);
            }
        }
    }

    /// Every element except the root, in schema order.
    pub fn elements(&self) -> impl Iterator<Item = &FormElement> {
        self.elements.iter().skip(1)
    }
}

impl Index<ElementId> for FormDefinition {
    type Output = FormElement;

    fn index(&self, id: ElementId) -> &Self::Output {
        self.element(id)
    }
}
