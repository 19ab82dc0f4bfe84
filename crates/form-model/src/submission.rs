use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::catalog::{ElementId, ElementKind, FormDefinition};
use crate::value::FieldValue;

/// Identifier of a top-level record or of one repeat-group instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmissionKey(String);

impl SubmissionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key of the `ordinal`-th (1-based) instance of `repeat` under this key.
    pub fn instance(&self, repeat: &str, ordinal: usize) -> Self {
        Self(format!("{}/{}[{}]", self.0, repeat, ordinal))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values of one submission scope: the top-level record or a repeat instance.
///
/// Fields nested in plain groups are stored in the enclosing set; repeat
/// groups hold their instances as child sets.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSet {
    key: SubmissionKey,
    element: ElementId,
    values: BTreeMap<ElementId, FieldValue>,
    repeats: BTreeMap<ElementId, Vec<SubmissionSet>>,
}

impl SubmissionSet {
    pub fn new(key: SubmissionKey, element: ElementId) -> Self {
        Self {
            key,
            element,
            values: BTreeMap::new(),
            repeats: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &SubmissionKey {
        &self.key
    }

    /// Schema element this set instantiates (the root or a repeat group).
    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn element_value(&self, element: ElementId) -> Option<&FieldValue> {
        self.values.get(&element)
    }

    pub fn repeat_instances(&self, repeat: ElementId) -> &[SubmissionSet] {
        self.repeats
            .get(&repeat)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, element: ElementId, value: FieldValue) {
        self.values.insert(element, value);
    }

    pub fn push_instance(&mut self, repeat: ElementId, instance: SubmissionSet) {
        self.repeats.entry(repeat).or_default().push(instance);
    }
}

/// One top-level record.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    set: SubmissionSet,
}

/// Structural errors while decoding a submission document.
#[derive(Debug, Error, PartialEq)]
pub enum SubmissionError {
    #[error("submission document must be an object")]
    NotAnObject,
    #[error("submission is missing its 'id'")]
    MissingId,
    #[error("submission '{key}' has no 'data' object")]
    MissingData { key: String },
    #[error("'{path}' in submission '{key}' must be an object")]
    ExpectedObject { key: String, path: String },
    #[error("'{path}' in submission '{key}' must be an array of instances")]
    ExpectedArray { key: String, path: String },
}

impl Submission {
    pub fn new(set: SubmissionSet) -> Self {
        Self { set }
    }

    pub fn key(&self) -> &SubmissionKey {
        self.set.key()
    }

    pub fn set(&self) -> &SubmissionSet {
        &self.set
    }

    /// Decode `{ "id": "...", "data": { ... } }` against the form's schema.
    ///
    /// Nested objects are plain groups, arrays of objects are repeat-group
    /// instances. Keys with no matching element are skipped.
    pub fn from_json(form: &FormDefinition, document: &Value) -> Result<Self, SubmissionError> {
        let document = document.as_object().ok_or(SubmissionError::NotAnObject)?;
        let key = document
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or(SubmissionError::MissingId)?;
        let key = SubmissionKey::new(key);
        let data = document
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| SubmissionError::MissingData {
                key: key.to_string(),
            })?;

        let mut set = SubmissionSet::new(key, form.root());
        decode_scope(form, form.root(), data, &mut set)?;
        Ok(Self { set })
    }
}

fn decode_scope(
    form: &FormDefinition,
    scope: ElementId,
    data: &Map<String, Value>,
    set: &mut SubmissionSet,
) -> Result<(), SubmissionError> {
    for (name, raw) in data {
        let Some(element) = form.children(scope).find(|child| child.name() == name) else {
            warn!(
                submission = %set.key,
                path = %join_path(&form.path(scope), name),
                "skipping answer with no matching form element"
            );
            continue;
        };
        let id = element.id();

        match element.kind() {
            ElementKind::Field(field_type) => {
                if let Some(value) = FieldValue::from_json(field_type, raw) {
                    set.set_value(id, value);
                }
            }
            ElementKind::Group => {
                if raw.is_null() {
                    continue;
                }
                let nested = raw.as_object().ok_or_else(|| SubmissionError::ExpectedObject {
                    key: set.key.to_string(),
                    path: form.path(id),
                })?;
                decode_scope(form, id, nested, set)?;
            }
            ElementKind::Repeat => {
                if raw.is_null() {
                    continue;
                }
                let entries = raw.as_array().ok_or_else(|| SubmissionError::ExpectedArray {
                    key: set.key.to_string(),
                    path: form.path(id),
                })?;
                for (idx, entry) in entries.iter().enumerate() {
                    let entry = entry.as_object().ok_or_else(|| SubmissionError::ExpectedObject {
                        key: set.key.to_string(),
                        path: format!("{}[{}]", form.path(id), idx + 1),
                    })?;
                    let mut instance =
                        SubmissionSet::new(set.key.instance(element.name(), idx + 1), id);
                    decode_scope(form, id, entry, &mut instance)?;
                    set.push_instance(id, instance);
                }
            }
        }
    }
    Ok(())
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
