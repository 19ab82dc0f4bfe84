//! Format-agnostic walk of a submission tree into rows.
//!
//! The walker owns tree traversal; output formats plug in through two seams:
//! an [`ElementFormatter`] that renders one field into the current row, and a
//! [`RepeatCallback`] that decides what happens to the rows of a repeat
//! group's instances. [`FlattenRepeats`] merges them into the enclosing row;
//! exporters that fan out one output unit per instance intercept them instead.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::catalog::{ElementId, ElementKind, FormDefinition, FormElement};
use crate::row::Row;
use crate::submission::SubmissionSet;
use crate::value::FieldValue;

/// Error raised by an [`ElementFormatter`].
#[derive(Debug, Error, PartialEq)]
#[error("failed to format '{element}': {message}")]
pub struct FormatError {
    pub element: String,
    pub message: String,
}

impl FormatError {
    pub fn new(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while walking a submission.
#[derive(Debug, Error, PartialEq)]
pub enum TraversalError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("submission set '{key}' refers to an element outside the form")]
    UnknownElement { key: String },
}

/// Renders one field of a submission scope into a row.
pub trait ElementFormatter {
    fn format_field(
        &self,
        element: &FormElement,
        value: Option<&FieldValue>,
        set: &SubmissionSet,
        row: &mut Row,
    ) -> Result<(), FormatError>;
}

/// Handles the instances of one repeat group met while walking a scope.
///
/// `row` is the row accumulated so far for the enclosing scope. Instance rows
/// are produced with `traversal.render(instance, self)`.
pub trait RepeatCallback {
    fn process_repeats(
        &mut self,
        traversal: &Traversal<'_>,
        repeat: &FormElement,
        instances: &[SubmissionSet],
        row: &mut Row,
    ) -> Result<(), TraversalError>;
}

/// Merges every instance row into the enclosing row.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlattenRepeats;

impl RepeatCallback for FlattenRepeats {
    fn process_repeats(
        &mut self,
        traversal: &Traversal<'_>,
        _repeat: &FormElement,
        instances: &[SubmissionSet],
        row: &mut Row,
    ) -> Result<(), TraversalError> {
        for instance in instances {
            let instance_row = traversal.render(instance, self)?;
            row.add_data_from_row(&instance_row);
        }
        Ok(())
    }
}

/// Which fields become columns and which repeat groups are walked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnSelection {
    fields: Option<BTreeSet<ElementId>>,
    required: BTreeSet<ElementId>,
}

impl ColumnSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(fields: impl IntoIterator<Item = ElementId>) -> Self {
        Self {
            fields: Some(fields.into_iter().collect()),
            required: BTreeSet::new(),
        }
    }

    /// Always walk `repeat`, even when none of its fields are selected.
    pub fn require(&mut self, repeat: ElementId) {
        self.required.insert(repeat);
    }

    pub fn is_all(&self) -> bool {
        self.fields.is_none()
    }

    pub fn includes_field(&self, field: ElementId) -> bool {
        self.fields
            .as_ref()
            .is_none_or(|fields| fields.contains(&field))
    }

    pub fn walks_repeat(&self, form: &FormDefinition, repeat: ElementId) -> bool {
        match &self.fields {
            None => true,
            Some(fields) => {
                self.required.contains(&repeat)
                    || self
                        .required
                        .iter()
                        .any(|required| form.is_descendant_of(*required, repeat))
                    || fields
                        .iter()
                        .any(|field| form.is_descendant_of(*field, repeat))
            }
        }
    }
}

/// A configured walk: form schema, column selection and field renderer.
pub struct Traversal<'a> {
    form: &'a FormDefinition,
    columns: &'a ColumnSelection,
    formatter: &'a dyn ElementFormatter,
}

impl<'a> Traversal<'a> {
    pub fn new(
        form: &'a FormDefinition,
        columns: &'a ColumnSelection,
        formatter: &'a dyn ElementFormatter,
    ) -> Self {
        Self {
            form,
            columns,
            formatter,
        }
    }

    pub fn form(&self) -> &'a FormDefinition {
        self.form
    }

    /// Render `set` into a fresh row, handing each repeat group to `callback`.
    pub fn render<C>(&self, set: &SubmissionSet, callback: &mut C) -> Result<Row, TraversalError>
    where
        C: RepeatCallback + ?Sized,
    {
        if self.form.get(set.element()).is_none() {
            return Err(TraversalError::UnknownElement {
                key: set.key().to_string(),
            });
        }
        let mut row = Row::new();
        self.walk(set, set.element(), &mut row, callback)?;
        Ok(row)
    }

    fn walk<C>(
        &self,
        set: &SubmissionSet,
        scope: ElementId,
        row: &mut Row,
        callback: &mut C,
    ) -> Result<(), TraversalError>
    where
        C: RepeatCallback + ?Sized,
    {
        for child in self.form.children(scope) {
            match child.kind() {
                ElementKind::Field(_) => {
                    if self.columns.includes_field(child.id()) {
                        self.formatter.format_field(
                            child,
                            set.element_value(child.id()),
                            set,
                            row,
                        )?;
                    }
                }
                ElementKind::Group => self.walk(set, child.id(), row, callback)?,
                ElementKind::Repeat => {
                    if self.columns.walks_repeat(self.form, child.id()) {
                        let instances = set.repeat_instances(child.id());
                        callback.process_repeats(self, child, instances, row)?;
                    }
                }
            }
        }
        Ok(())
    }
}
