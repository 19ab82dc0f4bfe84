#![allow(missing_docs)]

pub mod catalog;
pub mod row;
pub mod spec;
pub mod store;
pub mod submission;
pub mod traverse;
pub mod value;

pub use catalog::{CatalogError, ElementId, ElementKind, FieldType, FormDefinition, FormElement};
pub use row::{Column, Row};
pub use spec::{ElementSpec, ElementType, FormSpec, form_spec_schema};
pub use store::{InMemorySubmissions, NdjsonSubmissions, StoreError, SubmissionSource};
pub use submission::{Submission, SubmissionError, SubmissionKey, SubmissionSet};
pub use traverse::{
    ColumnSelection, ElementFormatter, FlattenRepeats, FormatError, RepeatCallback, Traversal,
    TraversalError,
};
pub use value::{BlobKey, FieldValue, GeoPoint};
