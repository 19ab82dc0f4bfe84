use std::fmt;

use form_model::{StoreError, TraversalError};
use thiserror::Error;

use crate::link::LinkError;
use crate::templates::TemplateError;

/// Role a configured field plays in placemark output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRole {
    Location,
    Title,
    Image,
}

impl fmt::Display for AnchorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnchorRole::Location => "location",
            AnchorRole::Title => "title",
            AnchorRole::Image => "image",
        })
    }
}

/// Invalid placemark formatter configuration. Raised once, at construction.
#[derive(Debug, Error)]
pub enum KmlConfigError {
    #[error(
        "limitation: {anchor} field '{path}' must be in the submission (top-level) or in the same repeat group as the location"
    )]
    NotCoLocated { anchor: AnchorRole, path: String },
    #[error("{anchor} anchor does not belong to this form")]
    UnknownAnchor { anchor: AnchorRole },
    #[error("{anchor} anchor '{path}' is a group, not a field")]
    AnchorIsGroup { anchor: AnchorRole, path: String },
    #[error("location field '{path}' is not a geopoint")]
    LocationNotGeoPoint { path: String },
    #[error("location field '{path}' must be top-level or directly inside a repeat group")]
    LocationOutsideRepeat { path: String },
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Failures while exporting a sequence of records.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Config(#[from] KmlConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("failed to write export output: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// True for failures scoped to one record, which an export driver may skip.
    ///
    /// Reader failures and an exhausted source end the stream, so they are not
    /// record errors.
    pub fn is_record_error(&self) -> bool {
        match self {
            ExportError::Store(
                StoreError::Decode { .. } | StoreError::Json { .. } | StoreError::Encoding { .. },
            ) => true,
            ExportError::Traversal(_) => true,
            _ => false,
        }
    }
}
