#![allow(missing_docs)]

pub mod cli;
pub mod config;
pub mod element;
pub mod error;
pub mod export;
pub mod format;
pub mod kml;
pub mod link;
pub mod templates;

pub use config::{ConfigError, ExportConfig, KmlConfig, ResolvedExport};
pub use element::KmlElementFormatter;
pub use error::{AnchorRole, ExportError, KmlConfigError};
pub use export::{ExportDriver, ExportSummary, FailurePolicy, SkippedRecord};
pub use format::SubmissionFormatter;
pub use kml::{KmlAnchors, KmlFormatter};
pub use link::{LinkBuilder, LinkError};
pub use templates::{KmlTemplates, TemplateError, escape_xml};
