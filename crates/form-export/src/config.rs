use std::fs;
use std::path::{Path, PathBuf};

use form_model::{ColumnSelection, ElementId, FormDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AnchorRole;
use crate::export::FailurePolicy;
use crate::kml::KmlAnchors;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid export config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("'{path}' is not an element of this form")]
    UnknownField { path: String },
    #[error("no {anchor} field configured")]
    MissingAnchor { anchor: AnchorRole },
    #[error("no base url configured")]
    MissingBaseUrl,
}

/// Export settings as written in `export.toml`.
///
/// ```toml
/// base_url = "https://aggregate.example.org"
/// columns = ["visits/caption", "visits/notes"]
/// on_error = "skip"
///
/// [kml]
/// location = "visits/gps"
/// title = "visits/caption"
/// image = "visits/photo"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Field paths shown in the data table. Empty selects every field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub on_error: FailurePolicy,
    #[serde(default)]
    pub kml: KmlConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KmlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Configuration with every path resolved against a form.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExport {
    pub base_url: String,
    pub anchors: KmlAnchors,
    pub columns: ColumnSelection,
    pub on_error: FailurePolicy,
}

impl ExportConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn resolve(&self, form: &FormDefinition) -> Result<ResolvedExport, ConfigError> {
        let base_url = self
            .base_url
            .clone()
            .ok_or(ConfigError::MissingBaseUrl)?;
        let location = required(form, AnchorRole::Location, self.kml.location.as_deref())?;
        let title = required(form, AnchorRole::Title, self.kml.title.as_deref())?;
        let image = self
            .kml
            .image
            .as_deref()
            .map(|path| lookup(form, path))
            .transpose()?;

        let columns = if self.columns.is_empty() {
            ColumnSelection::all()
        } else {
            ColumnSelection::only(
                self.columns
                    .iter()
                    .map(|path| lookup(form, path))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        };

        Ok(ResolvedExport {
            base_url,
            anchors: KmlAnchors {
                location,
                title,
                image,
            },
            columns,
            on_error: self.on_error,
        })
    }
}

fn required(
    form: &FormDefinition,
    anchor: AnchorRole,
    path: Option<&str>,
) -> Result<ElementId, ConfigError> {
    let path = path.ok_or(ConfigError::MissingAnchor { anchor })?;
    lookup(form, path)
}

fn lookup(form: &FormDefinition, path: &str) -> Result<ElementId, ConfigError> {
    form.find(path).ok_or_else(|| ConfigError::UnknownField {
        path: path.to_string(),
    })
}
