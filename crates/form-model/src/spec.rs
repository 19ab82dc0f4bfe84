use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Element types a form definition may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Group,
    Repeat,
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Select,
    Geopoint,
    Binary,
}

impl ElementType {
    pub fn is_container(self) -> bool {
        matches!(self, ElementType::Group | ElementType::Repeat)
    }
}

/// Declaration of a single element inside a form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ElementSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// Leaf field shorthand.
    pub fn field(name: impl Into<String>, kind: ElementType) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            children: Vec::new(),
        }
    }

    /// Container shorthand for groups and repeats.
    pub fn container(
        name: impl Into<String>,
        kind: ElementType,
        children: Vec<ElementSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            children,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Top-level form definition as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub elements: Vec<ElementSpec>,
}

/// JSON Schema describing the form definition format.
pub fn form_spec_schema() -> Result<Value, serde_json::Error> {
    let schema = schemars::schema_for!(FormSpec);
    serde_json::to_value(schema)
}
