use form_model::{ElementFormatter, FieldValue, FormElement, FormatError, Row, SubmissionSet};

use crate::link::LinkBuilder;
use crate::templates::escape_xml;

/// Renders each field as one row of the balloon's HTML data table.
#[derive(Debug, Clone)]
pub struct KmlElementFormatter {
    links: LinkBuilder,
}

impl KmlElementFormatter {
    pub fn new(links: LinkBuilder) -> Self {
        Self { links }
    }

    fn cell(&self, value: Option<&FieldValue>) -> String {
        match value {
            None => String::new(),
            Some(FieldValue::Blob(key)) => format!(
                r#"<img style="max-width:150px" src="{}"/>"#,
                escape_xml(&self.links.binary_data_url(key))
            ),
            Some(other) => escape_xml(&other.to_string()),
        }
    }
}

impl ElementFormatter for KmlElementFormatter {
    fn format_field(
        &self,
        element: &FormElement,
        value: Option<&FieldValue>,
        _set: &SubmissionSet,
        row: &mut Row,
    ) -> Result<(), FormatError> {
        let formatted = format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_xml(element.display_name()),
            self.cell(value)
        );
        row.push(element.name(), formatted, value.cloned());
        Ok(())
    }
}
