//! KML fragments rendered through handlebars.
//!
//! Double-brace substitutions go through [`escape_xml`]; triple-brace
//! substitutions carry markup that was already rendered.

use handlebars::Handlebars;
use serde_json::json;
use thiserror::Error;

/// Style shared by every placemark in a document.
pub const PLACEMARK_STYLE: &str = "placemark";

/// Names of the `<Data>` elements, referenced from the balloon as `$[name]`.
pub const TITLE_VARIABLE: &str = "title";
pub const IMAGE_VARIABLE: &str = "image";
pub const DATA_VARIABLE: &str = "data";

const PREAMBLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document id="{{form_id}}">
<name>{{title}}</name>
<open>1</open>
"#;

const STYLE: &str = r#"<Style id="{{style_id}}">
<BalloonStyle>
<text><![CDATA[{{{html}}}]]></text>
</BalloonStyle>
</Style>
"#;

const BALLOON: &str = concat!(
    r#"<table width="300" cellpadding="2" cellspacing="0">"#,
    r#"<tr><td><h2>$[title]</h2></td></tr>"#,
    r#"{{#if image}}<tr><td><img style="max-width:300px" src="$[image]"/></td></tr>{{/if}}"#,
    r#"<tr><td>$[data]</td></tr>"#,
    r#"</table>"#
);

const PLACEMARK: &str = r#"<Placemark id="{{id}}">
<name>{{name}}</name>
<styleUrl>#{{style_id}}</styleUrl>
<ExtendedData>
{{{title}}}{{{image}}}{{{data}}}</ExtendedData>
{{{geometry}}}</Placemark>
"#;

const DATA_ELEMENT: &str = r#"<Data name="{{name}}">
<value>{{value}}</value>
</Data>
"#;

const DATA_TABLE: &str = concat!(
    r#"<table border="1" cellpadding="2" style="border-collapse:collapse">"#,
    r#"<tr><th>Question</th><th>Response</th></tr>"#,
    r#"{{#each rows}}{{{this}}}{{/each}}"#,
    r#"</table>"#
);

const POINT: &str = r#"<Point>
<coordinates>{{coordinates}}</coordinates>
</Point>
"#;

const POSTAMBLE: &str = r#"</Document>
</kml>
"#;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to register template '{name}': {message}")]
    Register { name: &'static str, message: String },
    #[error("failed to render template '{name}': {message}")]
    Render { name: &'static str, message: String },
}

/// Pieces of one `<Placemark>`. Optional parts are pre-rendered and empty
/// when absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacemarkParts<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub title: &'a str,
    pub image: &'a str,
    pub data: &'a str,
    pub geometry: &'a str,
}

pub struct KmlTemplates {
    handlebars: Handlebars<'static>,
}

impl KmlTemplates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(escape_xml);
        for (name, source) in [
            ("preamble", PREAMBLE),
            ("style", STYLE),
            ("balloon", BALLOON),
            ("placemark", PLACEMARK),
            ("data_element", DATA_ELEMENT),
            ("data_table", DATA_TABLE),
            ("point", POINT),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|err| TemplateError::Register {
                    name,
                    message: err.to_string(),
                })?;
        }
        Ok(Self { handlebars })
    }

    pub fn preamble(&self, form_id: &str, title: &str) -> Result<String, TemplateError> {
        self.render("preamble", &json!({ "form_id": form_id, "title": title }))
    }

    /// Placemark style whose balloon shows the title, the image when the
    /// export has one, and the data table.
    pub fn style(&self, has_image: bool) -> Result<String, TemplateError> {
        let html = self.render("balloon", &json!({ "image": has_image }))?;
        self.render("style", &json!({ "style_id": PLACEMARK_STYLE, "html": html }))
    }

    pub fn placemark(&self, parts: &PlacemarkParts<'_>) -> Result<String, TemplateError> {
        self.render(
            "placemark",
            &json!({
                "id": parts.id,
                "name": parts.name,
                "style_id": PLACEMARK_STYLE,
                "title": parts.title,
                "image": parts.image,
                "data": parts.data,
                "geometry": parts.geometry,
            }),
        )
    }

    pub fn data_element(&self, name: &str, value: &str) -> Result<String, TemplateError> {
        self.render("data_element", &json!({ "name": name, "value": value }))
    }

    /// HTML table with a header row wrapping already formatted table rows.
    pub fn data_table<'r>(
        &self,
        rows: impl IntoIterator<Item = &'r str>,
    ) -> Result<String, TemplateError> {
        let rows = rows.into_iter().collect::<Vec<_>>();
        self.render("data_table", &json!({ "rows": rows }))
    }

    /// Point geometry; `coordinates` is `(longitude, latitude, altitude)`.
    pub fn point(&self, coordinates: (f64, f64, f64)) -> Result<String, TemplateError> {
        let (longitude, latitude, altitude) = coordinates;
        self.render(
            "point",
            &json!({ "coordinates": format!("{},{},{}", longitude, latitude, altitude) }),
        )
    }

    pub fn postamble(&self) -> &'static str {
        POSTAMBLE
    }

    fn render(
        &self,
        name: &'static str,
        data: &serde_json::Value,
    ) -> Result<String, TemplateError> {
        self.handlebars
            .render(name, data)
            .map_err(|err| TemplateError::Render {
                name,
                message: err.to_string(),
            })
    }
}

/// Escape text for XML content and attribute values. Also valid for HTML.
pub fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
