use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::FieldType;

/// Geographic point captured by a form.
///
/// Latitude and longitude are independently optional because collectors may
/// record a partial fix; a point is only renderable when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude: None,
            accuracy: None,
        }
    }

    /// `(longitude, latitude, altitude)` with altitude defaulting to zero, or
    /// `None` unless both latitude and longitude are known and finite.
    pub fn coordinates(&self) -> Option<(f64, f64, f64)> {
        let latitude = self.latitude.filter(|value| value.is_finite())?;
        let longitude = self.longitude.filter(|value| value.is_finite())?;
        let altitude = self.altitude.filter(|value| value.is_finite());
        Some((longitude, latitude, altitude.unwrap_or(0.0)))
    }

    /// Parse the collector text encoding `"lat lon [alt [accuracy]]"`.
    ///
    /// Every part must be a finite number; `NaN` and infinities are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let parts = text
            .split_whitespace()
            .map(|part| part.parse::<f64>().ok().filter(|value| value.is_finite()))
            .collect::<Option<Vec<_>>>()?;
        if parts.len() < 2 || parts.len() > 4 {
            return None;
        }
        Some(Self {
            latitude: Some(parts[0]),
            longitude: Some(parts[1]),
            altitude: parts.get(2).copied(),
            accuracy: parts.get(3).copied(),
        })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                write!(f, "{}, {}", latitude, longitude)?;
                if let Some(altitude) = self.altitude {
                    write!(f, ", {}", altitude)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Content-addressed reference to binary data (photos, audio) stored with a submission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed value held by a submission field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(String),
    Choices(Vec<String>),
    GeoPoint(GeoPoint),
    Blob(BlobKey),
}

impl FieldValue {
    pub fn as_geo_point(&self) -> Option<&GeoPoint> {
        match self {
            FieldValue::GeoPoint(point) => Some(point),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&BlobKey> {
        match self {
            FieldValue::Blob(key) => Some(key),
            _ => None,
        }
    }

    /// Caption text for scalar values. Points and binary references have none.
    pub fn display_text(&self) -> Option<String> {
        match self {
            FieldValue::GeoPoint(_) | FieldValue::Blob(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Decode a raw JSON answer for a field of the given type.
    ///
    /// Values that cannot be coerced are kept as text (or `None` for JSON
    /// null), so an ill-typed answer degrades instead of failing the record.
    pub fn from_json(field_type: FieldType, raw: &Value) -> Option<Self> {
        if raw.is_null() {
            return None;
        }
        let coerced = match field_type {
            FieldType::String => raw.as_str().map(|text| FieldValue::Text(text.to_string())),
            FieldType::Integer => raw
                .as_i64()
                .or_else(|| raw.as_str().and_then(|text| text.trim().parse().ok()))
                .map(FieldValue::Integer),
            FieldType::Decimal => raw
                .as_f64()
                .or_else(|| raw.as_str().and_then(|text| text.trim().parse().ok()))
                .map(FieldValue::Decimal),
            FieldType::Boolean => raw
                .as_bool()
                .or_else(|| match raw.as_str() {
                    Some("true") | Some("1") => Some(true),
                    Some("false") | Some("0") => Some(false),
                    _ => None,
                })
                .map(FieldValue::Boolean),
            FieldType::Date | FieldType::DateTime => {
                raw.as_str().map(|text| FieldValue::Date(text.to_string()))
            }
            FieldType::Select => match raw {
                Value::Array(items) => Some(FieldValue::Choices(
                    items.iter().map(json_text).collect(),
                )),
                Value::String(text) => Some(FieldValue::Choices(
                    text.split_whitespace().map(str::to_string).collect(),
                )),
                _ => None,
            },
            FieldType::GeoPoint => match raw {
                Value::String(text) => GeoPoint::parse(text).map(FieldValue::GeoPoint),
                Value::Object(_) => serde_json::from_value::<GeoPoint>(raw.clone())
                    .ok()
                    .map(FieldValue::GeoPoint),
                _ => None,
            },
            FieldType::Binary => raw.as_str().map(|key| FieldValue::Blob(BlobKey::new(key))),
        };
        Some(coerced.unwrap_or_else(|| FieldValue::Text(json_text(raw))))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) | FieldValue::Date(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Decimal(value) => write!(f, "{}", value),
            FieldValue::Boolean(value) => write!(f, "{}", value),
            FieldValue::Choices(choices) => f.write_str(&choices.join(" ")),
            FieldValue::GeoPoint(point) => write!(f, "{}", point),
            FieldValue::Blob(key) => write!(f, "{}", key),
        }
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_collector_point_encoding() {
        let point = GeoPoint::parse("47.6 -122.3 12.5 4").expect("point");
        assert_eq!(point.latitude, Some(47.6));
        assert_eq!(point.longitude, Some(-122.3));
        assert_eq!(point.altitude, Some(12.5));
        assert_eq!(point.accuracy, Some(4.0));
        assert!(GeoPoint::parse("47.6").is_none());
        assert!(GeoPoint::parse("north south").is_none());
    }

    #[test]
    fn coordinates_default_altitude_and_require_both_axes() {
        assert_eq!(GeoPoint::new(10.0, 20.0).coordinates(), Some((20.0, 10.0, 0.0)));
        let partial = GeoPoint {
            latitude: Some(10.0),
            ..GeoPoint::default()
        };
        assert_eq!(partial.coordinates(), None);

        let unbounded = GeoPoint {
            latitude: Some(f64::NAN),
            longitude: Some(f64::INFINITY),
            altitude: None,
            accuracy: None,
        };
        assert_eq!(unbounded.coordinates(), None);
        let drifting = GeoPoint {
            altitude: Some(f64::NEG_INFINITY),
            ..GeoPoint::new(10.0, 20.0)
        };
        assert_eq!(drifting.coordinates(), Some((20.0, 10.0, 0.0)));
    }

    #[test]
    fn non_finite_point_text_is_not_a_point() {
        assert!(GeoPoint::parse("NaN inf").is_none());
        assert!(GeoPoint::parse("47.6 -122.3 infinity").is_none());
        let value = FieldValue::from_json(FieldType::GeoPoint, &json!("NaN inf")).expect("value");
        assert!(value.as_geo_point().is_none());
    }

    #[test]
    fn ill_typed_answers_degrade_to_text() {
        let value = FieldValue::from_json(FieldType::GeoPoint, &json!("somewhere")).expect("value");
        assert_eq!(value, FieldValue::Text("somewhere".into()));
        assert!(value.as_geo_point().is_none());

        let value = FieldValue::from_json(FieldType::Integer, &json!("12")).expect("value");
        assert_eq!(value, FieldValue::Integer(12));
        assert!(FieldValue::from_json(FieldType::String, &Value::Null).is_none());
    }

    #[test]
    fn points_and_blobs_have_no_caption() {
        assert_eq!(FieldValue::GeoPoint(GeoPoint::new(1.0, 2.0)).display_text(), None);
        assert_eq!(FieldValue::Blob(BlobKey::new("k")).display_text(), None);
        assert_eq!(FieldValue::Integer(7).display_text().as_deref(), Some("7"));
    }
}
