use crate::value::FieldValue;

/// One rendered column of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub formatted: String,
    pub raw: Option<FieldValue>,
}

/// Ordered set of already-rendered field values.
///
/// Rows are created per top-level record or per repeat instance and are
/// discarded once the output unit they feed is written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<Column>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        name: impl Into<String>,
        formatted: impl Into<String>,
        raw: Option<FieldValue>,
    ) {
        self.columns.push(Column {
            name: name.into(),
            formatted: formatted.into(),
            raw,
        });
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn formatted_values(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.formatted.as_str())
    }

    pub fn raw_values(&self) -> impl Iterator<Item = Option<&FieldValue>> {
        self.columns.iter().map(|column| column.raw.as_ref())
    }

    /// Structural copy of the current columns; later changes to either row
    /// are not visible in the other.
    pub fn clone_values(&self) -> Row {
        Row {
            columns: self.columns.clone(),
        }
    }

    /// Append all of `other`'s columns after this row's columns.
    pub fn add_data_from_row(&mut self, other: &Row) {
        self.columns.extend(other.columns.iter().cloned());
    }
}
