use chrono::NaiveDateTime;

use super::dates::CANONICAL_DATE_FORMAT;

/// One spreadsheet cell, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Formula error such as `#N/A`.
    Error(String),
}

impl CellValue {
    /// Missing-value sentinels: empty cells, error cells, blank text.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Empty | CellValue::Error(_) => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(value) => value.is_nan(),
            _ => false,
        }
    }

    /// Text as a person reading the sheet would see it.
    ///
    /// Integral floats drop their decimal part, so an identifier typed as a
    /// number (`12345.0`) reads back as `12345`.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty | CellValue::Error(_) => String::new(),
            CellValue::Text(text) => text.trim().to_string(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Int(value) => value.to_string(),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::DateTime(value) => value.format(CANONICAL_DATE_FORMAT).to_string(),
        }
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}
