//! Text and amount helpers for cell values.

use super::cell::{format_number, CellValue};

pub use action_primitives::xpath_literal;
pub use control_resolvers::normalize_label;

/// Trimmed display text of a cell; missing and null cells give `""`.
pub fn safe_text(cell: Option<&CellValue>) -> String {
    match cell {
        Some(cell) if !cell.is_null() => cell.display(),
        _ => String::new(),
    }
}

/// Claim amount in dot-decimal form.
///
/// Text with a comma is read the Brazilian way (`1.234,56` gives `1234.56`).
/// Text without one is parsed as written unless its dots group thousands.
/// Unparsable text falls back to swapping commas for dots.
pub fn to_amount(cell: Option<&CellValue>) -> String {
    let Some(cell) = cell.filter(|cell| !cell.is_null()) else {
        return String::new();
    };
    match cell {
        CellValue::Number(value) => format_number(*value),
        CellValue::Int(value) => value.to_string(),
        CellValue::Text(text) => amount_from_text(text.trim()),
        other => other.display(),
    }
}

fn amount_from_text(text: &str) -> String {
    let cleaned = if text.contains(',') || is_thousands_grouped(text) {
        text.replace('.', "").replace(',', ".")
    } else {
        text.to_string()
    };
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => format_number(value),
        _ => text.replace(',', "."),
    }
}

/// `1.234` or `12.345.678`: dot-separated groups of three after a 1-3 digit head.
fn is_thousands_grouped(text: &str) -> bool {
    let mut groups = text.split('.');
    let Some(head) = groups.next() else {
        return false;
    };
    let tail: Vec<&str> = groups.collect();
    !tail.is_empty()
        && (1..=3).contains(&head.len())
        && head.chars().all(|ch| ch.is_ascii_digit())
        && tail
            .iter()
            .all(|group| group.len() == 3 && group.chars().all(|ch| ch.is_ascii_digit()))
}
