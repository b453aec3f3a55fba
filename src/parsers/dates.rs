//! Date normalization.
//!
//! Spreadsheet dates arrive as serial numbers, typed dates, day-first or
//! month-first strings and bare digit runs. [`normalize`] folds all of them
//! into `DD/MM/YYYY`, or returns an empty string when no reading lands in a
//! plausible year. It never fails.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime};

use super::cell::{format_number, CellValue};

pub const CANONICAL_DATE_FORMAT: &str = "%d/%m/%Y";

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

const EXPLICIT_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Day zero of spreadsheet serial dates (1899-12-30, which absorbs the
/// phantom 29/02/1900).
fn serial_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

/// Date-time for a spreadsheet serial number, fraction as time of day.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let days = serial.trunc();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    serial_epoch()?
        .checked_add_days(Days::new(days as u64))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Spreadsheet serial number for a date-time.
pub fn datetime_to_serial(value: &NaiveDateTime) -> Option<f64> {
    let elapsed = value.signed_duration_since(serial_epoch()?);
    Some(elapsed.num_seconds() as f64 / 86_400.0)
}

fn in_range(date: NaiveDate) -> Option<NaiveDate> {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year()).then_some(date)
}

fn canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Canonical `DD/MM/YYYY` text for a cell, or `""` when it holds no usable date.
pub fn normalize(raw: Option<&CellValue>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let text = match raw {
        CellValue::Empty | CellValue::Error(_) => return String::new(),
        CellValue::DateTime(value) => return canonical(value.date()),
        CellValue::Number(value) => {
            if let Some(date) = from_serial(*value) {
                return canonical(date);
            }
            format_number(*value)
        }
        CellValue::Int(value) => {
            if let Some(date) = from_serial(*value as f64) {
                return canonical(date);
            }
            value.to_string()
        }
        CellValue::Bool(value) => value.to_string(),
        CellValue::Text(text) => text.clone(),
    };
    normalize_text(&text)
}

/// Canonical text for a raw date string, or `""`.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return String::new();
    }
    [DateOrder::DayFirst, DateOrder::MonthFirst]
        .into_iter()
        .find_map(|order| parse_ambiguous(text, order))
        .or_else(|| parse_explicit(text))
        .or_else(|| parse_digit_run(text))
        .map(canonical)
        .unwrap_or_default()
}

fn from_serial(serial: f64) -> Option<NaiveDate> {
    serial_to_datetime(serial).map(|value| value.date()).and_then(in_range)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateOrder {
    DayFirst,
    MonthFirst,
}

/// Drops a trailing time of day (`15/03/2024 10:30`, `2024-03-15T10:30:00`).
fn strip_time(text: &str) -> &str {
    match text.find(':') {
        Some(colon) => {
            let head = &text[..colon];
            let cut = head
                .rfind(|ch: char| ch.is_whitespace() || ch == 'T')
                .unwrap_or(0);
            text[..cut].trim_end()
        }
        None => text,
    }
}

fn expand_year(token: &str) -> Option<i32> {
    let value: i32 = token.parse().ok()?;
    match token.len() {
        4 => Some(value),
        2 if value <= 68 => Some(2000 + value),
        2 => Some(1900 + value),
        _ => None,
    }
}

fn parse_ambiguous(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let tokens: Vec<&str> = strip_time(text)
        .split(|ch: char| matches!(ch, '/' | '-' | '.') || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect();
    let [a, b, c] = tokens.as_slice() else {
        return None;
    };
    if !tokens
        .iter()
        .all(|token| token.chars().all(|ch| ch.is_ascii_digit()))
    {
        return None;
    }

    let (year, month, day) = if a.len() == 4 {
        (expand_year(a)?, b.parse().ok()?, c.parse().ok()?)
    } else if a.len() <= 2 && b.len() <= 2 {
        let year = expand_year(c)?;
        match order {
            DateOrder::DayFirst => (year, b.parse().ok()?, a.parse().ok()?),
            DateOrder::MonthFirst => (year, a.parse().ok()?, b.parse().ok()?),
        }
    } else {
        return None;
    };
    NaiveDate::from_ymd_opt(year, month, day).and_then(in_range)
}

fn parse_explicit(text: &str) -> Option<NaiveDate> {
    EXPLICIT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok().and_then(in_range))
}

/// `DDMMYYYY`, then `YYYYMMDD`, over the digits of the text.
fn parse_digit_run(text: &str) -> Option<NaiveDate> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 8 {
        return None;
    }
    let part = |range: std::ops::Range<usize>| digits[range].parse::<u32>().ok();

    let day_first = NaiveDate::from_ymd_opt(part(4..8)? as i32, part(2..4)?, part(0..2)?)
        .and_then(in_range);
    day_first.or_else(|| {
        NaiveDate::from_ymd_opt(part(0..4)? as i32, part(4..6)?, part(6..8)?).and_then(in_range)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(raw: &str) -> String {
        normalize(Some(&CellValue::from(raw)))
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(text("15/03/2024"), "15/03/2024");
        assert_eq!(text("2024-03-15"), "15/03/2024");
        assert_eq!(text("15032024"), "15/03/2024");
        assert_eq!(text("20240315"), "15/03/2024");
        assert_eq!(text(""), "");
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some(&CellValue::Empty)), "");
    }

    #[test]
    fn serial_numbers_use_the_1899_epoch() {
        assert_eq!(normalize(Some(&CellValue::Number(45366.0))), "15/03/2024");
        assert_eq!(normalize(Some(&CellValue::Int(45366))), "15/03/2024");
        assert_eq!(normalize(Some(&CellValue::Number(45366.75))), "15/03/2024");
        assert_eq!(normalize(Some(&CellValue::Number(5041.0))), "19/10/1913");
    }

    #[test]
    fn serials_before_1900_are_rejected() {
        assert_eq!(normalize(Some(&CellValue::Number(1.0))), "");
        assert_eq!(normalize(Some(&CellValue::Int(0))), "");
        assert_eq!(normalize(Some(&CellValue::Number(f64::INFINITY))), "");
    }

    #[test]
    fn every_plausible_serial_lands_in_range() {
        for serial in 0..=73_050_i64 {
            let out = normalize(Some(&CellValue::Int(serial)));
            if out.is_empty() {
                continue;
            }
            let year: i32 = out[6..].parse().expect("year");
            assert!((1900..=2100).contains(&year), "{serial} -> {out}");
        }
    }

    #[test]
    fn far_future_text_is_rejected() {
        assert_eq!(text("5041"), "");
        assert_eq!(text("01/01/5041"), "");
        assert_eq!(text("50410101"), "");
    }

    #[test]
    fn month_first_is_the_fallback_reading() {
        assert_eq!(text("03/15/2024"), "15/03/2024");
        assert_eq!(text("04/05/2024"), "04/05/2024");
    }

    #[test]
    fn separators_times_and_short_years() {
        assert_eq!(text("15-03-2024"), "15/03/2024");
        assert_eq!(text("15.03.2024"), "15/03/2024");
        assert_eq!(text(" 15/03/2024 10:45:00 "), "15/03/2024");
        assert_eq!(text("2024-03-15T10:45:00"), "15/03/2024");
        assert_eq!(text("5/3/24"), "05/03/2024");
        assert_eq!(text("5/3/85"), "05/03/1985");
    }

    #[test]
    fn garbage_yields_empty() {
        assert_eq!(text("sem data"), "");
        assert_eq!(text("31/02/2024"), "");
        assert_eq!(normalize(Some(&CellValue::Bool(true))), "");
        assert_eq!(normalize(Some(&CellValue::Error("#VALUE!".into()))), "");
    }

    #[test]
    fn typed_dates_format_directly() {
        let value = NaiveDate::from_ymd_opt(2023, 12, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("date");
        assert_eq!(normalize(Some(&CellValue::DateTime(value))), "01/12/2023");
    }

    #[test]
    fn serial_conversion_is_symmetric() {
        let value = serial_to_datetime(45366.5).expect("serial");
        assert_eq!(value.format("%Y-%m-%d %H:%M").to_string(), "2024-03-15 12:00");
        assert_eq!(datetime_to_serial(&value), Some(45366.5));
    }
}
