use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use tracing::{debug, info, warn};

use super::SheetData;
use crate::errors::{CaseFillError, Result};
use crate::parsers::dates::{datetime_to_serial, serial_to_datetime};
use crate::parsers::CellValue;

/// Fill colour of rows whose processing failed.
pub const HIGHLIGHT_RGB: u32 = 0xFFF200;
const DATE_NUM_FORMAT: &str = "dd/mm/yyyy";

pub(super) fn read(path: &Path, sheet: Option<&str>) -> Result<SheetData> {
    let mut workbook =
        open_workbook_auto(path).map_err(|err| CaseFillError::read(path, err.to_string()))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| CaseFillError::SheetNotFound(wanted.to_string()))?,
        None => names.first().cloned().ok_or(CaseFillError::EmptyWorkbook)?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|err| CaseFillError::read(path, format!("sheet '{name}': {err}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(CaseFillError::EmptyWorkbook);
    };
    let headers = header
        .iter()
        .enumerate()
        .map(|(index, cell)| header_text(index, cell))
        .collect();
    let mut data = SheetData::new(name, headers);
    data.rows = rows.map(|row| row.iter().map(cell_from_data).collect()).collect();
    Ok(data)
}

fn header_text(index: usize, cell: &Data) -> String {
    let text = cell_from_data(cell).display();
    if text.is_empty() {
        format!("Column{}", index + 1)
    } else {
        text
    }
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Int(*value),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => match serial_to_datetime(value.as_f64()) {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::Number(value.as_f64()),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        Data::Error(err) => CellValue::Error(err.to_string()),
    }
}

/// Output path for a spreadsheet input: in place for `.xlsx`, a sibling
/// `.xlsx` otherwise.
pub fn output_path(input: &Path) -> PathBuf {
    let is_xlsx = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        input.to_path_buf()
    } else {
        input.with_extension("xlsx")
    }
}

pub(super) fn write(path: &Path, sheet: &SheetData, highlighted: &BTreeSet<usize>) -> Result<PathBuf> {
    let target = output_path(path);
    if target != path {
        warn!(
            input = %path.display(),
            output = %target.display(),
            "Input is not .xlsx, writing results next to it"
        );
    }
    let fail = |err: XlsxError| CaseFillError::write(&target, err.to_string());

    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet().set_name(&sheet.name).map_err(fail)?;

    for (column, header) in sheet.headers.iter().enumerate() {
        worksheet
            .write_string(0, column as u16, header)
            .map_err(fail)?;
    }

    let plain = Format::new();
    let dated = Format::new().set_num_format(DATE_NUM_FORMAT);
    let marked = Format::new().set_background_color(Color::RGB(HIGHLIGHT_RGB));
    let marked_dated = marked.clone().set_num_format(DATE_NUM_FORMAT);

    for (index, cells) in sheet.rows.iter().enumerate() {
        let row = (index + 1) as u32;
        let highlight = highlighted.contains(&index);
        let (format, date_format) = if highlight {
            (&marked, &marked_dated)
        } else {
            (&plain, &dated)
        };
        let width = if highlight {
            cells.len().max(sheet.headers.len())
        } else {
            cells.len()
        };
        for column in 0..width {
            let cell = cells.get(column).unwrap_or(&CellValue::Empty);
            write_cell(worksheet, row, column as u16, cell, format, date_format, highlight)
                .map_err(fail)?;
        }
    }

    workbook.save(&target).map_err(fail)?;
    info!(
        path = %target.display(),
        rows = sheet.rows.len(),
        highlighted = highlighted.len(),
        "Workbook saved"
    );
    Ok(target)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    column: u16,
    cell: &CellValue,
    format: &Format,
    date_format: &Format,
    highlight: bool,
) -> std::result::Result<(), XlsxError> {
    match cell {
        CellValue::Empty | CellValue::Error(_) if highlight => {
            worksheet.write_blank(row, column, format)?;
        }
        CellValue::Empty => {}
        CellValue::Error(text) | CellValue::Text(text) => {
            worksheet.write_string_with_format(row, column, text, format)?;
        }
        CellValue::Number(value) => {
            worksheet.write_number_with_format(row, column, *value, format)?;
        }
        CellValue::Int(value) => {
            worksheet.write_number_with_format(row, column, *value as f64, format)?;
        }
        CellValue::Bool(value) => {
            worksheet.write_boolean_with_format(row, column, *value, format)?;
        }
        CellValue::DateTime(value) => match datetime_to_serial(value) {
            Some(serial) => {
                worksheet.write_number_with_format(row, column, serial, date_format)?;
            }
            None => {
                debug!(row, column, "Date outside the serial range, writing as text");
                worksheet.write_string_with_format(row, column, cell.display(), format)?;
            }
        },
    }
    Ok(())
}
