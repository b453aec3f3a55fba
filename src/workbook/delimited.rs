use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{info, warn};

use super::SheetData;
use crate::errors::{CaseFillError, Result};
use crate::parsers::CellValue;

pub(super) fn read(path: &Path) -> Result<SheetData> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|err| CaseFillError::read(path, err.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|err| CaseFillError::read(path, err.to_string()))?
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let header = header.trim();
            if header.is_empty() {
                format!("Column{}", index + 1)
            } else {
                header.to_string()
            }
        })
        .collect();

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Sheet1")
        .to_string();
    let mut sheet = SheetData::new(name, headers);
    for record in reader.records() {
        let record = record.map_err(|err| CaseFillError::read(path, err.to_string()))?;
        sheet.rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(sheet)
}

pub(super) fn write(path: &Path, sheet: &SheetData, highlighted: &BTreeSet<usize>) -> Result<PathBuf> {
    if !highlighted.is_empty() {
        warn!(
            rows = highlighted.len(),
            "CSV cannot carry highlighting, failed rows are only marked in the status column"
        );
    }
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|err| CaseFillError::write(path, err.to_string()))?;
    writer
        .write_record(&sheet.headers)
        .map_err(|err| CaseFillError::write(path, err.to_string()))?;
    for cells in &sheet.rows {
        let mut fields: Vec<String> = cells.iter().map(CellValue::display).collect();
        if fields.len() < sheet.headers.len() {
            fields.resize(sheet.headers.len(), String::new());
        }
        writer
            .write_record(&fields)
            .map_err(|err| CaseFillError::write(path, err.to_string()))?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = sheet.rows.len(), "CSV saved");
    Ok(path.to_path_buf())
}
