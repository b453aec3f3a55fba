//! Workbook boundary: reading the input sheet and writing it back with the
//! status column and highlighted rows.

mod delimited;
mod open;
mod xlsx;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::Result;
use crate::parsers::{normalize_label, CellValue};

pub use open::open_for_review;

/// One worksheet: header row plus data rows, cells kept as read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Index of a column, matching the exact header first and then the
    /// accent- and case-folded form.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.trim() == name)
            .or_else(|| {
                let wanted = normalize_label(name);
                self.headers
                    .iter()
                    .position(|header| normalize_label(header) == wanted)
            })
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        let column = self.column(name)?;
        self.rows.get(row)?.get(column)
    }

    /// Index of the column, appending it to the header when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(column) = self.column(name) {
            return column;
        }
        self.headers.push(name.to_string());
        self.headers.len() - 1
    }

    /// Writes text into a cell, growing the row as needed.
    pub fn set_text(&mut self, row: usize, column: usize, text: impl Into<String>) {
        let Some(cells) = self.rows.get_mut(row) else {
            return;
        };
        if cells.len() <= column {
            cells.resize(column + 1, CellValue::Empty);
        }
        cells[column] = CellValue::Text(text.into());
    }

    /// Expected columns absent from the header.
    pub fn missing_columns<'a>(&self, expected: &[&'a str]) -> Vec<&'a str> {
        expected
            .iter()
            .copied()
            .filter(|name| self.column(name).is_none())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Spreadsheet,
    Csv,
}

impl WorkbookFormat {
    pub fn of(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("csv") => WorkbookFormat::Csv,
            _ => WorkbookFormat::Spreadsheet,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// A loaded input file.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheet: SheetData,
}

impl Workbook {
    pub fn load(path: &Path, sheet: Option<&str>) -> Result<Self> {
        let data = match WorkbookFormat::of(path) {
            WorkbookFormat::Csv => delimited::read(path)?,
            WorkbookFormat::Spreadsheet => xlsx::read(path, sheet)?,
        };
        info!(
            path = %path.display(),
            sheet = %data.name,
            rows = data.rows.len(),
            columns = data.headers.len(),
            "Workbook loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            sheet: data,
        })
    }
}

/// Writes the sheet back, returning the path of the written artifact.
pub fn save(path: &Path, sheet: &SheetData, highlighted: &BTreeSet<usize>) -> Result<PathBuf> {
    match WorkbookFormat::of(path) {
        WorkbookFormat::Csv => delimited::write(path, sheet, highlighted),
        WorkbookFormat::Spreadsheet => xlsx::write(path, sheet, highlighted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SheetData {
        let mut sheet = SheetData::new(
            "Planilha1",
            vec!["Número do processo".into(), "Comarca".into()],
        );
        sheet.rows.push(vec!["0001".into(), "São Paulo".into()]);
        sheet.rows.push(vec!["0002".into()]);
        sheet
    }

    #[test]
    fn columns_match_exactly_then_folded() {
        let sheet = sheet();
        assert_eq!(sheet.column("Comarca"), Some(1));
        assert_eq!(sheet.column("numero do processo"), Some(0));
        assert_eq!(sheet.column("Vara"), None);
        assert_eq!(sheet.cell(0, "Comarca"), Some(&CellValue::from("São Paulo")));
        assert_eq!(sheet.cell(1, "Comarca"), None);
    }

    #[test]
    fn status_column_is_appended_once() {
        let mut sheet = sheet();
        let status = sheet.ensure_column("STATUS");
        assert_eq!(status, 2);
        assert_eq!(sheet.ensure_column("STATUS"), 2);
        sheet.set_text(1, status, "OK");
        assert_eq!(sheet.rows[1].len(), 3);
        assert_eq!(sheet.cell(1, "STATUS"), Some(&CellValue::from("OK")));
        sheet.set_text(9, status, "ignored");
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn missing_columns_are_listed() {
        let sheet = sheet();
        assert_eq!(
            sheet.missing_columns(&["Número do processo", "Vara", "Fase"]),
            vec!["Vara", "Fase"]
        );
    }

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(WorkbookFormat::of(Path::new("a.CSV")), WorkbookFormat::Csv);
        assert_eq!(WorkbookFormat::of(Path::new("a.xlsx")), WorkbookFormat::Spreadsheet);
        assert_eq!(WorkbookFormat::of(Path::new("a.ods")), WorkbookFormat::Spreadsheet);
    }
}
