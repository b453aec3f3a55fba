//! Error types for the casefill library.

use std::path::PathBuf;
use thiserror::Error;

/// Failures outside the row loop: workbook I/O, configuration, the session.
#[derive(Debug, Error)]
pub enum CaseFillError {
    #[error("failed to read workbook {path}: {reason}")]
    WorkbookRead { path: PathBuf, reason: String },

    #[error("failed to write workbook {path}: {reason}")]
    WorkbookWrite { path: PathBuf, reason: String },

    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("workbook has no header row")]
    EmptyWorkbook,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid row range '{0}' (expected N, N-M or N-)")]
    InvalidRowRange(String),

    #[error("browser session failed: {0}")]
    Session(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CaseFillError {
    pub fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CaseFillError::WorkbookRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CaseFillError::WorkbookWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaseFillError>;
