//! casefill library
//!
//! Spreadsheet rows entered into a web case form, one record at a time.

pub mod attachments;
pub mod config;
pub mod errors;
pub mod parsers;
pub mod record;
pub mod reporter;
pub mod session;
pub mod workbook;
pub mod workflow;

// Re-export commonly used types for external use
pub use config::Config;
pub use errors::{CaseFillError, Result};
pub use record::{CaseRecord, RowRange};
pub use reporter::{ArtifactSink, ReportSummary, ResultReporter, XlsxArtifact};
pub use session::{BrowserSession, LoginState};
pub use workbook::{SheetData, Workbook};
pub use workflow::{RowRunner, RowWorkflow, RunResults};
