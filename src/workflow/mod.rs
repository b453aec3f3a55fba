//! Row workflow: one spreadsheet record through the case form, and the loop
//! over all records.

mod fields;
mod parties;
pub mod report;
mod row;
mod runner;
pub mod states;

pub use fields::dialog_spec;
pub use report::{RowReport, RunResults};
pub use row::RowWorkflow;
pub use runner::RowRunner;
pub use states::{Outcome, RowState};
