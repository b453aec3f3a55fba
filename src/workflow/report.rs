use std::collections::BTreeSet;

use serde::Serialize;

use super::states::{Outcome, RowState};
use crate::record::CaseRecord;

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub row: usize,
    pub case_number: String,
    /// States visited, in order.
    pub states: Vec<RowState>,
    pub outcome: Outcome,
    /// Field-level failures, already logged.
    pub field_failures: Vec<String>,
    /// Secondary parties that could not be added.
    pub party_failures: Vec<String>,
    pub elapsed_ms: u64,
}

impl RowReport {
    pub fn new(record: &CaseRecord) -> Self {
        Self {
            row: record.row,
            case_number: record.case_number.clone(),
            states: Vec::new(),
            outcome: Outcome::Pending,
            field_failures: Vec::new(),
            party_failures: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn enter(&mut self, state: RowState) {
        self.states.push(state);
    }

    pub fn current_state(&self) -> Option<RowState> {
        self.states.last().copied()
    }

    pub fn visited(&self, state: RowState) -> bool {
        self.states.contains(&state)
    }

    pub fn succeed(&mut self) {
        self.enter(RowState::Success);
        self.outcome = Outcome::Success;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.enter(RowState::Failed);
        self.outcome = Outcome::Failed(reason.into());
    }
}

/// Reports of a whole run, consumed once by the result reporter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResults {
    pub reports: Vec<RowReport>,
    /// Rows skipped for lack of a case number.
    pub skipped: Vec<usize>,
    /// Set when the session failed and the run stopped early.
    pub aborted: Option<String>,
}

impl RunResults {
    pub fn failed_rows(&self) -> BTreeSet<usize> {
        self.reports
            .iter()
            .filter(|report| report.outcome.is_failed())
            .map(|report| report.row)
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.outcome == Outcome::Success)
            .count()
    }
}
