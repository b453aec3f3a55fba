//! Result reporter: status column, persistence, highlighting and review.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{CaseFillError, Result};
use crate::workbook::{self, SheetData};
use crate::workflow::RunResults;

/// Where the annotated sheet goes.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persists the sheet with `highlighted` data rows flagged; returns the
    /// artifact's location.
    async fn persist(&self, sheet: &SheetData, highlighted: &BTreeSet<usize>) -> Result<PathBuf>;

    /// Shows the artifact to the operator.
    async fn open_for_review(&self, artifact: &Path);
}

/// Writes the workbook file next to (or over) the input.
pub struct XlsxArtifact {
    path: PathBuf,
}

impl XlsxArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ArtifactSink for XlsxArtifact {
    async fn persist(&self, sheet: &SheetData, highlighted: &BTreeSet<usize>) -> Result<PathBuf> {
        let path = self.path.clone();
        let sheet = sheet.clone();
        let highlighted = highlighted.clone();
        tokio::task::spawn_blocking(move || workbook::save(&path, &sheet, &highlighted))
            .await
            .map_err(|err| CaseFillError::write(&self.path, err.to_string()))?
    }

    async fn open_for_review(&self, artifact: &Path) {
        workbook::open_for_review(artifact);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub artifact: PathBuf,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Data rows (zero-based) flagged in the artifact.
    pub highlighted: Vec<usize>,
    pub opened_for_review: bool,
    pub aborted: Option<String>,
}

pub struct ResultReporter {
    status_column: String,
    open_on_failure: bool,
}

impl ResultReporter {
    pub fn new(status_column: impl Into<String>, open_on_failure: bool) -> Self {
        Self {
            status_column: status_column.into(),
            open_on_failure,
        }
    }

    /// Writes every terminal outcome into the status column, persists the
    /// sheet and, when a row failed, asks for the artifact to be reviewed.
    pub async fn finish(
        &self,
        sheet: &mut SheetData,
        results: &RunResults,
        sink: &dyn ArtifactSink,
    ) -> Result<ReportSummary> {
        let column = sheet.ensure_column(&self.status_column);
        for report in &results.reports {
            if let Some(status) = report.outcome.status_text() {
                sheet.set_text(report.row, column, status);
            }
        }

        let highlighted = results.failed_rows();
        let artifact = sink.persist(sheet, &highlighted).await?;
        info!(
            artifact = %artifact.display(),
            failed = highlighted.len(),
            "Results written"
        );

        let opened = !highlighted.is_empty() && self.open_on_failure;
        if opened {
            warn!(rows = highlighted.len(), "Some rows failed, opening the results for review");
            sink.open_for_review(&artifact).await;
        }

        Ok(ReportSummary {
            artifact,
            succeeded: results.succeeded(),
            failed: highlighted.len(),
            skipped: results.skipped.len(),
            highlighted: highlighted.into_iter().collect(),
            opened_for_review: opened,
            aborted: results.aborted.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::CellValue;
    use crate::record::CaseRecord;
    use crate::workflow::RowReport;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        persisted: Mutex<Vec<(SheetData, BTreeSet<usize>)>>,
        opened: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ArtifactSink for Recording {
        async fn persist(&self, sheet: &SheetData, highlighted: &BTreeSet<usize>) -> Result<PathBuf> {
            self.persisted.lock().push((sheet.clone(), highlighted.clone()));
            Ok(PathBuf::from("resultado.xlsx"))
        }

        async fn open_for_review(&self, artifact: &Path) {
            self.opened.lock().push(artifact.to_path_buf());
        }
    }

    fn report(row: usize, outcome: Option<&str>) -> RowReport {
        let record = CaseRecord {
            row,
            case_number: format!("case-{row}"),
            ..CaseRecord::default()
        };
        let mut report = RowReport::new(&record);
        match outcome {
            Some(reason) => report.fail(reason),
            None => report.succeed(),
        }
        report
    }

    fn sheet() -> SheetData {
        let mut sheet = SheetData::new("Planilha1", vec!["Número do processo".into()]);
        for case in ["a", "b", "c"] {
            sheet.rows.push(vec![case.into()]);
        }
        sheet
    }

    #[tokio::test]
    async fn failures_are_highlighted_and_opened() {
        let sink = Recording::default();
        let mut sheet = sheet();
        let results = RunResults {
            reports: vec![report(0, None), report(2, Some("Salvar failed: timeout"))],
            skipped: vec![1],
            aborted: None,
        };

        let summary = ResultReporter::new("STATUS", true)
            .finish(&mut sheet, &results, &sink)
            .await
            .expect("finish");

        assert_eq!(summary.highlighted, vec![2]);
        assert!(summary.opened_for_review);
        assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 1, 1));
        assert_eq!(sheet.cell(0, "STATUS"), Some(&CellValue::from("OK")));
        assert_eq!(sheet.cell(1, "STATUS"), None);
        assert_eq!(
            sheet.cell(2, "STATUS"),
            Some(&CellValue::from("ERRO: Salvar failed: timeout"))
        );
        let persisted = sink.persisted.lock();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].1, BTreeSet::from([2]));
        assert_eq!(sink.opened.lock().as_slice(), [PathBuf::from("resultado.xlsx")]);
    }

    #[tokio::test]
    async fn clean_runs_are_not_opened() {
        let sink = Recording::default();
        let mut sheet = sheet();
        let results = RunResults {
            reports: vec![report(0, None)],
            ..RunResults::default()
        };

        let summary = ResultReporter::new("STATUS", true)
            .finish(&mut sheet, &results, &sink)
            .await
            .expect("finish");

        assert!(!summary.opened_for_review);
        assert!(sink.opened.lock().is_empty());
    }

    #[test]
    fn review_can_be_disabled() {
        let sink = Recording::default();
        let mut sheet = sheet();
        let results = RunResults {
            reports: vec![report(1, Some("Editar failed: gone"))],
            ..RunResults::default()
        };

        let summary = tokio_test::block_on(
            ResultReporter::new("STATUS", false).finish(&mut sheet, &results, &sink),
        )
        .expect("finish");

        assert_eq!(summary.failed, 1);
        assert!(!summary.opened_for_review);
        assert!(sink.opened.lock().is_empty());
    }
}
