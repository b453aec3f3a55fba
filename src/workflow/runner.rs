//! Sequential loop over the sheet's rows.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use action_primitives::ExecCtx;
use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::report::{RowReport, RunResults};
use super::row::RowWorkflow;
use crate::record::{CaseRecord, RowRange};
use crate::workbook::SheetData;

pub struct RowRunner {
    workflow: RowWorkflow,
    range: Option<RowRange>,
}

impl RowRunner {
    pub fn new(workflow: RowWorkflow) -> Self {
        Self {
            workflow,
            range: None,
        }
    }

    pub fn with_range(mut self, range: Option<RowRange>) -> Self {
        self.range = range;
        self
    }

    pub fn workflow(&self) -> &RowWorkflow {
        &self.workflow
    }

    /// Processes every row in order. A failed row never stops the loop; a
    /// session that no longer answers does.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn run(&self, ctx: &ExecCtx, sheet: &SheetData) -> RunResults {
        let mut results = RunResults::default();
        let primitives = self.workflow.resolvers().primitives().clone();
        let pause = self.workflow.resolvers().tempo().between_rows_ms;
        info!(rows = sheet.row_count(), range = ?self.range.map(|r| r.to_string()), "Starting run");

        for index in 0..sheet.row_count() {
            if let Some(range) = &self.range {
                if !range.contains(index) {
                    debug!(row = index + 2, "Outside the requested range");
                    continue;
                }
            }
            let Some(record) = CaseRecord::from_sheet(sheet, index) else {
                info!(row = index + 2, "No case number, skipping row");
                results.skipped.push(index);
                continue;
            };

            let row_ctx = ctx.next();
            let report = match AssertUnwindSafe(self.workflow.process(&row_ctx, &record))
                .catch_unwind()
                .await
            {
                Ok(report) => report,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(row = record.sheet_row(), reason = %reason, "Row processing panicked");
                    let mut report = RowReport::new(&record);
                    report.fail(format!("unexpected error: {reason}"));
                    report
                }
            };

            if let Some(frame) = primitives.current_frame() {
                warn!(frame = %frame, "Still inside a dialog frame, leaving it");
                if let Err(err) = primitives.leave_frame(&row_ctx).await {
                    warn!(error = %err, "Could not leave the dialog frame");
                }
            }

            let failed = report.outcome.is_failed();
            results.reports.push(report);
            if failed {
                if let Err(err) = primitives.ping(&row_ctx).await {
                    error!(row = record.sheet_row(), error = %err, "Browser session lost, stopping");
                    results.aborted = Some(format!(
                        "session lost after row {}: {err}",
                        record.sheet_row()
                    ));
                    break;
                }
            }
            primitives.settle(pause).await;
        }

        info!(
            processed = results.reports.len(),
            succeeded = results.succeeded(),
            failed = results.failed_rows().len(),
            skipped = results.skipped.len(),
            aborted = results.aborted.is_some(),
            "Run finished"
        );
        results
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic".to_string()
    }
}
