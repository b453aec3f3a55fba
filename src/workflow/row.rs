//! One record through the case form.

use std::env;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use action_flow::{FailureStrategy, FlowError, RetryEnvelope, StepExecutor, StepOutcome};
use action_primitives::{
    ActionError, ActionPrimitives, ClickPolicy, ControlDescriptor, ExecCtx, Key, TextMatch,
    TypeMode, WaitCondition, WaitTier,
};
use control_resolvers::{CompanionIds, Resolvers};
use tracing::{info, instrument, warn};

use super::report::RowReport;
use super::states::{Outcome, RowState};
use crate::attachments::AttachmentLocator;
use crate::config::ControlsConfig;
use crate::record::CaseRecord;

/// Suggestion entries of the global search panel.
const SEARCH_ITEM: &str = "span";

/// Drives a record through open, edit, field population, secondary parties,
/// attachment upload and save.
pub struct RowWorkflow {
    pub(super) resolvers: Resolvers,
    pub(super) controls: ControlsConfig,
    pub(super) attachments: AttachmentLocator,
    pub(super) executor: StepExecutor,
    save_confirmation: Option<ControlDescriptor>,
}

impl RowWorkflow {
    pub fn new(resolvers: Resolvers, controls: ControlsConfig, attachments: AttachmentLocator) -> Self {
        let cool_down = Duration::from_millis(resolvers.tempo().retry_cool_down_ms);
        Self {
            resolvers,
            controls,
            attachments,
            executor: StepExecutor::new(RetryEnvelope::new(cool_down)),
            save_confirmation: None,
        }
    }

    /// After the save click, wait for this control before calling the row done.
    pub fn with_save_confirmation(mut self, selector: Option<String>) -> Self {
        self.save_confirmation = selector
            .filter(|css| !css.trim().is_empty())
            .map(ControlDescriptor::css);
        self
    }

    pub fn resolvers(&self) -> &Resolvers {
        &self.resolvers
    }

    pub(super) fn primitives(&self) -> &dyn ActionPrimitives {
        self.resolvers.primitives().as_ref()
    }

    /// Processes one record. Never fails: the outcome is in the report.
    #[instrument(skip_all, fields(row = record.sheet_row(), case_id = %record.case_number))]
    pub async fn process(&self, ctx: &ExecCtx, record: &CaseRecord) -> RowReport {
        let started = Instant::now();
        let mut report = RowReport::new(record);
        report.outcome = Outcome::InProgress;
        report.enter(RowState::Start);
        info!("Processing case");

        match self.drive(ctx, record, &mut report).await {
            Ok(()) => {
                report.succeed();
                info!(
                    field_failures = report.field_failures.len(),
                    party_failures = report.party_failures.len(),
                    "Case saved"
                );
            }
            Err(err) => {
                warn!(state = ?report.current_state(), error = %err, "Case failed");
                report.fail(err.to_string());
            }
        }
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        report
    }

    async fn drive(
        &self,
        ctx: &ExecCtx,
        record: &CaseRecord,
        report: &mut RowReport,
    ) -> Result<(), FlowError> {
        report.enter(RowState::OpenRecord);
        let case = record.case_number.as_str();
        self.executor
            .require(&format!("Abrir processo {case}"), || self.open_record(ctx, case))
            .await?;

        report.enter(RowState::EditMode);
        let edit = ControlDescriptor::id(&self.controls.edit_button);
        self.executor
            .require("Editar", || self.click(ctx, &edit, WaitTier::Long))
            .await?;

        report.enter(RowState::FieldPopulation);
        self.populate_fields(ctx, record, report).await?;

        report.enter(RowState::RepeatedEntitySubloop);
        self.add_secondary_parties(ctx, record, report).await;

        report.enter(RowState::AttachmentUpload);
        self.upload_attachment(ctx, record, report).await;

        report.enter(RowState::Save);
        self.save(ctx).await
    }

    /// Global search: type the case number, wait for its suggestion, take it
    /// with the keyboard.
    async fn open_record(&self, ctx: &ExecCtx, case: &str) -> Result<(), ActionError> {
        let p = self.primitives();
        let tempo = self.resolvers.tempo();
        let search = ControlDescriptor::id(&self.controls.search_input);
        let panel = ControlDescriptor::id(CompanionIds::derive(&self.controls.search_input).panel);

        p.type_text(ctx, &search, case, TypeMode::bulk(), WaitTier::Medium)
            .await?;
        let suggestion = ControlDescriptor::entry(panel, SEARCH_ITEM, case, TextMatch::Contains);
        p.wait_for(ctx, &WaitCondition::Visible(suggestion), WaitTier::Medium)
            .await?;
        p.settle(tempo.filter_settle_ms).await;
        p.press_key(ctx, Key::ArrowDown).await?;
        p.settle(tempo.panel_open_ms).await;
        p.press_key(ctx, Key::Enter).await?;
        p.settle(tempo.post_click_ms).await;
        Ok(())
    }

    pub(super) async fn click(
        &self,
        ctx: &ExecCtx,
        control: &ControlDescriptor,
        tier: WaitTier,
    ) -> Result<(), ActionError> {
        let p = self.primitives();
        p.click(ctx, control, ClickPolicy::NativeThenScript, tier)
            .await?;
        p.settle(self.resolvers.tempo().post_click_ms).await;
        Ok(())
    }

    /// Field-level step: failures are recorded and the row goes on.
    pub(super) async fn field<T, E, F, Fut>(
        &self,
        report: &mut RowReport,
        step: &str,
        operation: F,
    ) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        match self
            .executor
            .run(step, FailureStrategy::Continue, operation)
            .await
        {
            Ok(StepOutcome::Completed(value)) => Some(value),
            Ok(StepOutcome::Tolerated(failure)) => {
                report.field_failures.push(failure.to_string());
                None
            }
            Err(err) => {
                report.field_failures.push(err.to_string());
                None
            }
        }
    }

    /// Submits the case's attachment. A missing file is logged and the
    /// upload still attempted.
    async fn upload_attachment(&self, ctx: &ExecCtx, record: &CaseRecord, report: &mut RowReport) {
        let path = absolute(self.attachments.path_for(&record.case_number));
        if !path.is_file() {
            warn!(path = %path.display(), "Attachment not found, attempting the upload anyway");
        }
        let input = ControlDescriptor::css(&self.controls.file_input);
        let (input, path) = (&input, path.as_path());
        let settle = self.resolvers.tempo().post_click_ms;
        self.field(report, "Anexar arquivo", || async move {
            let p = self.primitives();
            p.upload_file(ctx, input, path, WaitTier::Medium).await?;
            p.settle(settle).await;
            Ok::<_, ActionError>(())
        })
        .await;
    }

    async fn save(&self, ctx: &ExecCtx) -> Result<(), FlowError> {
        let save = ControlDescriptor::id(&self.controls.save_button);
        self.executor
            .require("Salvar", || self.click(ctx, &save, WaitTier::Short))
            .await?;

        if let Some(confirmation) = &self.save_confirmation {
            self.primitives()
                .wait_for(
                    ctx,
                    &WaitCondition::Visible(confirmation.clone()),
                    WaitTier::Medium,
                )
                .await
                .map_err(|err| FlowError::StepFailed {
                    step_id: "Salvar".to_string(),
                    reason: format!("save not confirmed ({confirmation}): {err}"),
                })?;
        }
        Ok(())
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}
