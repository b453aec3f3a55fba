use action_flow::FlowError;
use action_primitives::{ActionError, ControlDescriptor, ExecCtx, Key, TypeMode, WaitTier};
use control_resolvers::{DialogButton, DialogField, DialogSpec, OverlayField};
use tracing::{debug, info, warn};

use super::report::RowReport;
use super::row::RowWorkflow;
use crate::config::DialogControls;
use crate::record::{columns, CaseRecord};

/// Dialog spec for a one-input dialog.
pub fn dialog_spec(controls: &DialogControls, value: &str) -> DialogSpec {
    DialogSpec {
        opener: ControlDescriptor::id(&controls.opener),
        hint: controls.hint.clone(),
        fields: vec![DialogField {
            control: ControlDescriptor::id(&controls.input),
            value: value.to_string(),
        }],
        buttons: controls
            .buttons
            .iter()
            .map(|button| {
                let mut spec = DialogButton::new(&button.name, ControlDescriptor::id(&button.id));
                if let Some(css) = button.fallback_css.as_deref().filter(|css| !css.is_empty()) {
                    spec = spec.or(ControlDescriptor::css(css));
                }
                if button.await_visible {
                    spec = spec.awaited();
                }
                spec
            })
            .collect(),
    }
}

impl RowWorkflow {
    /// Optional fields are field-level; the two dialogs end the row when
    /// they fail.
    pub(super) async fn populate_fields(
        &self,
        ctx: &ExecCtx,
        record: &CaseRecord,
        report: &mut RowReport,
    ) -> Result<(), FlowError> {
        let selects = &self.controls.selects;
        let optional = [
            (columns::RITE, &record.rite, &selects.rite, false),
            (columns::STATE, &record.state, &selects.state, true),
            (columns::COMARCA, &record.comarca, &selects.comarca, false),
            (columns::FORUM, &record.forum, &selects.forum, false),
            (columns::COURT_DIVISION, &record.court_division, &selects.court_division, false),
            (columns::CLASSIFICATION, &record.classification, &selects.classification, false),
            (columns::INSTANCE, &record.instance, &selects.instance, false),
            (columns::PHASE, &record.phase, &selects.phase, false),
            (columns::CLIENT_COMPANY, &record.client_company, &selects.client_company, false),
        ];
        for (step, value, label_id, region) in optional {
            if value.is_empty() {
                continue;
            }
            self.select(ctx, report, step, label_id, value, region).await;
        }

        let document_type = if record.document_type.is_empty() {
            self.controls.default_document_type.as_str()
        } else {
            record.document_type.as_str()
        };
        let fixed = [
            ("Papel", self.controls.role_value.as_str(), &selects.role),
            (columns::DOCUMENT_TYPE, document_type, &selects.document_type),
            (
                "Parte do documento",
                self.controls.document_party_value.as_str(),
                &selects.document_party,
            ),
        ];
        for (step, value, label_id) in fixed {
            self.select(ctx, report, step, label_id, value, false).await;
        }

        if !record.judge.is_empty() {
            let spec = dialog_spec(&self.controls.judge_dialog, &record.judge);
            let outcome = self
                .executor
                .require(columns::JUDGE, || self.resolvers.dialog_session(ctx, &spec))
                .await?;
            debug!(dialog = %outcome.dialog_id, closed = outcome.closed, "Judge registered");
        }

        if !record.opposing_tax_id.is_empty() {
            let spec = dialog_spec(&self.controls.opposing_party_dialog, &record.opposing_tax_id);
            let outcome = self
                .executor
                .require("Parte Contrária", || self.resolvers.dialog_session(ctx, &spec))
                .await?;
            debug!(dialog = %outcome.dialog_id, closed = outcome.closed, "Opposing party registered");
        }

        if !record.opposing_counsel.is_empty() {
            let input = ControlDescriptor::id(&self.controls.opposing_counsel_input);
            let text = record.opposing_counsel.as_str();
            self.field(report, columns::OPPOSING_COUNSEL, || {
                self.resolvers.autocomplete(ctx, &input, text)
            })
            .await;
        }

        for (step, input_id, date) in [
            (
                columns::DISTRIBUTION_DATE,
                &self.controls.distribution_date_input,
                &record.distribution_date,
            ),
            (
                columns::CITATION_DATE,
                &self.controls.citation_date_input,
                &record.citation_date,
            ),
        ] {
            if date.is_empty() {
                continue;
            }
            let input = ControlDescriptor::id(input_id);
            let mode = TypeMode::paced(self.resolvers.tempo().paced_char_ms, Some(Key::Enter));
            self.field(report, step, || self.type_into(ctx, &input, date, mode))
                .await;
        }

        if !record.action_type.is_empty() {
            self.select(
                ctx,
                report,
                columns::ACTION_TYPE,
                &selects.action_type,
                &record.action_type,
                false,
            )
            .await;
        }

        if !record.claim_amount.is_empty() {
            let input = ControlDescriptor::id(&self.controls.amount_input);
            let amount = record.claim_amount.as_str();
            self.field(report, columns::CLAIM_AMOUNT, || {
                self.type_into(ctx, &input, amount, TypeMode::bulk())
            })
            .await;
        }

        if !record.responsible_lawyer.is_empty() {
            let lawyer = record.responsible_lawyer.as_str();
            let input_id = self.controls.responsible_lawyer_input.as_str();
            let resolved = self
                .field(report, columns::RESPONSIBLE_LAWYER, || {
                    self.resolvers.autocomplete_exact(ctx, input_id, lawyer)
                })
                .await;
            if resolved.is_some() {
                self.select(
                    ctx,
                    report,
                    "Advogado Responsável (seleção)",
                    &selects.responsible_lawyer,
                    lawyer,
                    false,
                )
                .await;
            } else {
                warn!(lawyer = %lawyer, "Lawyer autocomplete gave no match, leaving the select alone");
            }
        }

        if !record.legal_manager.is_empty() {
            let manager = record.legal_manager.as_str();
            let input_id = self.controls.legal_manager_input.as_str();
            self.field(report, columns::LEGAL_MANAGER, || {
                self.resolvers.autocomplete_exact(ctx, input_id, manager)
            })
            .await;
        }

        if !record.external_office.is_empty() {
            let office = record.external_office.as_str();
            let selected = self
                .select(
                    ctx,
                    report,
                    columns::EXTERNAL_OFFICE,
                    &selects.external_office,
                    office,
                    false,
                )
                .await;
            if selected.is_none() {
                info!("Office select failed, trying the labelled autocomplete");
                let input = ControlDescriptor::following_label(
                    &self.controls.external_office_caption,
                    Some(self.controls.external_office_input_fragment.as_str())
                        .filter(|fragment| !fragment.is_empty()),
                );
                self.field(report, "Escritório Externo (autocomplete)", || {
                    self.resolvers.autocomplete(ctx, &input, office)
                })
                .await;
            }
        }
        Ok(())
    }

    async fn select(
        &self,
        ctx: &ExecCtx,
        report: &mut RowReport,
        step: &str,
        label_id: &str,
        value: &str,
        region: bool,
    ) -> Option<String> {
        let label = ControlDescriptor::id(label_id);
        let field = if region {
            OverlayField::region(label)
        } else {
            OverlayField::new(label)
        };
        self.field(report, step, || self.resolvers.overlay_select(ctx, &field, value))
            .await
    }

    async fn type_into(
        &self,
        ctx: &ExecCtx,
        input: &ControlDescriptor,
        text: &str,
        mode: TypeMode,
    ) -> Result<(), ActionError> {
        let p = self.primitives();
        p.scroll_into_view(ctx, input, WaitTier::Short).await?;
        p.type_text(ctx, input, text, mode, WaitTier::Short).await?;
        p.settle(self.resolvers.tempo().post_click_ms).await;
        Ok(())
    }
}
