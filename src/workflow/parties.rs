use action_primitives::{ControlDescriptor, ExecCtx, TextMatch, WaitCondition, WaitTier};
use control_resolvers::OverlayField;
use tracing::{info, warn};

use super::report::RowReport;
use super::row::RowWorkflow;
use crate::record::CaseRecord;

/// Cell of the added-parties table that carries the party name.
const PARTY_CELL: &str = "span";

impl RowWorkflow {
    /// Adds every secondary party. A failing step drops only that party.
    pub(super) async fn add_secondary_parties(
        &self,
        ctx: &ExecCtx,
        record: &CaseRecord,
        report: &mut RowReport,
    ) {
        for (index, name) in record.secondary_parties.iter().enumerate() {
            let ordinal = index + 1;
            match self.add_party(ctx, name).await {
                Ok(()) => info!(party = %name, ordinal, "Secondary party added"),
                Err(reason) => {
                    warn!(party = %name, ordinal, reason = %reason, "Secondary party skipped");
                    report.party_failures.push(format!("{name}: {reason}"));
                }
            }
        }
    }

    async fn add_party(&self, ctx: &ExecCtx, name: &str) -> Result<(), String> {
        let parties = &self.controls.parties;
        let input = ControlDescriptor::id_suffix(&parties.autocomplete_suffix);
        let role = OverlayField::new(ControlDescriptor::id_suffix(&parties.role_select_suffix));
        let add = ControlDescriptor::id_suffix(&parties.add_button_suffix);
        let envelope = self.executor.envelope();

        envelope
            .attempt_report(&format!("Selecionar parte {name}"), || {
                self.resolvers.autocomplete(ctx, &input, name)
            })
            .await
            .map_err(|failure| failure.to_string())?;

        let role_value = self.controls.role_value.as_str();
        envelope
            .attempt_report(&format!("Papel {role_value} para {name}"), || {
                self.resolvers.overlay_select(ctx, &role, role_value)
            })
            .await
            .map_err(|failure| failure.to_string())?;

        envelope
            .attempt_report(&format!("Adicionar {name}"), || {
                self.click(ctx, &add, WaitTier::Short)
            })
            .await
            .map_err(|failure| failure.to_string())?;

        let listed = ControlDescriptor::entry(
            ControlDescriptor::css(&parties.table_css),
            PARTY_CELL,
            name,
            TextMatch::Contains,
        );
        self.primitives()
            .wait_for(ctx, &WaitCondition::Visible(listed), WaitTier::Medium)
            .await
            .map_err(|_| "name did not appear in the parties table".to_string())?;
        Ok(())
    }
}
