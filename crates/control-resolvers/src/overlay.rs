//! Overlay single-select: a label opens a floating panel of entries, which
//! may carry a text filter.

use action_primitives::{
    ClickPolicy, ControlDescriptor, ExecCtx, Key, TextMatch, TypeMode, WaitCondition, WaitTier,
};
use tracing::{debug, info, instrument, warn};

use crate::api::Resolvers;
use crate::errors::ResolveError;

/// Panel of the overlay that is currently open.
pub const OVERLAY_PANEL: &str = "div.ui-selectonemenu-panel[style*=\"display: block\"]";
pub const OVERLAY_ITEM: &str = "li.ui-selectonemenu-item";
pub const OVERLAY_FILTER: &str = "input[id*=\"_filter\"]";
pub const FIRST_ENABLED_ITEM: &str = "li.ui-selectonemenu-item:not(.ui-state-disabled)";

/// An overlay select addressed by the label that opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayField {
    pub label: ControlDescriptor,
    /// State/region selects display entries as `CODE - Name`.
    pub region: bool,
}

impl OverlayField {
    pub fn new(label: ControlDescriptor) -> Self {
        Self {
            label,
            region: false,
        }
    }

    pub fn region(label: ControlDescriptor) -> Self {
        Self {
            label,
            region: true,
        }
    }
}

/// Two-letter codes become the `CODE -` prefix of the displayed entry.
pub fn region_value(value: &str) -> String {
    let upper = value.trim().to_uppercase();
    if upper.chars().count() == 2 && upper.chars().all(|ch| ch.is_ascii_uppercase()) {
        format!("{upper} -")
    } else {
        value.trim().to_string()
    }
}

impl Resolvers {
    /// Opens the overlay and picks `value`, returning the label selected.
    #[instrument(skip_all, fields(action = %ctx.action_id, control = %field.label))]
    pub async fn overlay_select(
        &self,
        ctx: &ExecCtx,
        field: &OverlayField,
        value: &str,
    ) -> Result<String, ResolveError> {
        let value = if field.region {
            region_value(value)
        } else {
            value.trim().to_string()
        };
        let p = self.primitives.as_ref();
        info!(value = %value, "Selecting overlay entry");

        p.click(ctx, &field.label, ClickPolicy::NativeThenScript, WaitTier::Short)
            .await?;
        p.settle(self.tempo.panel_open_ms).await;

        let panel = ControlDescriptor::css(OVERLAY_PANEL);
        p.wait_for(ctx, &WaitCondition::Visible(panel.clone()), WaitTier::Long)
            .await
            .map_err(|err| ResolveError::PanelMissing {
                control: field.label.to_string(),
                cause: err.to_string(),
            })?;

        let filter = ControlDescriptor::within(panel.clone(), OVERLAY_FILTER);
        if !value.is_empty() && p.probe(ctx, &filter).await?.is_visible() {
            debug!("Panel exposes a filter");
            p.type_text(ctx, &filter, &value, TypeMode::bulk(), WaitTier::Short)
                .await?;
            p.settle(self.tempo.filter_settle_ms).await;
            if let Some(label) = self.click_entry(ctx, &panel, &value, TextMatch::Exact).await? {
                return Ok(label);
            }
            p.press_key(ctx, Key::Enter).await?;
            p.settle(self.tempo.post_click_ms).await;
            return Ok(value);
        }

        if !value.is_empty() {
            for matching in [TextMatch::Exact, TextMatch::Contains] {
                if let Some(label) = self.click_entry(ctx, &panel, &value, matching).await? {
                    return Ok(label);
                }
            }
        }

        let first = ControlDescriptor::within(panel, FIRST_ENABLED_ITEM);
        let probe = p.probe(ctx, &first).await?;
        if !probe.found {
            return Err(ResolveError::OptionMissing {
                control: field.label.to_string(),
                value,
            });
        }
        p.click(ctx, &first, ClickPolicy::ScriptOnly, WaitTier::Short)
            .await?;
        p.settle(self.tempo.post_click_ms).await;
        let chosen = probe.label.unwrap_or_else(|| value.clone());
        if !value.is_empty() {
            warn!(requested = %value, chosen = %chosen, "No entry matches, took the first enabled entry");
        }
        Ok(chosen)
    }

    async fn click_entry(
        &self,
        ctx: &ExecCtx,
        panel: &ControlDescriptor,
        value: &str,
        matching: TextMatch,
    ) -> Result<Option<String>, ResolveError> {
        let p = self.primitives.as_ref();
        let entry = ControlDescriptor::entry(panel.clone(), OVERLAY_ITEM, value, matching);
        let probe = p.probe(ctx, &entry).await?;
        if !probe.is_visible() {
            return Ok(None);
        }
        p.click(ctx, &entry, ClickPolicy::NativeThenScript, WaitTier::Short)
            .await?;
        p.settle(self.tempo.post_click_ms).await;
        Ok(Some(probe.label.unwrap_or_else(|| value.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeElement, FakePage, Interaction, Reaction};
    use crate::{ResolverBuilder, Tempo};
    use action_primitives::ActionError;
    use std::sync::Arc;

    fn resolvers(page: &Arc<FakePage>) -> Resolvers {
        ResolverBuilder::new(page.clone())
            .with_tiers(FakePage::quick_tiers())
            .with_tempo(Tempo::instant())
            .build()
    }

    fn panel() -> ControlDescriptor {
        ControlDescriptor::css(OVERLAY_PANEL)
    }

    fn entry(label: &str) -> ControlDescriptor {
        ControlDescriptor::entry(panel(), OVERLAY_ITEM, label, TextMatch::Exact)
    }

    fn overlay(page: &FakePage, label: &ControlDescriptor) {
        page.add(label.clone(), FakeElement::visible());
        page.add(panel(), FakeElement::hidden());
        page.on(label.clone(), Interaction::Click, vec![Reaction::Show(panel())]);
    }

    #[test]
    fn region_codes_gain_the_separator() {
        assert_eq!(region_value("sp"), "SP -");
        assert_eq!(region_value(" RJ "), "RJ -");
        assert_eq!(region_value("São Paulo"), "São Paulo");
        assert_eq!(region_value("S1"), "S1");
    }

    #[tokio::test]
    async fn picks_matching_entry_without_filter() {
        let page = FakePage::new();
        let label = ControlDescriptor::id("form:comboFase_label");
        overlay(&page, &label);
        page.add(entry("Conhecimento"), FakeElement::visible().with_label("Conhecimento"));

        let picked = resolvers(&page)
            .overlay_select(&FakePage::ctx(), &OverlayField::new(label), "conhecimento")
            .await
            .expect("select");

        assert_eq!(picked, "Conhecimento");
        assert!(page.log().contains(&format!("click {}", entry("conhecimento"))));
    }

    #[tokio::test]
    async fn filter_is_typed_then_confirmed_with_enter() {
        let page = FakePage::new();
        let label = ControlDescriptor::id("form:comboEstadoVara_label");
        let filter = ControlDescriptor::within(panel(), OVERLAY_FILTER);
        overlay(&page, &label);
        page.add(filter.clone(), FakeElement::visible());

        let picked = resolvers(&page)
            .overlay_select(&FakePage::ctx(), &OverlayField::region(label), "sp")
            .await
            .expect("select");

        assert_eq!(picked, "SP -");
        assert_eq!(page.value_of(&filter).as_deref(), Some("SP -"));
        assert_eq!(page.log().last().map(String::as_str), Some("key Enter"));
    }

    #[tokio::test]
    async fn unmatched_value_falls_back_to_first_enabled_entry() {
        let page = FakePage::new();
        let label = ControlDescriptor::id("form:comboRito_label");
        let first = ControlDescriptor::within(panel(), FIRST_ENABLED_ITEM);
        overlay(&page, &label);
        page.add(first.clone(), FakeElement::visible().with_label("Ordinário"));

        let picked = resolvers(&page)
            .overlay_select(&FakePage::ctx(), &OverlayField::new(label), "Sumaríssimo")
            .await
            .expect("select");

        assert_eq!(picked, "Ordinário");
        assert!(page.log().contains(&format!("script-click {first}")));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn fallback_warns_with_requested_and_chosen_entry() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let page = FakePage::new();
        let label = ControlDescriptor::id("form:comboRito_label");
        let first = ControlDescriptor::within(panel(), FIRST_ENABLED_ITEM);
        overlay(&page, &label);
        page.add(first, FakeElement::visible().with_label("Ordinário"));

        resolvers(&page)
            .overlay_select(&FakePage::ctx(), &OverlayField::new(label), "Sumaríssimo")
            .await
            .expect("select");

        let output = String::from_utf8_lossy(&captured.0.lock()).into_owned();
        let warning = output
            .lines()
            .find(|line| line.contains("took the first enabled entry"))
            .expect("fallback warning");
        assert!(warning.contains("WARN"));
        assert!(warning.contains("requested=Sumaríssimo"));
        assert!(warning.contains("chosen=Ordinário"));
    }

    #[tokio::test]
    async fn exact_match_does_not_warn() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let page = FakePage::new();
        let label = ControlDescriptor::id("form:comboFase_label");
        overlay(&page, &label);
        page.add(entry("Conhecimento"), FakeElement::visible().with_label("Conhecimento"));

        resolvers(&page)
            .overlay_select(&FakePage::ctx(), &OverlayField::new(label), "Conhecimento")
            .await
            .expect("select");

        assert!(captured.0.lock().is_empty());
    }

    #[tokio::test]
    async fn closed_panel_is_reported() {
        let page = FakePage::new();
        let label = ControlDescriptor::id("form:comboVara_label");
        page.add(label.clone(), FakeElement::visible());

        let err = resolvers(&page)
            .overlay_select(&FakePage::ctx(), &OverlayField::new(label), "1ª Vara")
            .await
            .expect_err("no panel");
        assert!(matches!(err, ResolveError::PanelMissing { .. }));
    }

    #[tokio::test]
    async fn blocked_label_surfaces_the_primitive_error() {
        let page = FakePage::new();
        let label = ControlDescriptor::id("form:comboInstancia_label");
        overlay(&page, &label);
        page.fail(
            label.clone(),
            Interaction::Click,
            1,
            ActionError::NotClickable("covered".into()),
        );

        let err = resolvers(&page)
            .overlay_select(&FakePage::ctx(), &OverlayField::new(label), "1ª Instância")
            .await
            .expect_err("blocked");
        assert_eq!(
            err,
            ResolveError::Action(ActionError::NotClickable("covered".into()))
        );
    }
}
