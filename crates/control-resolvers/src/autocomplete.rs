//! Autocomplete inputs: type, let the suggestion panel render, pick an entry.

use action_primitives::{
    css_attr_value, poll_until, ActionError, ClickPolicy, ControlDescriptor, ExecCtx, Key,
    TextMatch, TypeMode, WaitCondition, WaitTier,
};
use tracing::{debug, info, instrument, warn};

use crate::api::Resolvers;
use crate::errors::ResolveError;
use crate::text::normalize_label;

/// Suggestion panel that is currently open, when the input names none.
pub const SUGGESTION_PANEL: &str = "div.ui-autocomplete-panel[style*=\"display: block\"]";
pub const SUGGESTION_ITEM: &str = "li.ui-autocomplete-item";
pub const FIRST_SUGGESTION: &str = "li.ui-autocomplete-item:not(.ui-state-disabled)";

/// Panel and hidden companion ids derived from an `<base>_input` id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionIds {
    pub input: String,
    pub panel: String,
    pub hidden: String,
}

impl CompanionIds {
    pub fn derive(input_id: &str) -> Self {
        let base = input_id.strip_suffix("_input").unwrap_or(input_id);
        Self {
            input: input_id.to_string(),
            panel: format!("{base}_panel"),
            hidden: format!("{base}_hinput"),
        }
    }
}

impl Resolvers {
    /// Types `text` and takes the best suggestion, returning its label.
    ///
    /// An entry whose label equals the text wins, otherwise the first enabled
    /// entry. Without a panel the keyboard path (arrow-down, enter) is used.
    #[instrument(skip_all, fields(action = %ctx.action_id, control = %input))]
    pub async fn autocomplete(
        &self,
        ctx: &ExecCtx,
        input: &ControlDescriptor,
        text: &str,
    ) -> Result<String, ResolveError> {
        let p = self.primitives.as_ref();
        info!(text = %text, "Filling autocomplete");

        p.wait_for(ctx, &WaitCondition::Visible(input.clone()), WaitTier::Short)
            .await?;
        let probe = p.probe(ctx, input).await?;
        // Label-relative inputs are pinned to their id for the rest of the attempt.
        let field = probe
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(ControlDescriptor::id)
            .unwrap_or_else(|| input.clone());
        let panel = probe
            .aria_controls
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(ControlDescriptor::id)
            .unwrap_or_else(|| ControlDescriptor::css(SUGGESTION_PANEL));

        p.type_text(
            ctx,
            &field,
            text,
            TypeMode::paced(self.tempo.paced_char_ms, None),
            WaitTier::Short,
        )
        .await?;
        p.settle(self.tempo.autocomplete_settle_ms).await;

        if !p.probe(ctx, &panel).await?.is_visible() {
            warn!(panel = %panel, "No suggestion panel, using the keyboard");
            p.press_key(ctx, Key::ArrowDown).await?;
            p.settle(self.tempo.panel_open_ms).await;
            p.press_key(ctx, Key::Enter).await?;
            p.settle(self.tempo.post_click_ms).await;
            let value = p.probe(ctx, &field).await?.value_or_empty().trim().to_string();
            // Still holding the typed text means no entry was taken.
            if value.is_empty() || value == text.trim() {
                return Err(ResolveError::NoCandidate {
                    control: input.to_string(),
                    text: text.to_string(),
                });
            }
            return Ok(value);
        }

        let mut chosen = None;
        for candidate in [
            ControlDescriptor::entry(panel.clone(), SUGGESTION_ITEM, text, TextMatch::Exact),
            ControlDescriptor::within(panel.clone(), FIRST_SUGGESTION),
        ] {
            let probe = p.probe(ctx, &candidate).await?;
            if probe.is_visible() && probe.enabled {
                chosen = Some((candidate, probe.label.unwrap_or_default()));
                break;
            }
        }
        let Some((candidate, label)) = chosen else {
            return Err(ResolveError::NoCandidate {
                control: input.to_string(),
                text: text.to_string(),
            });
        };
        debug!(label = %label, "Clicking suggestion");
        p.click(ctx, &candidate, ClickPolicy::NativeThenScript, WaitTier::Short)
            .await?;

        let wanted = normalize_label(&label);
        let reflected = poll_until(self.tiers.duration(WaitTier::Short), || {
            let field = field.clone();
            let wanted = wanted.clone();
            async move {
                let probe = p.probe(ctx, &field).await?;
                Ok::<_, ActionError>(
                    normalize_label(probe.value_or_empty())
                        .contains(&wanted)
                        .then_some(()),
                )
            }
        })
        .await?;
        if reflected.is_none() {
            warn!(label = %label, "Input value did not pick up the suggestion");
        }
        p.press_key(ctx, Key::Enter).await?;
        p.settle(self.tempo.post_click_ms).await;
        Ok(if label.is_empty() { text.to_string() } else { label })
    }

    /// Autocomplete whose entries carry `data-item-label` and whose choice
    /// lands in a hidden `<base>_hinput` companion.
    #[instrument(skip_all, fields(action = %ctx.action_id, input = %input_id))]
    pub async fn autocomplete_exact(
        &self,
        ctx: &ExecCtx,
        input_id: &str,
        value: &str,
    ) -> Result<String, ResolveError> {
        let p = self.primitives.as_ref();
        let ids = CompanionIds::derive(input_id);
        let input = ControlDescriptor::id(&ids.input);
        let panel = ControlDescriptor::id(&ids.panel);
        let value = value.trim();
        info!(value = %value, "Filling exact-label autocomplete");

        p.scroll_into_view(ctx, &input, WaitTier::Short).await?;
        p.type_text(
            ctx,
            &input,
            value,
            TypeMode::paced(self.tempo.paced_char_ms, None),
            WaitTier::Short,
        )
        .await?;
        p.wait_for(ctx, &WaitCondition::Visible(panel.clone()), WaitTier::Medium)
            .await
            .map_err(|err| ResolveError::PanelMissing {
                control: ids.input.clone(),
                cause: err.to_string(),
            })?;

        let option = ControlDescriptor::within(
            panel,
            format!(
                "{SUGGESTION_ITEM}[data-item-label=\"{}\"]",
                css_attr_value(value)
            ),
        );
        p.wait_for(ctx, &WaitCondition::Visible(option.clone()), WaitTier::Medium)
            .await
            .map_err(|_| ResolveError::OptionMissing {
                control: ids.input.clone(),
                value: value.to_string(),
            })?;
        p.click(ctx, &option, ClickPolicy::ScriptOnly, WaitTier::Short)
            .await?;
        p.settle(self.tempo.post_click_ms).await;

        let hidden = p.probe(ctx, &ControlDescriptor::id(&ids.hidden)).await?;
        if hidden.found && hidden.value_or_empty().trim().is_empty() {
            return Err(ResolveError::NotReflected { control: ids.input });
        }
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeElement, FakePage, Interaction, Reaction};
    use crate::{ResolverBuilder, Tempo};
    use std::sync::Arc;

    fn resolvers(page: &Arc<FakePage>) -> Resolvers {
        ResolverBuilder::new(page.clone())
            .with_tiers(FakePage::quick_tiers())
            .with_tempo(Tempo::instant())
            .build()
    }

    const INPUT: &str = "form:autocompleteOutraParte_input";
    const PANEL: &str = "form:autocompleteOutraParte_panel";

    fn suggestion_page(page: &FakePage, label: &str) -> ControlDescriptor {
        let input = ControlDescriptor::id(INPUT);
        let panel = ControlDescriptor::id(PANEL);
        let first = ControlDescriptor::within(panel.clone(), FIRST_SUGGESTION);
        page.add(
            input.clone(),
            FakeElement::visible().with_id(INPUT).controls(PANEL),
        );
        page.add(panel.clone(), FakeElement::hidden());
        page.add(first.clone(), FakeElement::visible().with_label(label));
        page.on(input.clone(), Interaction::Type, vec![Reaction::Show(panel.clone())]);
        page.on(
            first.clone(),
            Interaction::Click,
            vec![
                Reaction::SetValue(input.clone(), label.to_string()),
                Reaction::Hide(panel),
            ],
        );
        first
    }

    #[test]
    fn companion_ids_follow_the_input_base() {
        let ids = CompanionIds::derive("form:autoCompleteLawyer_input");
        assert_eq!(ids.panel, "form:autoCompleteLawyer_panel");
        assert_eq!(ids.hidden, "form:autoCompleteLawyer_hinput");
        assert_eq!(CompanionIds::derive("plain").panel, "plain_panel");
    }

    #[tokio::test]
    async fn first_suggestion_is_clicked_and_confirmed() {
        let page = FakePage::new();
        let first = suggestion_page(&page, "ACME LTDA");

        let label = resolvers(&page)
            .autocomplete(&FakePage::ctx(), &ControlDescriptor::id(INPUT), "acme")
            .await
            .expect("resolve");

        assert_eq!(label, "ACME LTDA");
        let log = page.log();
        assert!(log.contains(&format!("click {first}")));
        assert_eq!(log.last().map(String::as_str), Some("key Enter"));
        assert_eq!(
            page.value_of(&ControlDescriptor::id(INPUT)).as_deref(),
            Some("ACME LTDA")
        );
    }

    #[tokio::test]
    async fn keyboard_path_when_no_panel_renders() {
        let page = FakePage::new();
        let input = ControlDescriptor::id(INPUT);
        page.add(input.clone(), FakeElement::visible().with_id(INPUT));
        page.on(
            input.clone(),
            Interaction::Key(Key::Enter),
            vec![Reaction::SetValue(input.clone(), "Dr. Fulano".into())],
        );

        let label = resolvers(&page)
            .autocomplete(&FakePage::ctx(), &input, "Fulano")
            .await
            .expect("keyboard");

        assert_eq!(label, "Dr. Fulano");
        let keys: Vec<String> = page
            .log()
            .into_iter()
            .filter(|entry| entry.starts_with("key "))
            .collect();
        assert_eq!(keys, vec!["key ArrowDown", "key Enter"]);
    }

    #[tokio::test]
    async fn keyboard_path_keeping_the_typed_text_has_no_candidate() {
        let page = FakePage::new();
        let input = ControlDescriptor::id(INPUT);
        page.add(input.clone(), FakeElement::visible().with_id(INPUT));

        let err = resolvers(&page)
            .autocomplete(&FakePage::ctx(), &input, "Fulano")
            .await
            .expect_err("nothing was picked");

        assert_eq!(
            err,
            ResolveError::NoCandidate {
                control: input.to_string(),
                text: "Fulano".into(),
            }
        );
        assert_eq!(page.value_of(&input).as_deref(), Some("Fulano"));
        let keys: Vec<String> = page
            .log()
            .into_iter()
            .filter(|entry| entry.starts_with("key "))
            .collect();
        assert_eq!(keys, vec!["key ArrowDown", "key Enter"]);
    }

    #[tokio::test]
    async fn empty_panel_has_no_candidate() {
        let page = FakePage::new();
        let input = ControlDescriptor::id(INPUT);
        page.add(input.clone(), FakeElement::visible().with_id(INPUT).controls(PANEL));
        page.add(ControlDescriptor::id(PANEL), FakeElement::visible());

        let err = resolvers(&page)
            .autocomplete(&FakePage::ctx(), &input, "Ninguém")
            .await
            .expect_err("nothing to pick");
        assert!(matches!(err, ResolveError::NoCandidate { .. }));
    }

    #[tokio::test]
    async fn label_relative_input_is_pinned_to_its_id() {
        let page = FakePage::new();
        suggestion_page(&page, "Escritório Alfa");
        let by_label = ControlDescriptor::following_label("Escritório Externo", Some("autocomplete"));
        page.add(
            by_label.clone(),
            FakeElement::visible().with_id(INPUT).controls(PANEL),
        );

        let label = resolvers(&page)
            .autocomplete(&FakePage::ctx(), &by_label, "Alfa")
            .await
            .expect("resolve");

        assert_eq!(label, "Escritório Alfa");
        assert!(page
            .log()
            .iter()
            .any(|entry| entry == &format!("type {} = Alfa", ControlDescriptor::id(INPUT))));
    }

    #[tokio::test]
    async fn exact_label_requires_hidden_companion_value() {
        let page = FakePage::new();
        let ids = CompanionIds::derive("form:autoCompleteLawyer_input");
        let input = ControlDescriptor::id(&ids.input);
        let panel = ControlDescriptor::id(&ids.panel);
        let option = ControlDescriptor::within(
            panel.clone(),
            "li.ui-autocomplete-item[data-item-label=\"Maria Souza\"]",
        );
        page.add(input.clone(), FakeElement::visible());
        page.add(panel.clone(), FakeElement::hidden());
        page.add(option.clone(), FakeElement::visible());
        page.add(ControlDescriptor::id(&ids.hidden), FakeElement::hidden());
        page.on(input, Interaction::Type, vec![Reaction::Show(panel)]);

        let err = resolvers(&page)
            .autocomplete_exact(&FakePage::ctx(), &ids.input, "Maria Souza")
            .await
            .expect_err("hidden empty");
        assert_eq!(
            err,
            ResolveError::NotReflected {
                control: ids.input.clone()
            }
        );

        page.on(
            option,
            Interaction::Click,
            vec![Reaction::SetValue(
                ControlDescriptor::id(&ids.hidden),
                "4411".into(),
            )],
        );
        let value = resolvers(&page)
            .autocomplete_exact(&FakePage::ctx(), &ids.input, "Maria Souza")
            .await
            .expect("reflected");
        assert_eq!(value, "Maria Souza");
    }

    #[tokio::test]
    async fn exact_label_missing_option() {
        let page = FakePage::new();
        let ids = CompanionIds::derive("form:gestor_input");
        page.add(ControlDescriptor::id(&ids.input), FakeElement::visible());
        page.add(ControlDescriptor::id(&ids.panel), FakeElement::visible());

        let err = resolvers(&page)
            .autocomplete_exact(&FakePage::ctx(), &ids.input, "Ana")
            .await
            .expect_err("missing");
        assert!(matches!(err, ResolveError::OptionMissing { .. }));
    }
}
