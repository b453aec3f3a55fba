//! In-memory page implementing [`ActionPrimitives`].
//!
//! Elements are registered per document (the page or a dialog frame) under
//! the descriptor the code under test will use. Interactions can trigger
//! reactions (show a panel, set a value, open a dialog) and can be made to
//! fail a given number of times. Every interaction is appended to a log.

use std::path::Path;
use std::sync::Arc;

use action_primitives::{
    ActionError, ActionPrimitives, ActionReport, ClickPolicy, ControlDescriptor, DialogProbe,
    ElementProbe, ExecCtx, Key, TextMatch, TypeMode, WaitCondition, WaitTier, WaitTiers,
};
use async_trait::async_trait;
use casefill_core_types::ExecRoute;
use chrono::Utc;
use parking_lot::Mutex;
use std::time::Instant;

use crate::text::normalize_label;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeElement {
    pub visible: bool,
    pub enabled: bool,
    pub value: String,
    pub label: Option<String>,
    pub id: Option<String>,
    pub aria_controls: Option<String>,
}

impl FakeElement {
    pub fn visible() -> Self {
        Self {
            visible: true,
            enabled: true,
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            enabled: true,
            ..Self::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn controls(mut self, panel_id: impl Into<String>) -> Self {
        self.aria_controls = Some(panel_id.into());
        self
    }
}

/// What happened to a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Click,
    Type,
    SetValue,
    Upload,
    /// Key pressed while the control held focus.
    Key(Key),
}

/// Page change caused by an interaction.
///
/// Element reactions apply to the document the interaction happened in;
/// dialog reactions always apply to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Show(ControlDescriptor),
    Hide(ControlDescriptor),
    SetValue(ControlDescriptor, String),
    Insert(ControlDescriptor, FakeElement),
    OpenDialog { id: String, frame_selector: String },
    CloseDialog(String),
    Navigate(String),
}

#[derive(Debug, Clone)]
struct Registered {
    frame: Option<String>,
    control: ControlDescriptor,
    element: FakeElement,
}

#[derive(Debug, Clone)]
struct Trigger {
    frame: Option<String>,
    control: ControlDescriptor,
    interaction: Interaction,
    reactions: Vec<Reaction>,
}

#[derive(Debug, Clone)]
struct Failure {
    control: ControlDescriptor,
    interaction: Interaction,
    remaining: u32,
    error: ActionError,
}

#[derive(Debug, Default)]
struct PageState {
    elements: Vec<Registered>,
    triggers: Vec<Trigger>,
    failures: Vec<Failure>,
    dialogs: Vec<DialogProbe>,
    frames: Vec<String>,
    frame: Option<String>,
    focused: Option<(Option<String>, ControlDescriptor)>,
    url: String,
    dead: bool,
    log: Vec<String>,
}

impl PageState {
    fn position(&self, frame: &Option<String>, wanted: &ControlDescriptor) -> Option<usize> {
        let hits: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, reg)| &reg.frame == frame && descriptor_matches(&reg.control, wanted))
            .map(|(index, _)| index)
            .collect();
        hits.iter()
            .copied()
            .find(|index| self.elements[*index].element.visible)
            .or_else(|| hits.first().copied())
    }

    fn element(&self, frame: &Option<String>, wanted: &ControlDescriptor) -> Option<&FakeElement> {
        self.position(frame, wanted).map(|index| &self.elements[index].element)
    }

    fn upsert(&mut self, frame: Option<String>, control: ControlDescriptor, element: FakeElement) {
        match self
            .elements
            .iter()
            .position(|reg| reg.frame == frame && reg.control == control)
        {
            Some(index) => self.elements[index].element = element,
            None => self.elements.push(Registered {
                frame,
                control,
                element,
            }),
        }
    }

    fn modify(
        &mut self,
        frame: &Option<String>,
        control: &ControlDescriptor,
        change: impl FnOnce(&mut FakeElement),
    ) {
        match self.position(frame, control) {
            Some(index) => change(&mut self.elements[index].element),
            None => {
                let mut element = FakeElement::hidden();
                change(&mut element);
                self.elements.push(Registered {
                    frame: frame.clone(),
                    control: control.clone(),
                    element,
                });
            }
        }
    }

    fn check(&self) -> Result<(), ActionError> {
        if self.dead {
            return Err(ActionError::SessionLost("page closed".into()));
        }
        Ok(())
    }

    fn injected(
        &mut self,
        control: &ControlDescriptor,
        interaction: Interaction,
    ) -> Result<(), ActionError> {
        if let Some(failure) = self.failures.iter_mut().find(|failure| {
            failure.remaining > 0
                && failure.interaction == interaction
                && descriptor_matches(&failure.control, control)
        }) {
            failure.remaining -= 1;
            return Err(failure.error.clone());
        }
        Ok(())
    }

    fn interactable(&self, control: &ControlDescriptor, visible: bool) -> Result<(), ActionError> {
        let Some(element) = self.element(&self.frame, control) else {
            return Err(ActionError::AnchorNotFound(control.to_string()));
        };
        if visible && !element.visible {
            return Err(ActionError::NotClickable(format!(
                "{control} present but not visible"
            )));
        }
        if visible && !element.enabled {
            return Err(ActionError::NotEnabled(control.to_string()));
        }
        Ok(())
    }

    fn fire(&mut self, control: &ControlDescriptor, interaction: Interaction) {
        let frame = self.frame.clone();
        let reactions: Vec<Reaction> = self
            .triggers
            .iter()
            .filter(|trigger| {
                trigger.frame == frame
                    && trigger.interaction == interaction
                    && descriptor_matches(&trigger.control, control)
            })
            .flat_map(|trigger| trigger.reactions.clone())
            .collect();
        for reaction in reactions {
            self.apply(&frame, reaction);
        }
    }

    fn apply(&mut self, frame: &Option<String>, reaction: Reaction) {
        match reaction {
            Reaction::Show(control) => self.modify(frame, &control, |el| el.visible = true),
            Reaction::Hide(control) => self.modify(frame, &control, |el| el.visible = false),
            Reaction::SetValue(control, value) => self.modify(frame, &control, |el| el.value = value),
            Reaction::Insert(control, element) => self.upsert(frame.clone(), control, element),
            Reaction::OpenDialog { id, frame_selector } => {
                self.upsert(None, ControlDescriptor::id(&id), FakeElement::visible().with_id(&id));
                if !self.frames.contains(&frame_selector) {
                    self.frames.push(frame_selector.clone());
                }
                self.dialogs.push(DialogProbe { id, frame_selector });
            }
            Reaction::CloseDialog(id) => {
                self.modify(&None, &ControlDescriptor::id(&id), |el| el.visible = false);
                self.dialogs.retain(|dialog| dialog.id != id);
            }
            Reaction::Navigate(url) => self.url = url,
        }
    }
}

/// Registered descriptors match wanted ones by equality, except entries,
/// which compare folded labels the way the in-page finder does.
fn descriptor_matches(registered: &ControlDescriptor, wanted: &ControlDescriptor) -> bool {
    match (registered, wanted) {
        (
            ControlDescriptor::Entry {
                scope: have_scope,
                item_css: have_items,
                text: have_text,
                ..
            },
            ControlDescriptor::Entry {
                scope,
                item_css,
                text,
                matching,
            },
        ) => {
            let have = normalize_label(have_text);
            let want = normalize_label(text);
            have_scope == scope
                && have_items == item_css
                && match matching {
                    TextMatch::Exact => have == want,
                    TextMatch::Contains => have.contains(&want),
                }
        }
        _ => registered == wanted,
    }
}

#[derive(Debug, Default)]
pub struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ctx() -> ExecCtx {
        ExecCtx::new(ExecRoute::main_frame(Default::default(), Default::default()))
    }

    /// Tiers short enough for timeouts to be exercised in tests.
    pub fn quick_tiers() -> WaitTiers {
        WaitTiers {
            short_ms: 30,
            medium_ms: 30,
            long_ms: 30,
        }
    }

    pub fn add(&self, control: ControlDescriptor, element: FakeElement) {
        self.state.lock().upsert(None, control, element);
    }

    pub fn add_in_frame(&self, frame: &str, control: ControlDescriptor, element: FakeElement) {
        let mut state = self.state.lock();
        if !state.frames.iter().any(|known| known == frame) {
            state.frames.push(frame.to_string());
        }
        state.upsert(Some(frame.to_string()), control, element);
    }

    pub fn on(&self, control: ControlDescriptor, interaction: Interaction, reactions: Vec<Reaction>) {
        self.state.lock().triggers.push(Trigger {
            frame: None,
            control,
            interaction,
            reactions,
        });
    }

    pub fn on_in_frame(
        &self,
        frame: &str,
        control: ControlDescriptor,
        interaction: Interaction,
        reactions: Vec<Reaction>,
    ) {
        self.state.lock().triggers.push(Trigger {
            frame: Some(frame.to_string()),
            control,
            interaction,
            reactions,
        });
    }

    /// The next `times` matching interactions fail with `error`.
    pub fn fail(&self, control: ControlDescriptor, interaction: Interaction, times: u32, error: ActionError) {
        self.state.lock().failures.push(Failure {
            control,
            interaction,
            remaining: times,
            error,
        });
    }

    /// Every later call answers `SessionLost`.
    pub fn kill(&self) {
        self.state.lock().dead = true;
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state.lock().url = url.into();
    }

    pub fn value_of(&self, control: &ControlDescriptor) -> Option<String> {
        self.state
            .lock()
            .element(&None, control)
            .map(|element| element.value.clone())
    }

    pub fn value_in_frame(&self, frame: &str, control: &ControlDescriptor) -> Option<String> {
        self.state
            .lock()
            .element(&Some(frame.to_string()), control)
            .map(|element| element.value.clone())
    }

    pub fn current_frame_selector(&self) -> Option<String> {
        self.state.lock().frame.clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// Log entries starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    fn report(started: Instant) -> ActionReport {
        ActionReport::success(Utc::now(), started.elapsed().as_millis() as u64)
    }

    fn key_down(&self, key: Key) {
        let mut state = self.state.lock();
        state.log.push(format!("key {key:?}"));
        if let Some((frame, control)) = state.focused.clone() {
            if frame == state.frame {
                state.fire(&control, Interaction::Key(key));
            }
        }
    }
}

#[async_trait]
impl ActionPrimitives for FakePage {
    async fn navigate(
        &self,
        _ctx: &ExecCtx,
        url: &str,
        _wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        let mut state = self.state.lock();
        state.check()?;
        state.log.push(format!("navigate {url}"));
        state.url = url.to_string();
        Ok(Self::report(started))
    }

    async fn current_url(&self, _ctx: &ExecCtx) -> Result<String, ActionError> {
        let state = self.state.lock();
        state.check()?;
        Ok(state.url.clone())
    }

    async fn wait_for(
        &self,
        _ctx: &ExecCtx,
        condition: &WaitCondition,
        _wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        let state = self.state.lock();
        state.check()?;
        let holds = match condition {
            WaitCondition::Visible(control) => state
                .element(&state.frame, control)
                .map(|element| element.visible)
                .unwrap_or(false),
            WaitCondition::Hidden(control) => !state
                .element(&state.frame, control)
                .map(|element| element.visible)
                .unwrap_or(false),
            WaitCondition::UrlContains(fragment) => state.url.contains(fragment.as_str()),
            WaitCondition::Duration(_) => true,
        };
        if holds {
            Ok(Self::report(started))
        } else {
            Err(ActionError::WaitTimeout(format!("{condition:?}")))
        }
    }

    async fn probe(
        &self,
        _ctx: &ExecCtx,
        control: &ControlDescriptor,
    ) -> Result<ElementProbe, ActionError> {
        let state = self.state.lock();
        state.check()?;
        Ok(match state.element(&state.frame, control) {
            Some(element) => ElementProbe {
                found: true,
                visible: element.visible,
                enabled: element.enabled,
                id: element.id.clone().or_else(|| match control {
                    ControlDescriptor::Id(id) => Some(id.clone()),
                    _ => None,
                }),
                value: Some(element.value.clone()),
                label: element.label.clone(),
                aria_controls: element.aria_controls.clone(),
            },
            None => ElementProbe::missing(),
        })
    }

    async fn scroll_into_view(
        &self,
        _ctx: &ExecCtx,
        control: &ControlDescriptor,
        _wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        let state = self.state.lock();
        state.check()?;
        state.interactable(control, false)?;
        Ok(Self::report(started))
    }

    async fn click(
        &self,
        _ctx: &ExecCtx,
        control: &ControlDescriptor,
        policy: ClickPolicy,
        _wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        let mut state = self.state.lock();
        state.check()?;
        state.interactable(control, policy == ClickPolicy::NativeThenScript)?;
        state.injected(control, Interaction::Click)?;
        let verb = match policy {
            ClickPolicy::NativeThenScript => "click",
            ClickPolicy::ScriptOnly => "script-click",
        };
        state.log.push(format!("{verb} {control}"));
        state.fire(control, Interaction::Click);
        Ok(Self::report(started))
    }

    async fn type_text(
        &self,
        _ctx: &ExecCtx,
        control: &ControlDescriptor,
        text: &str,
        mode: TypeMode,
        _wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        let confirm = {
            let mut state = self.state.lock();
            state.check()?;
            state.interactable(control, true)?;
            state.injected(control, Interaction::Type)?;
            let frame = state.frame.clone();
            state.modify(&frame, control, |element| element.value = text.to_string());
            state.focused = Some((frame, control.clone()));
            state.log.push(format!("type {control} = {text}"));
            state.fire(control, Interaction::Type);
            match mode {
                TypeMode::Bulk { confirm } | TypeMode::Paced { confirm, .. } => confirm,
            }
        };
        if let Some(key) = confirm {
            self.key_down(key);
        }
        Ok(Self::report(started))
    }

    async fn press_key(&self, _ctx: &ExecCtx, key: Key) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        self.state.lock().check()?;
        self.key_down(key);
        Ok(Self::report(started))
    }

    async fn set_value(
        &self,
        _ctx: &ExecCtx,
        control: &ControlDescriptor,
        value: &str,
        _wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        let mut state = self.state.lock();
        state.check()?;
        state.interactable(control, false)?;
        state.injected(control, Interaction::SetValue)?;
        let frame = state.frame.clone();
        state.modify(&frame, control, |element| element.value = value.to_string());
        state.log.push(format!("set {control} = {value}"));
        state.fire(control, Interaction::SetValue);
        Ok(Self::report(started))
    }

    async fn upload_file(
        &self,
        _ctx: &ExecCtx,
        control: &ControlDescriptor,
        path: &Path,
        _wait_tier: WaitTier,
    ) -> Result<ActionReport, ActionError> {
        let started = Instant::now();
        let mut state = self.state.lock();
        state.check()?;
        state.interactable(control, false)?;
        state.injected(control, Interaction::Upload)?;
        state.log.push(format!("upload {control} {}", path.display()));
        state.fire(control, Interaction::Upload);
        Ok(Self::report(started))
    }

    async fn visible_dialogs(&self, _ctx: &ExecCtx) -> Result<Vec<DialogProbe>, ActionError> {
        let state = self.state.lock();
        state.check()?;
        Ok(state.dialogs.clone())
    }

    async fn enter_frame(&self, _ctx: &ExecCtx, frame_selector: &str) -> Result<(), ActionError> {
        let mut state = self.state.lock();
        state.check()?;
        if !state.frames.iter().any(|frame| frame == frame_selector) {
            return Err(ActionError::FrameUnavailable(frame_selector.to_string()));
        }
        state.log.push(format!("enter {frame_selector}"));
        state.frame = Some(frame_selector.to_string());
        Ok(())
    }

    async fn leave_frame(&self, _ctx: &ExecCtx) -> Result<(), ActionError> {
        let mut state = self.state.lock();
        state.frame = None;
        state.log.push("leave".to_string());
        state.check()
    }

    fn current_frame(&self) -> Option<String> {
        self.state.lock().frame.clone()
    }

    async fn ping(&self, _ctx: &ExecCtx) -> Result<(), ActionError> {
        self.state.lock().check()
    }

    async fn settle(&self, _ms: u64) {}
}
