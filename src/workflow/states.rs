use std::fmt;

use serde::Serialize;

/// Stages a row passes through, in order. `Failed` can follow any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RowState {
    Start,
    OpenRecord,
    EditMode,
    FieldPopulation,
    RepeatedEntitySubloop,
    AttachmentUpload,
    Save,
    Success,
    Failed,
}

impl RowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RowState::Success | RowState::Failed)
    }
}

impl fmt::Display for RowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowState::Start => "start",
            RowState::OpenRecord => "open-record",
            RowState::EditMode => "edit-mode",
            RowState::FieldPopulation => "field-population",
            RowState::RepeatedEntitySubloop => "secondary-parties",
            RowState::AttachmentUpload => "attachment-upload",
            RowState::Save => "save",
            RowState::Success => "success",
            RowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[default]
    Pending,
    InProgress,
    Success,
    Failed(String),
}

impl Outcome {
    /// Text written to the status column; only terminal outcomes have one.
    pub fn status_text(&self) -> Option<String> {
        match self {
            Outcome::Success => Some("OK".to_string()),
            Outcome::Failed(reason) => Some(format!("ERRO: {reason}")),
            Outcome::Pending | Outcome::InProgress => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}
