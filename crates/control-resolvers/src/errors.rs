use action_primitives::ActionError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("panel for {control} did not open: {cause}")]
    PanelMissing { control: String, cause: String },
    #[error("value '{value}' not found in {control}")]
    OptionMissing { control: String, value: String },
    #[error("no suggestion for '{text}' in {control}")]
    NoCandidate { control: String, text: String },
    #[error("selection not reflected in {control}")]
    NotReflected { control: String },
    #[error("no visible dialog with an embedded frame (hint '{hint}')")]
    DialogMissing { hint: String },
    #[error("button '{name}' not found")]
    ButtonMissing { name: String },
    #[error("inside dialog '{dialog}': {source}")]
    InDialog {
        dialog: String,
        #[source]
        source: Box<ResolveError>,
    },
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl ResolveError {
    /// True when the browser session itself stopped answering.
    pub fn is_session_lost(&self) -> bool {
        match self {
            ResolveError::Action(ActionError::SessionLost(_)) => true,
            ResolveError::InDialog { source, .. } => source.is_session_lost(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialog_errors_keep_the_inner_cause() {
        let err = ResolveError::InDialog {
            dialog: "juizBtnNovo_dlg".into(),
            source: Box::new(ResolveError::ButtonMissing {
                name: "Salvar".into(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "inside dialog 'juizBtnNovo_dlg': button 'Salvar' not found"
        );
        assert!(!err.is_session_lost());
    }

    #[test]
    fn session_loss_is_seen_through_dialogs() {
        let err = ResolveError::InDialog {
            dialog: String::new(),
            source: Box::new(ActionError::SessionLost("closed".into()).into()),
        };
        assert!(err.is_session_lost());
    }
}
