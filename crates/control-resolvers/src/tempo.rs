use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed pauses between interactions, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tempo {
    /// Pause between the two attempts of the retry envelope.
    pub retry_cool_down_ms: u64,
    pub post_click_ms: u64,
    /// Delay between keystrokes in paced typing.
    pub paced_char_ms: u64,
    pub panel_open_ms: u64,
    pub filter_settle_ms: u64,
    pub autocomplete_settle_ms: u64,
    pub dialog_poll_ms: u64,
    pub between_rows_ms: u64,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            retry_cool_down_ms: 1_200,
            post_click_ms: 500,
            paced_char_ms: 60,
            panel_open_ms: 250,
            filter_settle_ms: 400,
            autocomplete_settle_ms: 900,
            dialog_poll_ms: 200,
            between_rows_ms: 600,
        }
    }
}

impl Tempo {
    /// No pauses at all.
    pub fn instant() -> Self {
        Self {
            retry_cool_down_ms: 0,
            post_click_ms: 0,
            paced_char_ms: 0,
            panel_open_ms: 0,
            filter_settle_ms: 0,
            autocomplete_settle_ms: 0,
            dialog_poll_ms: 0,
            between_rows_ms: 0,
        }
    }

    pub fn retry_cool_down(&self) -> Duration {
        Duration::from_millis(self.retry_cool_down_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_tempo_never_pauses() {
        let tempo = Tempo::instant();
        assert_eq!(tempo.retry_cool_down(), Duration::ZERO);
        assert_eq!(tempo.paced_char_ms, 0);
    }

    #[test]
    fn default_cool_down_matches_envelope() {
        assert_eq!(Tempo::default().retry_cool_down(), Duration::from_millis(1_200));
    }
}
