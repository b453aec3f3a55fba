//! Keys delivered through `Input.dispatchKeyEvent`.

use serde::{Deserialize, Serialize};

/// Key press delivered through `Input.dispatchKeyEvent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStroke {
    pub key: String,
    pub code: String,
    pub key_code: i64,
    pub text: Option<String>,
    pub modifiers: i64,
    pub commands: Vec<String>,
}

const MODIFIER_CTRL: i64 = 2;

impl KeyStroke {
    fn named(key: &str, code: &str, key_code: i64, text: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            key_code,
            text: text.map(str::to_string),
            modifiers: 0,
            commands: Vec::new(),
        }
    }

    pub fn enter() -> Self {
        Self::named("Enter", "Enter", 13, Some("\r"))
    }

    pub fn arrow_down() -> Self {
        Self::named("ArrowDown", "ArrowDown", 40, None)
    }

    pub fn tab() -> Self {
        Self::named("Tab", "Tab", 9, None)
    }

    pub fn escape() -> Self {
        Self::named("Escape", "Escape", 27, None)
    }

    pub fn backspace() -> Self {
        Self::named("Backspace", "Backspace", 8, None)
    }

    pub fn delete() -> Self {
        Self::named("Delete", "Delete", 46, None)
    }

    pub fn select_all() -> Self {
        Self {
            key: "a".to_string(),
            code: "KeyA".to_string(),
            key_code: 65,
            text: None,
            modifiers: MODIFIER_CTRL,
            commands: vec!["selectAll".to_string()],
        }
    }

    /// Printable character typed one key at a time.
    pub fn character(ch: char) -> Self {
        let text = ch.to_string();
        let upper = ch.to_ascii_uppercase();
        let (code, key_code) = if ch.is_ascii_alphabetic() {
            (format!("Key{}", upper), upper as i64)
        } else if ch.is_ascii_digit() {
            (format!("Digit{}", ch), ch as i64)
        } else if ch == '/' {
            ("Slash".to_string(), 191)
        } else if ch == ' ' {
            ("Space".to_string(), 32)
        } else {
            (String::new(), 0)
        };
        Self {
            key: text.clone(),
            code,
            key_code,
            text: Some(text),
            modifiers: 0,
            commands: Vec::new(),
        }
    }
}
