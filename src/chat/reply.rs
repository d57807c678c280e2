//! Outbound message kinds.
//!
//! The transport renders these into the platform's wire format; the core
//! only decides which kind to send and with what content.

use serde::{Deserialize, Serialize};

/// A reply the bot sends back to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text.
    Text { text: String },
    /// A prompt with tappable buttons.
    Buttons { text: String, buttons: Vec<Button> },
    /// A rich card with a title and body lines.
    Card { title: String, lines: Vec<String> },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self::Buttons {
            text: text.into(),
            buttons,
        }
    }

    pub fn card(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self::Card {
            title: title.into(),
            lines,
        }
    }
}

/// One tappable button on a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    /// A button that sends its label back as a text message.
    pub fn option(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            action: ButtonAction::SendText { text: label.clone() },
            label,
        }
    }

    /// A button that opens the platform's date picker.
    pub fn date_picker(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::PickDate,
        }
    }

    /// A button that opens the platform's time picker.
    pub fn time_picker(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::PickTime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ButtonAction {
    SendText { text: String },
    PickDate,
    PickTime,
}
