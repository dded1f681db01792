//! Platform-neutral message content.
//!
//! The chat transport maps these blocks onto whatever interactive
//! components its platform offers; the bot never deals in a concrete wire
//! format. Equality is structural, which is what the idempotent-rendering
//! guarantee is checked against.

use serde::{Deserialize, Serialize};

/// A message with a plain-text fallback and interactive blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl MessageContent {
    /// Text-only message.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocks: Vec::new(),
        }
    }
}

/// One interactive or textual block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: String,
    },
    /// Dropdown menu; `selected` echoes the stored selection so a re-render
    /// reproduces the full UI state.
    Select {
        action_id: String,
        placeholder: String,
        options: Vec<SelectOption>,
        selected: Option<String>,
    },
    Actions {
        buttons: Vec<Button>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub action_id: String,
    pub label: String,
    /// Callback payload delivered back with the interaction event
    #[serde(default)]
    pub value: String,
    /// Link buttons open a URL instead of firing a callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Button {
    pub fn action(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            label: label.into(),
            value: String::new(),
            url: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            action_id: String::new(),
            label: label.into(),
            value: String::new(),
            url: Some(url.into()),
        }
    }
}
