// SPDX-License-Identifier: MIT

//! Chat transport seam.
//!
//! The chat platform is an external collaborator: the bot only ever posts
//! messages, edits them in place, and opens a configuration dialog. Inbound
//! traffic (commands and interactive callbacks) is delivered by the
//! platform glue as [`CallbackEvent`]s with a [`CallbackContext`].

use async_trait::async_trait;

use crate::models::MessageContent;

/// Opaque reference to a previously sent message, good for in-place edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

/// Chat transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("chat transport error: {0}")]
    Send(String),
}

/// Outbound chat operations.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a direct message to a user, returning a reference for later
    /// in-place edits.
    async fn post_message(
        &self,
        user_id: &str,
        content: &MessageContent,
    ) -> Result<MessageRef, TransportError>;

    /// Replace the content of a previously sent message.
    async fn update_message(
        &self,
        message_ref: &MessageRef,
        content: &MessageContent,
    ) -> Result<(), TransportError>;

    /// Open a modal dialog in response to an interaction trigger.
    async fn open_dialog(&self, trigger_id: &str, spec: &DialogSpec)
        -> Result<(), TransportError>;
}

/// Platform-neutral dialog description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpec {
    pub callback_id: String,
    pub title: String,
    pub fields: Vec<DialogField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogField {
    pub id: String,
    pub label: String,
    pub hint: Option<String>,
}

/// Context delivered alongside every inbound interaction.
#[derive(Debug, Clone, Default)]
pub struct CallbackContext {
    pub user_id: String,
    /// Message the interaction originated from, when the platform provides
    /// it; enables in-place re-rendering.
    pub message_ref: Option<MessageRef>,
    /// Short-lived token required to open a dialog.
    pub trigger_id: Option<String>,
}

/// Named interactive-callback events, as decoded by the platform glue.
#[derive(Debug, Clone)]
pub enum CallbackEvent {
    StartTracking,
    ProjectSelect { project_id: u64 },
    TaskSelect { task_id: u64 },
    ConfirmStartTracking,
    TimeEntryStop { entry_id: u64 },
    TimeEntryContinue { project_id: u64, task_id: u64 },
    OpenReminderSetup,
    ReminderSetupSubmit(ReminderSetupInput),
}

/// Raw reminder-dialog submission, validated by the scheduler.
#[derive(Debug, Clone)]
pub struct ReminderSetupInput {
    pub interval_minutes: String,
    pub window_start: String,
    pub window_end: String,
    pub remind_while_tracking: bool,
}

/// Transport used when no real chat platform is wired up: logs outbound
/// traffic and fabricates message references.
pub struct NullTransport;

#[async_trait]
impl ChatTransport for NullTransport {
    async fn post_message(
        &self,
        user_id: &str,
        content: &MessageContent,
    ) -> Result<MessageRef, TransportError> {
        tracing::info!(user_id = %user_id, text = %content.text, "post_message (null transport)");
        Ok(MessageRef(uuid::Uuid::new_v4().to_string()))
    }

    async fn update_message(
        &self,
        message_ref: &MessageRef,
        content: &MessageContent,
    ) -> Result<(), TransportError> {
        tracing::info!(message_ref = %message_ref.0, text = %content.text, "update_message (null transport)");
        Ok(())
    }

    async fn open_dialog(
        &self,
        trigger_id: &str,
        spec: &DialogSpec,
    ) -> Result<(), TransportError> {
        tracing::info!(trigger_id = %trigger_id, title = %spec.title, "open_dialog (null transport)");
        Ok(())
    }
}
