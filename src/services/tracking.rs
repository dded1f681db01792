// SPDX-License-Identifier: MIT

//! Interactive time-tracking workflow.
//!
//! A per-user state machine driven entirely by stateless callback events:
//! `Idle → ProjectSelectionPending → TaskSelectionPending → ConfirmPending
//! → (TimeEntryCreated | Idle)`. No server-side session object exists; the
//! current state is whatever the token store says, and every transition
//! recomputes the complete block list from it. Re-rendering is therefore
//! idempotent and tolerates duplicate or out-of-order callback delivery.

use std::sync::Arc;

use crate::error::{ApiError, AuthError, Result};
use crate::models::{LastTimeEntry, MessageContent, Selection, TimeEntry};
use crate::services::HarvestService;
use crate::store::TokenStore;
use crate::transport::{CallbackContext, ChatTransport};

/// Callback action ids, shared with the platform glue.
pub mod actions {
    pub const LOGIN: &str = "login";
    pub const START_TRACKING: &str = "start_tracking";
    pub const PROJECT_SELECT: &str = "project_select";
    pub const TASK_SELECT: &str = "task_select";
    pub const CONFIRM_START_TRACKING: &str = "confirm_start_tracking";
    pub const TIME_ENTRY_STOP: &str = "time_entry_stop";
    pub const TIME_ENTRY_CONTINUE: &str = "time_entry_continue";
    pub const OPEN_REMINDER_SETUP: &str = "open_reminder_setup";
}

/// Running entries shown in the status view.
const STATUS_MAX_ENTRIES: usize = 5;

/// Tracking workflow handler.
#[derive(Clone)]
pub struct TrackingService {
    store: TokenStore,
    harvest: HarvestService,
    transport: Arc<dyn ChatTransport>,
}

impl TrackingService {
    pub fn new(
        store: TokenStore,
        harvest: HarvestService,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            store,
            harvest,
            transport,
        }
    }

    // ─── Workflow Transitions ────────────────────────────────────────────

    /// `start_tracking`: clear the previous selection and show the project
    /// dropdown (fresh assignments fetch, refreshing the cache).
    pub async fn start_tracking(&self, ctx: &CallbackContext) -> Result<()> {
        self.store.clear_selection(&ctx.user_id).await?;

        if let Err(e) = self.harvest.list_project_assignments(&ctx.user_id).await {
            return self.report_api_error(&ctx.user_id, e).await;
        }
        self.render_selection(ctx).await
    }

    /// `project_select`: remember the project, drop any stale task choice,
    /// and re-render with the task dropdown.
    pub async fn project_select(&self, ctx: &CallbackContext, project_id: u64) -> Result<()> {
        self.store
            .set_selected_project(&ctx.user_id, project_id)
            .await?;
        self.store.clear_selected_task(&ctx.user_id).await?;
        self.render_selection(ctx).await
    }

    /// `task_select`: remember the task and re-render with the confirm
    /// button. Ignored while no project is selected, so an out-of-order
    /// callback cannot advance the flow.
    pub async fn task_select(&self, ctx: &CallbackContext, task_id: u64) -> Result<()> {
        let selection = self.store.selection(&ctx.user_id).await?;
        if selection.selected_project.is_some() {
            self.store.set_selected_task(&ctx.user_id, task_id).await?;
        } else {
            tracing::debug!(user_id = %ctx.user_id, task_id, "Task selected without a project, ignoring");
        }
        self.render_selection(ctx).await
    }

    /// `confirm_start_tracking`: create the time entry from the stored
    /// selection and announce it.
    pub async fn confirm_start_tracking(&self, ctx: &CallbackContext) -> Result<()> {
        let selection = self.store.selection(&ctx.user_id).await?;
        let (project_id, task_id) = match (selection.selected_project, selection.selected_task) {
            (Some(p), Some(t)) => (p, t),
            _ => {
                return self
                    .deliver(
                        ctx,
                        &MessageContent::plain("Pick a project and a task first."),
                    )
                    .await;
            }
        };

        match self
            .harvest
            .create_time_entry(&ctx.user_id, project_id, task_id)
            .await
        {
            Ok(entry) => self.deliver(ctx, &render::entry_started(&entry)).await,
            Err(e) => self.report_api_error(&ctx.user_id, e).await,
        }
    }

    /// `time_entry_stop`: stop the entry, then re-render the status view in
    /// place of the message the button lived on.
    pub async fn time_entry_stop(&self, ctx: &CallbackContext, entry_id: u64) -> Result<()> {
        if let Err(e) = self.harvest.stop_time_entry(&ctx.user_id, entry_id).await {
            return self.report_api_error(&ctx.user_id, e).await;
        }
        self.render_status(ctx).await
    }

    /// `time_entry_continue`: restart a previously used project/task pair
    /// without going through selection.
    pub async fn time_entry_continue(
        &self,
        ctx: &CallbackContext,
        project_id: u64,
        task_id: u64,
    ) -> Result<()> {
        match self
            .harvest
            .create_time_entry(&ctx.user_id, project_id, task_id)
            .await
        {
            Ok(entry) => self.deliver(ctx, &render::entry_started(&entry)).await,
            Err(e) => self.report_api_error(&ctx.user_id, e).await,
        }
    }

    // ─── Status View ─────────────────────────────────────────────────────

    /// Render the tracking status, in place when the callback carries a
    /// message reference. Used by the `status` command, the stop handler,
    /// and every reminder tick.
    pub async fn render_status(&self, ctx: &CallbackContext) -> Result<()> {
        let content = match self.status_content(&ctx.user_id).await {
            Ok(content) => content,
            Err(e) => return self.report_api_error(&ctx.user_id, e).await,
        };
        self.deliver(ctx, &content).await
    }

    /// Post the status view as a fresh message (reminder ticks).
    pub async fn post_status(&self, user_id: &str) -> Result<()> {
        let ctx = CallbackContext {
            user_id: user_id.to_string(),
            ..CallbackContext::default()
        };
        self.render_status(&ctx).await
    }

    async fn status_content(&self, user_id: &str) -> std::result::Result<MessageContent, ApiError> {
        let entries = self
            .harvest
            .list_time_entries(user_id, true, STATUS_MAX_ENTRIES as u32)
            .await?;
        let last = self.store.last_time_entry(user_id).await?;
        Ok(render::status_view(&entries, last.as_ref()))
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    /// Full selection view recomputed from persisted state.
    async fn render_selection(&self, ctx: &CallbackContext) -> Result<()> {
        let content = match self.selection_content(&ctx.user_id).await {
            Ok(content) => content,
            Err(e) => return self.report_api_error(&ctx.user_id, e).await,
        };
        self.deliver(ctx, &content).await
    }

    async fn selection_content(
        &self,
        user_id: &str,
    ) -> std::result::Result<MessageContent, ApiError> {
        let assignments = self.harvest.cached_assignments(user_id).await?;
        let selection = self.store.selection(user_id).await?;

        // The task-assignment read consumes the assignments cache, so the
        // next re-render pays a remote fetch. Deliberately kept that way.
        let tasks = match selection.selected_project {
            Some(project_id) => {
                self.harvest
                    .list_task_assignments(user_id, project_id)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(render::selection_view(&assignments, &selection, &tasks))
    }

    /// Update in place when the interaction carries a message reference,
    /// otherwise post a new message.
    async fn deliver(&self, ctx: &CallbackContext, content: &MessageContent) -> Result<()> {
        match &ctx.message_ref {
            Some(message_ref) => self.transport.update_message(message_ref, content).await?,
            None => {
                self.transport.post_message(&ctx.user_id, content).await?;
            }
        }
        Ok(())
    }

    /// Convert an API failure into a single user-visible message; remote
    /// errors never escalate past this boundary.
    async fn report_api_error(&self, user_id: &str, error: ApiError) -> Result<()> {
        let text = match &error {
            ApiError::Auth(AuthError::NotAuthenticated) => {
                "You are not logged in to Harvest. Run `setup` to log in."
            }
            _ => {
                tracing::warn!(user_id = %user_id, error = %error, "Harvest call failed");
                "Couldn't fetch information from Harvest, please try again later."
            }
        };
        self.transport
            .post_message(user_id, &MessageContent::plain(text))
            .await?;
        Ok(())
    }
}

/// Pure view construction. Everything here is a function of persisted
/// state, which is what makes re-rendering idempotent.
pub mod render {
    use super::*;
    use crate::models::{Block, Button, ProjectAssignment, SelectOption, TaskAssignment};

    /// Project/task selection view for the current workflow state.
    pub fn selection_view(
        assignments: &[ProjectAssignment],
        selection: &Selection,
        tasks: &[TaskAssignment],
    ) -> MessageContent {
        let mut blocks = vec![
            Block::Section {
                text: "What are you working on?".to_string(),
            },
            Block::Select {
                action_id: actions::PROJECT_SELECT.to_string(),
                placeholder: "Select a project".to_string(),
                options: assignments
                    .iter()
                    .map(|a| SelectOption {
                        label: format!("{} ({})", a.project.name, a.client.name),
                        value: a.project.id.to_string(),
                    })
                    .collect(),
                selected: selection.selected_project.map(|id| id.to_string()),
            },
        ];

        if selection.selected_project.is_some() {
            blocks.push(Block::Select {
                action_id: actions::TASK_SELECT.to_string(),
                placeholder: "Select a task".to_string(),
                options: tasks
                    .iter()
                    .map(|t| SelectOption {
                        label: t.task.name.clone(),
                        value: t.task.id.to_string(),
                    })
                    .collect(),
                selected: selection.selected_task.map(|id| id.to_string()),
            });
        }

        if selection.selected_project.is_some() && selection.selected_task.is_some() {
            blocks.push(Block::Actions {
                buttons: vec![Button::action(
                    actions::CONFIRM_START_TRACKING,
                    "Start tracking",
                )],
            });
        }

        MessageContent {
            text: "What are you working on?".to_string(),
            blocks,
        }
    }

    /// Confirmation naming client, project and task.
    pub fn entry_started(entry: &TimeEntry) -> MessageContent {
        MessageContent::plain(format!(
            "Started tracking *{}* on *{}* ({}).",
            entry.task.name, entry.project.name, entry.client.name
        ))
    }

    /// Tracking status: running entries in provider order (capped), each
    /// with a stop button; otherwise a start prompt and, when known, a
    /// continue button for the previous project/task pair.
    pub fn status_view(entries: &[TimeEntry], last: Option<&LastTimeEntry>) -> MessageContent {
        if entries.is_empty() {
            let mut buttons = vec![Button::action(actions::START_TRACKING, "Start tracking")];
            if let Some(last) = last {
                buttons.push(
                    Button::action(
                        actions::TIME_ENTRY_CONTINUE,
                        format!("Continue: {} / {}", last.project_name, last.task_name),
                    )
                    .with_value(format!("{}:{}", last.project_id, last.task_id)),
                );
            }

            return MessageContent {
                text: "You are not tracking time right now.".to_string(),
                blocks: vec![
                    Block::Section {
                        text: "You are not tracking time right now.".to_string(),
                    },
                    Block::Actions { buttons },
                ],
            };
        }

        let mut blocks = Vec::new();
        for entry in entries.iter().take(STATUS_MAX_ENTRIES) {
            blocks.push(Block::Section {
                text: format!(
                    "{:.1}h — *{}* ({}) / {}",
                    entry.hours, entry.project.name, entry.client.name, entry.task.name
                ),
            });
            blocks.push(Block::Actions {
                buttons: vec![Button::action(actions::TIME_ENTRY_STOP, "Stop")
                    .with_value(entry.id.to_string())],
            });
        }

        MessageContent {
            text: "You are currently tracking time.".to_string(),
            blocks,
        }
    }
}
