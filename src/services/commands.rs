// SPDX-License-Identifier: MIT

//! Inbound command and callback dispatch.
//!
//! The platform glue strips its own trigger prefix and hands over the bare
//! command text or a decoded [`CallbackEvent`]; everything here is
//! transport-agnostic.

use chrono::NaiveTime;

use crate::error::{ApiError, AppError, AuthError, Result, ValidationError};
use crate::models::{Block, Button, MessageContent};
use crate::services::tracking::actions;
use crate::store::fields;
use crate::transport::{CallbackContext, CallbackEvent, DialogField, DialogSpec, ReminderSetupInput};
use crate::AppState;

/// Dialog callback id for the reminder setup modal.
pub const REMINDER_SETUP_CALLBACK: &str = "reminder_setup";

/// Handle a text command from the chat transport.
pub async fn handle_command(state: &AppState, user_id: &str, text: &str) -> Result<()> {
    // Tolerate the platform trigger word being left on.
    let command = text.trim().strip_prefix("harvest ").unwrap_or(text.trim());

    let ctx = CallbackContext {
        user_id: user_id.to_string(),
        ..CallbackContext::default()
    };

    match command {
        "setup" => setup(state, user_id).await,
        "logout" => {
            state.reminders.cancel_user(user_id);
            state.oauth.logout(user_id).await?;
            Ok(())
        }
        "project list" => project_list(state, user_id).await,
        "start tracking" => state.tracking.start_tracking(&ctx).await,
        "status" => state.tracking.render_status(&ctx).await,
        other => {
            tracing::debug!(user_id = %user_id, command = %other, "Unknown command");
            post(
                state,
                user_id,
                "Commands: `setup`, `logout`, `project list`, `start tracking`, `status`.",
            )
            .await
        }
    }
}

/// Handle a decoded interactive-callback event.
pub async fn handle_callback(
    state: &AppState,
    ctx: &CallbackContext,
    event: CallbackEvent,
) -> Result<()> {
    match event {
        CallbackEvent::StartTracking => state.tracking.start_tracking(ctx).await,
        CallbackEvent::ProjectSelect { project_id } => {
            state.tracking.project_select(ctx, project_id).await
        }
        CallbackEvent::TaskSelect { task_id } => state.tracking.task_select(ctx, task_id).await,
        CallbackEvent::ConfirmStartTracking => state.tracking.confirm_start_tracking(ctx).await,
        CallbackEvent::TimeEntryStop { entry_id } => {
            state.tracking.time_entry_stop(ctx, entry_id).await
        }
        CallbackEvent::TimeEntryContinue {
            project_id,
            task_id,
        } => {
            state
                .tracking
                .time_entry_continue(ctx, project_id, task_id)
                .await
        }
        CallbackEvent::OpenReminderSetup => open_reminder_setup(state, ctx).await,
        CallbackEvent::ReminderSetupSubmit(input) => {
            reminder_setup_submit(state, &ctx.user_id, input).await
        }
    }
}

// ─── Setup ───────────────────────────────────────────────────────────────

/// `setup`: post the login button and the reminder-configuration button,
/// keeping their message ids so they can be edited in place later.
async fn setup(state: &AppState, user_id: &str) -> Result<()> {
    let login_url = state.oauth.begin_login(user_id).await?;

    let login_message = MessageContent {
        text: "Connect your Harvest account.".to_string(),
        blocks: vec![
            Block::Section {
                text: "Connect your Harvest account.".to_string(),
            },
            Block::Actions {
                buttons: vec![Button::link("Log in to Harvest", login_url)],
            },
        ],
    };
    let login_ref = state.transport.post_message(user_id, &login_message).await?;
    state
        .store
        .set_marker(user_id, fields::LOGIN_BUTTON_MESSAGE, &login_ref.0)
        .await?;

    let setup_message = MessageContent {
        text: "Set up time-tracking reminders.".to_string(),
        blocks: vec![
            Block::Section {
                text: "Set up time-tracking reminders.".to_string(),
            },
            Block::Actions {
                buttons: vec![Button::action(
                    actions::OPEN_REMINDER_SETUP,
                    "Configure reminders",
                )],
            },
        ],
    };
    let setup_ref = state.transport.post_message(user_id, &setup_message).await?;
    state
        .store
        .set_marker(user_id, fields::SETUP_BUTTON_MESSAGE, &setup_ref.0)
        .await?;

    Ok(())
}

// ─── Project List ────────────────────────────────────────────────────────

async fn project_list(state: &AppState, user_id: &str) -> Result<()> {
    let assignments = match state.harvest.list_project_assignments(user_id).await {
        Ok(assignments) => assignments,
        Err(ApiError::Auth(AuthError::NotAuthenticated)) => {
            return post(
                state,
                user_id,
                "You are not logged in to Harvest. Run `setup` to log in.",
            )
            .await;
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Project list fetch failed");
            return post(
                state,
                user_id,
                "Couldn't fetch information from Harvest, please try again later.",
            )
            .await;
        }
    };

    if assignments.is_empty() {
        return post(state, user_id, "You have no project assignments.").await;
    }

    let mut lines = vec!["Your projects:".to_string()];
    for assignment in &assignments {
        lines.push(format!(
            "• {} ({})",
            assignment.project.name, assignment.client.name
        ));
    }
    post(state, user_id, &lines.join("\n")).await
}

// ─── Reminder Setup Dialog ───────────────────────────────────────────────

async fn open_reminder_setup(state: &AppState, ctx: &CallbackContext) -> Result<()> {
    let Some(trigger_id) = &ctx.trigger_id else {
        tracing::warn!(user_id = %ctx.user_id, "Reminder setup without a trigger id");
        return Ok(());
    };
    state
        .transport
        .open_dialog(trigger_id, &reminder_dialog_spec())
        .await?;
    Ok(())
}

fn reminder_dialog_spec() -> DialogSpec {
    DialogSpec {
        callback_id: REMINDER_SETUP_CALLBACK.to_string(),
        title: "Time-tracking reminders".to_string(),
        fields: vec![
            DialogField {
                id: "interval_minutes".to_string(),
                label: "Remind every (minutes)".to_string(),
                hint: Some("0 disables reminders; minimum 5".to_string()),
            },
            DialogField {
                id: "window_start".to_string(),
                label: "From (HH:MM)".to_string(),
                hint: None,
            },
            DialogField {
                id: "window_end".to_string(),
                label: "Until (HH:MM)".to_string(),
                hint: None,
            },
            DialogField {
                id: "remind_while_tracking".to_string(),
                label: "Remind even while tracking".to_string(),
                hint: None,
            },
        ],
    }
}

async fn reminder_setup_submit(
    state: &AppState,
    user_id: &str,
    input: ReminderSetupInput,
) -> Result<()> {
    let (interval, start, end) = match parse_setup_input(&input) {
        Ok(parsed) => parsed,
        Err(e) => return post(state, user_id, &format!("Invalid reminder setup: {}", e)).await,
    };

    match state
        .reminders
        .configure(user_id, interval, start, end, input.remind_while_tracking)
        .await
    {
        Ok(()) => post(state, user_id, "Reminders configured. :alarm_clock:").await,
        Err(AppError::Validation(e)) => {
            post(state, user_id, &format!("Invalid reminder setup: {}", e)).await
        }
        Err(e) => Err(e),
    }
}

/// Parse the raw dialog values; any failure rejects the whole submission.
fn parse_setup_input(
    input: &ReminderSetupInput,
) -> std::result::Result<(u64, NaiveTime, NaiveTime), ValidationError> {
    let interval = input
        .interval_minutes
        .trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::BadNumber(input.interval_minutes.clone()))?;
    let start = parse_time(&input.window_start)?;
    let end = parse_time(&input.window_end)?;
    Ok((interval, start, end))
}

fn parse_time(raw: &str) -> std::result::Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ValidationError::BadTime(raw.to_string()))
}

async fn post(state: &AppState, user_id: &str, text: &str) -> Result<()> {
    state
        .transport
        .post_message(user_id, &MessageContent::plain(text))
        .await?;
    Ok(())
}
