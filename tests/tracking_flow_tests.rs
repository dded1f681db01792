// SPDX-License-Identifier: MIT

//! Interactive tracking-workflow tests: the project → task → confirm state
//! machine driven by callback events, plus the status view.

mod common;

use std::sync::atomic::Ordering;

use harvest_bot::models::Block;
use harvest_bot::services::commands::{handle_callback, handle_command};
use harvest_bot::services::tracking::actions;
use harvest_bot::transport::{CallbackContext, CallbackEvent, MessageRef};

use common::{build_state, sample_entry, spawn_stub, StubConfig};

fn ctx(user_id: &str) -> CallbackContext {
    CallbackContext {
        user_id: user_id.to_string(),
        ..CallbackContext::default()
    }
}

fn ctx_on(user_id: &str, message_ref: &str) -> CallbackContext {
    CallbackContext {
        user_id: user_id.to_string(),
        message_ref: Some(MessageRef(message_ref.to_string())),
        trigger_id: None,
    }
}

fn select_blocks(content: &harvest_bot::models::MessageContent) -> Vec<&str> {
    content
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Select { action_id, .. } => Some(action_id.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_full_selection_flow_creates_entry() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    // start_tracking posts the project dropdown.
    handle_callback(&state, &ctx("U1"), CallbackEvent::StartTracking)
        .await
        .unwrap();
    let posted = transport.last_post();
    assert_eq!(select_blocks(&posted), vec![actions::PROJECT_SELECT]);

    // project_select re-renders in place with the task dropdown.
    handle_callback(
        &state,
        &ctx_on("U1", "msg-0"),
        CallbackEvent::ProjectSelect { project_id: 1 },
    )
    .await
    .unwrap();
    let updated = transport.last_update();
    assert_eq!(
        select_blocks(&updated),
        vec![actions::PROJECT_SELECT, actions::TASK_SELECT]
    );

    // task_select adds the confirm button.
    handle_callback(
        &state,
        &ctx_on("U1", "msg-0"),
        CallbackEvent::TaskSelect { task_id: 2 },
    )
    .await
    .unwrap();
    let updated = transport.last_update();
    assert!(updated.blocks.iter().any(|b| matches!(
        b,
        Block::Actions { buttons } if buttons.iter().any(|btn| btn.action_id == actions::CONFIRM_START_TRACKING)
    )));

    // confirm creates the entry and names client/project/task.
    handle_callback(
        &state,
        &ctx_on("U1", "msg-0"),
        CallbackEvent::ConfirmStartTracking,
    )
    .await
    .unwrap();
    assert_eq!(stub.counters.entry_creates.load(Ordering::SeqCst), 1);
    let confirmation = transport.last_update();
    assert!(confirmation.text.contains("Development"));
    assert!(confirmation.text.contains("Website"));
    assert!(confirmation.text.contains("Acme"));

    // The last-entry marker is in place for continue.
    let last = state
        .store
        .last_time_entry("U1")
        .await
        .unwrap()
        .expect("last entry marker");
    assert_eq!(last.project_id, 1);
    assert_eq!(last.task_id, 2);

    // The next start_tracking clears the selection.
    handle_callback(&state, &ctx("U1"), CallbackEvent::StartTracking)
        .await
        .unwrap();
    let selection = state.store.selection("U1").await.unwrap();
    assert_eq!(selection.selected_project, None);
    assert_eq!(selection.selected_task, None);
}

#[tokio::test]
async fn test_task_select_before_project_is_ignored() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    handle_callback(&state, &ctx("U1"), CallbackEvent::TaskSelect { task_id: 2 })
        .await
        .unwrap();

    let selection = state.store.selection("U1").await.unwrap();
    assert_eq!(selection.selected_project, None);
    assert_eq!(selection.selected_task, None);

    // The rendered view has only the project dropdown.
    let posted = transport.last_post();
    assert_eq!(select_blocks(&posted), vec![actions::PROJECT_SELECT]);
}

#[tokio::test]
async fn test_assignments_cache_is_single_use() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, _transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    // start_tracking fetches and caches.
    handle_callback(&state, &ctx("U1"), CallbackEvent::StartTracking)
        .await
        .unwrap();
    assert_eq!(stub.counters.assignment_calls.load(Ordering::SeqCst), 1);

    // project_select serves from the cache and then invalidates it.
    handle_callback(
        &state,
        &ctx_on("U1", "msg-0"),
        CallbackEvent::ProjectSelect { project_id: 1 },
    )
    .await
    .unwrap();
    assert_eq!(stub.counters.assignment_calls.load(Ordering::SeqCst), 1);
    assert!(state.store.assignments_cache("U1").await.unwrap().is_none());

    // The next re-render pays the second fetch (kept source behavior).
    handle_callback(
        &state,
        &ctx_on("U1", "msg-0"),
        CallbackEvent::TaskSelect { task_id: 2 },
    )
    .await
    .unwrap();
    assert_eq!(stub.counters.assignment_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_time_entry_continue_skips_selection() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    handle_callback(
        &state,
        &ctx("U1"),
        CallbackEvent::TimeEntryContinue {
            project_id: 1,
            task_id: 2,
        },
    )
    .await
    .unwrap();

    assert_eq!(stub.counters.entry_creates.load(Ordering::SeqCst), 1);
    assert!(transport.last_post().text.contains("Started tracking"));
}

#[tokio::test]
async fn test_stop_rerenders_status_in_place() {
    let stub = spawn_stub(StubConfig {
        time_entries: serde_json::json!({ "time_entries": [] }),
        ..StubConfig::default()
    })
    .await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    handle_callback(
        &state,
        &ctx_on("U1", "msg-7"),
        CallbackEvent::TimeEntryStop { entry_id: 901 },
    )
    .await
    .unwrap();

    assert_eq!(stub.counters.entry_stops.load(Ordering::SeqCst), 1);
    // Status view replaced the original message.
    let (message_ref, content) = transport.updates.lock().unwrap().last().unwrap().clone();
    assert_eq!(message_ref, "msg-7");
    assert!(content.text.contains("not tracking"));
}

#[tokio::test]
async fn test_status_lists_running_entries_with_stop_buttons() {
    let stub = spawn_stub(StubConfig {
        time_entries: serde_json::json!({
            "time_entries": [sample_entry(11, 2.5, true), sample_entry(12, 1.0, true)],
        }),
        ..StubConfig::default()
    })
    .await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    handle_command(&state, "U1", "status").await.unwrap();

    let content = transport.last_post();
    let sections: Vec<_> = content
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Section { text } => Some(text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(sections.len(), 2);
    assert!(sections[0].starts_with("2.5h"));
    assert!(sections[1].starts_with("1.0h"));

    let stop_values: Vec<_> = content
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Actions { buttons } => Some(buttons),
            _ => None,
        })
        .flatten()
        .filter(|b| b.action_id == actions::TIME_ENTRY_STOP)
        .map(|b| b.value.clone())
        .collect();
    assert_eq!(stop_values, vec!["11", "12"]);
}

#[tokio::test]
async fn test_logout_then_status_prompts_relogin() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    handle_command(&state, "U1", "logout").await.unwrap();
    assert!(state.store.credential("U1").await.unwrap().is_none());

    handle_command(&state, "U1", "status").await.unwrap();
    let texts = transport.posted_texts();
    assert!(
        texts.last().unwrap().contains("not logged in"),
        "expected re-login prompt, got {:?}",
        texts
    );

    handle_command(&state, "U1", "start tracking").await.unwrap();
    assert!(transport.posted_texts().last().unwrap().contains("not logged in"));
}

#[tokio::test]
async fn test_setup_posts_buttons_and_stores_markers() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, transport) = build_state(&stub.base_url);

    handle_command(&state, "U1", "setup").await.unwrap();

    assert_eq!(transport.post_count(), 2);
    let login_marker = state
        .store
        .marker("U1", harvest_bot::store::fields::LOGIN_BUTTON_MESSAGE)
        .await
        .unwrap();
    let setup_marker = state
        .store
        .marker("U1", harvest_bot::store::fields::SETUP_BUTTON_MESSAGE)
        .await
        .unwrap();
    assert_eq!(login_marker, Some("msg-0".to_string()));
    assert_eq!(setup_marker, Some("msg-1".to_string()));

    // The login button carries the authorization URL.
    let login_message = transport.posts.lock().unwrap()[0].1.clone();
    let has_link = login_message.blocks.iter().any(|b| matches!(
        b,
        Block::Actions { buttons } if buttons.iter().any(|btn| {
            btn.url.as_deref().is_some_and(|u| u.contains("oauth2/authorize"))
        })
    ));
    assert!(has_link);
}

#[tokio::test]
async fn test_project_list_names_projects_and_clients() {
    let stub = spawn_stub(StubConfig::default()).await;
    let (state, transport) = build_state(&stub.base_url);
    common::log_in(&state, "U1").await;

    handle_command(&state, "U1", "project list").await.unwrap();

    let text = transport.last_post().text;
    assert!(text.contains("Website (Acme)"));
    assert!(text.contains("Mobile App (Bolt)"));
}
