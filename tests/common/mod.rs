// SPDX-License-Identifier: MIT

//! Shared test fixtures: a stub Harvest server (identity + API on one
//! listener) and a chat transport that records outbound traffic.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;

use harvest_bot::{
    config::Config,
    models::{MessageContent, UserCredential},
    store::{MemoryStore, TokenStore},
    transport::{ChatTransport, DialogSpec, MessageRef, TransportError},
    AppState,
};

// ─── Stub Harvest Server ─────────────────────────────────────────────────

/// Canned responses served by the stub.
#[derive(Clone)]
pub struct StubConfig {
    pub token_response: serde_json::Value,
    pub assignments: serde_json::Value,
    pub time_entries: serde_json::Value,
    pub created_entry: serde_json::Value,
    pub stopped_entry: serde_json::Value,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            token_response: serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 1_209_600,
            }),
            assignments: sample_assignments(),
            time_entries: serde_json::json!({ "time_entries": [] }),
            created_entry: sample_entry(901, 0.0, true),
            stopped_entry: sample_entry(901, 2.5, false),
        }
    }
}

#[derive(Default)]
pub struct Counters {
    pub token_calls: AtomicUsize,
    pub assignment_calls: AtomicUsize,
    pub entry_creates: AtomicUsize,
    pub entry_stops: AtomicUsize,
}

pub struct StubHarvest {
    pub base_url: String,
    pub counters: Arc<Counters>,
}

type StubState = Arc<(StubConfig, Arc<Counters>)>;

/// Spin the stub on an ephemeral local port.
pub async fn spawn_stub(config: StubConfig) -> StubHarvest {
    let counters = Arc::new(Counters::default());
    let state: StubState = Arc::new((config, counters.clone()));

    let app = Router::new()
        .route("/api/v2/oauth2/token", post(token_endpoint))
        .route("/v2/users/me/project_assignments", get(assignments_endpoint))
        .route(
            "/v2/time_entries",
            get(list_entries_endpoint).post(create_entry_endpoint),
        )
        .route("/v2/time_entries/{id}/stop", patch(stop_entry_endpoint))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    StubHarvest {
        base_url: format!("http://{}", addr),
        counters,
    }
}

async fn token_endpoint(State(state): State<StubState>) -> Json<serde_json::Value> {
    state.1.token_calls.fetch_add(1, Ordering::SeqCst);
    Json(state.0.token_response.clone())
}

async fn assignments_endpoint(State(state): State<StubState>) -> Json<serde_json::Value> {
    state.1.assignment_calls.fetch_add(1, Ordering::SeqCst);
    Json(state.0.assignments.clone())
}

async fn list_entries_endpoint(State(state): State<StubState>) -> Json<serde_json::Value> {
    Json(state.0.time_entries.clone())
}

async fn create_entry_endpoint(State(state): State<StubState>) -> Json<serde_json::Value> {
    state.1.entry_creates.fetch_add(1, Ordering::SeqCst);
    Json(state.0.created_entry.clone())
}

async fn stop_entry_endpoint(
    State(state): State<StubState>,
    Path(_id): Path<u64>,
) -> Json<serde_json::Value> {
    state.1.entry_stops.fetch_add(1, Ordering::SeqCst);
    Json(state.0.stopped_entry.clone())
}

// ─── Sample Payloads ─────────────────────────────────────────────────────

pub fn sample_assignments() -> serde_json::Value {
    serde_json::json!({
        "project_assignments": [
            {
                "id": 10,
                "project": { "id": 1, "name": "Website" },
                "client": { "id": 100, "name": "Acme" },
                "task_assignments": [
                    { "task": { "id": 2, "name": "Development" } },
                    { "task": { "id": 3, "name": "Design" } },
                ],
            },
            {
                "id": 20,
                "project": { "id": 4, "name": "Mobile App" },
                "client": { "id": 200, "name": "Bolt" },
                "task_assignments": [
                    { "task": { "id": 5, "name": "Development" } },
                ],
            },
        ],
    })
}

pub fn sample_entry(id: u64, hours: f64, running: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "hours": hours,
        "is_running": running,
        "spent_date": "2024-06-03",
        "project": { "id": 1, "name": "Website" },
        "task": { "id": 2, "name": "Development" },
        "client": { "id": 100, "name": "Acme" },
    })
}

// ─── Recording Transport ─────────────────────────────────────────────────

/// Chat transport that records everything sent through it.
#[derive(Default)]
pub struct RecordingTransport {
    pub posts: Mutex<Vec<(String, MessageContent)>>,
    pub updates: Mutex<Vec<(String, MessageContent)>>,
    pub dialogs: Mutex<Vec<(String, DialogSpec)>>,
    counter: AtomicUsize,
}

impl RecordingTransport {
    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn last_post(&self) -> MessageContent {
        self.posts.lock().unwrap().last().expect("no posts").1.clone()
    }

    pub fn last_update(&self) -> MessageContent {
        self.updates
            .lock()
            .unwrap()
            .last()
            .expect("no updates")
            .1
            .clone()
    }

    pub fn posted_texts(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, content)| content.text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn post_message(
        &self,
        user_id: &str,
        content: &MessageContent,
    ) -> Result<MessageRef, TransportError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.posts
            .lock()
            .unwrap()
            .push((user_id.to_string(), content.clone()));
        Ok(MessageRef(format!("msg-{}", n)))
    }

    async fn update_message(
        &self,
        message_ref: &MessageRef,
        content: &MessageContent,
    ) -> Result<(), TransportError> {
        self.updates
            .lock()
            .unwrap()
            .push((message_ref.0.clone(), content.clone()));
        Ok(())
    }

    async fn open_dialog(
        &self,
        trigger_id: &str,
        spec: &DialogSpec,
    ) -> Result<(), TransportError> {
        self.dialogs
            .lock()
            .unwrap()
            .push((trigger_id.to_string(), spec.clone()));
        Ok(())
    }
}

// ─── App Assembly ────────────────────────────────────────────────────────

/// Build an `AppState` wired to the stub server and a recording transport.
pub fn build_state(base_url: &str) -> (Arc<AppState>, Arc<RecordingTransport>) {
    let config = Config {
        identity_url: base_url.to_string(),
        api_url: base_url.to_string(),
        ..Config::default()
    };
    let store = TokenStore::new(Arc::new(MemoryStore::new()));
    let transport = Arc::new(RecordingTransport::default());
    let state = Arc::new(AppState::new(config, store, transport.clone()));
    (state, transport)
}

/// Insert a valid credential directly, skipping the OAuth dance.
pub async fn log_in(state: &AppState, user_id: &str) {
    let credential = UserCredential {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_in: 1_209_600,
        scope: Some("harvest:1062659".to_string()),
        logged_in_at: Utc::now(),
    };
    state
        .store
        .set_credential(user_id, &credential)
        .await
        .expect("store credential");
}
