// SPDX-License-Identifier: MIT

//! Harvest-Bot server
//!
//! Hosts the OAuth redirect endpoint and the per-user reminder timers. The
//! chat platform glue delivers commands and interactive callbacks through
//! `services::commands`; without one attached, outbound traffic goes to the
//! logging transport.

use std::sync::Arc;

use harvest_bot::{
    config::Config,
    store::{MemoryStore, TokenStore},
    transport::NullTransport,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment; missing OAuth credentials abort.
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Harvest-Bot");

    // The key-value store is an external collaborator; the in-memory
    // implementation backs local runs without one attached.
    let store = TokenStore::new(Arc::new(MemoryStore::new()));
    let transport = Arc::new(NullTransport);

    let state = Arc::new(AppState::new(config.clone(), store, transport));

    // One reminder timer per persisted config, one refresh check per
    // persisted credential.
    state
        .reminders
        .rehydrate()
        .await
        .expect("Failed to rehydrate reminder timers");

    let app = harvest_bot::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("harvest_bot=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
