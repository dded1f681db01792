// SPDX-License-Identifier: MIT

//! Harvest-Bot: chat-bot integration for Harvest time tracking.
//!
//! Lets a team member authenticate against Harvest via OAuth2, browse
//! assigned projects and tasks, start and stop time entries, and receive
//! periodic reminders to log time, all through interactive chat components.
//! All durable state lives in an external key-value store; there is no
//! in-process session object.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;
pub mod transport;

use std::sync::Arc;

use config::Config;
use services::{HarvestService, OAuthService, ReminderScheduler, TrackingService};
use store::TokenStore;
use transport::ChatTransport;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: TokenStore,
    pub transport: Arc<dyn ChatTransport>,
    pub oauth: OAuthService,
    pub harvest: HarvestService,
    pub tracking: TrackingService,
    pub reminders: ReminderScheduler,
}

impl AppState {
    /// Wire up the full service graph over a store and a chat transport.
    pub fn new(
        config: Config,
        store: TokenStore,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let oauth = OAuthService::new(
            config.identity_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
            store.clone(),
            transport.clone(),
        );
        let harvest = HarvestService::new(config.api_url.clone(), store.clone(), config.time_zone);
        let tracking = TrackingService::new(store.clone(), harvest.clone(), transport.clone());
        let reminders = ReminderScheduler::new(
            store.clone(),
            tracking.clone(),
            oauth.clone(),
            harvest.clone(),
            config.time_zone,
        );

        Self {
            config,
            store,
            transport,
            oauth,
            harvest,
            tracking,
            reminders,
        }
    }
}
