// SPDX-License-Identifier: MIT

//! User-scoped key schema over the raw key-value store.
//!
//! Every durable record lives here: pending logins, credentials, the
//! in-progress selection, the assignments cache, reminder configs, and the
//! message-id markers. Keys follow `"<user_id>:<field>"`; pending logins
//! are top-level `"<state_token>"` entries.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::{fields, KvStore, StoreError};
use crate::models::{
    LastTimeEntry, ProjectAssignment, ReminderConfig, Selection, UserCredential,
};

/// Typed store facade shared by all services.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KvStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(user_id: &str, field: &str) -> String {
        format!("{}:{}", user_id, field)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Decode(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StoreError::Decode(format!("{}: {}", key, e)))?;
        self.store.set(key, &raw).await
    }

    // ─── Pending Logins ──────────────────────────────────────────

    /// Bind a fresh state token to the user who started the login.
    pub async fn put_pending_login(
        &self,
        state_token: &str,
        user_id: &str,
    ) -> Result<(), StoreError> {
        self.store.set(state_token, user_id).await
    }

    /// Consume a pending login: look up and delete in one go, so a state
    /// token can never be redeemed twice.
    pub async fn take_pending_login(
        &self,
        state_token: &str,
    ) -> Result<Option<String>, StoreError> {
        let user_id = self.store.get(state_token).await?;
        if user_id.is_some() {
            self.store.delete(state_token).await?;
        }
        Ok(user_id)
    }

    // ─── Credentials ─────────────────────────────────────────────

    pub async fn credential(&self, user_id: &str) -> Result<Option<UserCredential>, StoreError> {
        self.get_json(&Self::key(user_id, fields::AUTH)).await
    }

    pub async fn set_credential(
        &self,
        user_id: &str,
        credential: &UserCredential,
    ) -> Result<(), StoreError> {
        self.set_json(&Self::key(user_id, fields::AUTH), credential)
            .await
    }

    pub async fn set_scope(&self, user_id: &str, scope: &str) -> Result<(), StoreError> {
        self.store.set(&Self::key(user_id, fields::SCOPE), scope).await
    }

    pub async fn scope(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        self.store.get(&Self::key(user_id, fields::SCOPE)).await
    }

    // ─── Interaction Selection ───────────────────────────────────

    pub async fn selection(&self, user_id: &str) -> Result<Selection, StoreError> {
        let project = self
            .store
            .get(&Self::key(user_id, fields::SELECTED_PROJECT))
            .await?;
        let task = self
            .store
            .get(&Self::key(user_id, fields::SELECTED_TASK))
            .await?;
        Ok(Selection {
            selected_project: project.and_then(|v| v.parse().ok()),
            selected_task: task.and_then(|v| v.parse().ok()),
        })
    }

    pub async fn set_selected_project(
        &self,
        user_id: &str,
        project_id: u64,
    ) -> Result<(), StoreError> {
        self.store
            .set(
                &Self::key(user_id, fields::SELECTED_PROJECT),
                &project_id.to_string(),
            )
            .await
    }

    pub async fn set_selected_task(&self, user_id: &str, task_id: u64) -> Result<(), StoreError> {
        self.store
            .set(
                &Self::key(user_id, fields::SELECTED_TASK),
                &task_id.to_string(),
            )
            .await
    }

    pub async fn clear_selected_task(&self, user_id: &str) -> Result<(), StoreError> {
        self.store
            .delete(&Self::key(user_id, fields::SELECTED_TASK))
            .await
    }

    /// Drop both halves of the selection; every tracking flow starts clean.
    pub async fn clear_selection(&self, user_id: &str) -> Result<(), StoreError> {
        self.store
            .delete(&Self::key(user_id, fields::SELECTED_PROJECT))
            .await?;
        self.clear_selected_task(user_id).await
    }

    // ─── Assignments Cache ───────────────────────────────────────

    pub async fn assignments_cache(
        &self,
        user_id: &str,
    ) -> Result<Option<Vec<ProjectAssignment>>, StoreError> {
        self.get_json(&Self::key(user_id, fields::PROJECT_ASSIGNMENTS))
            .await
    }

    pub async fn set_assignments_cache(
        &self,
        user_id: &str,
        assignments: &[ProjectAssignment],
    ) -> Result<(), StoreError> {
        self.set_json(
            &Self::key(user_id, fields::PROJECT_ASSIGNMENTS),
            &assignments,
        )
        .await
    }

    pub async fn invalidate_assignments_cache(&self, user_id: &str) -> Result<(), StoreError> {
        self.store
            .delete(&Self::key(user_id, fields::PROJECT_ASSIGNMENTS))
            .await
    }

    // ─── Reminder Config ─────────────────────────────────────────

    pub async fn reminder_config(
        &self,
        user_id: &str,
    ) -> Result<Option<ReminderConfig>, StoreError> {
        self.get_json(&Self::key(user_id, fields::REMINDER_CONFIG))
            .await
    }

    pub async fn set_reminder_config(
        &self,
        user_id: &str,
        config: &ReminderConfig,
    ) -> Result<(), StoreError> {
        self.set_json(&Self::key(user_id, fields::REMINDER_CONFIG), config)
            .await
    }

    // ─── Markers ─────────────────────────────────────────────────

    pub async fn last_time_entry(
        &self,
        user_id: &str,
    ) -> Result<Option<LastTimeEntry>, StoreError> {
        self.get_json(&Self::key(user_id, fields::LAST_TIME_ENTRY))
            .await
    }

    pub async fn set_last_time_entry(
        &self,
        user_id: &str,
        entry: &LastTimeEntry,
    ) -> Result<(), StoreError> {
        self.set_json(&Self::key(user_id, fields::LAST_TIME_ENTRY), entry)
            .await
    }

    /// Message-id marker for in-place edits (`field` is one of the
    /// `*_MESSAGE` constants).
    pub async fn marker(&self, user_id: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.store.get(&Self::key(user_id, field)).await
    }

    pub async fn set_marker(
        &self,
        user_id: &str,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.store.set(&Self::key(user_id, field), value).await
    }

    pub async fn delete_marker(&self, user_id: &str, field: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::key(user_id, field)).await
    }

    // ─── Bulk Operations ─────────────────────────────────────────

    /// Delete every key carrying the user's prefix. Pending logins are
    /// keyed by state token and survive; they die when consumed.
    pub async fn reset_user(&self, user_id: &str) -> Result<(), StoreError> {
        let prefix = format!("{}:", user_id);
        for key in self.store.scan(&prefix).await? {
            self.store.delete(&key).await?;
        }
        Ok(())
    }

    /// All user ids that have `field` persisted. Used to rehydrate timers
    /// and refresh checks on process start.
    pub async fn users_with(&self, field: &str) -> Result<Vec<String>, StoreError> {
        let suffix = format!(":{}", field);
        Ok(self
            .store
            .scan("")
            .await?
            .into_iter()
            .filter_map(|key| key.strip_suffix(&suffix).map(|u| u.to_string()))
            .collect())
    }
}
