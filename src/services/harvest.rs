// SPDX-License-Identifier: MIT

//! Harvest API client.
//!
//! Handles:
//! - Project/task assignment listing (with the single-use cache)
//! - Time entry creation, stopping, and listing
//! - Bearer-token and account-id headers derived from the stored credential

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, AuthError};
use crate::models::{
    harvest::{ProjectAssignmentsPage, TimeEntriesPage},
    LastTimeEntry, ProjectAssignment, TaskAssignment, TimeEntry,
};
use crate::store::TokenStore;
use crate::time_utils;

/// Account-id header required by every Harvest API call.
const ACCOUNT_ID_HEADER: &str = "Harvest-Account-Id";

/// Authenticated Harvest API client with per-user credentials from the
/// token store.
#[derive(Clone)]
pub struct HarvestService {
    http: reqwest::Client,
    base_url: String,
    store: TokenStore,
    time_zone: Tz,
}

impl HarvestService {
    pub fn new(base_url: String, store: TokenStore, time_zone: Tz) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            store,
            time_zone,
        }
    }

    // ─── Request Plumbing ────────────────────────────────────────────────

    /// Bearer token and account id for a user, or `NotAuthenticated`.
    async fn auth_headers(&self, user_id: &str) -> Result<(String, String), ApiError> {
        let credential = self
            .store
            .credential(user_id)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        // The scope field is stored before the token exchange completes, so
        // prefer the credential's own copy and fall back to the standalone key.
        let account_id = match credential.account_id() {
            Some(id) => id.to_string(),
            None => self
                .store
                .scope(user_id)
                .await?
                .and_then(|s| s.strip_prefix("harvest:").map(|id| id.to_string()))
                .ok_or(AuthError::NotAuthenticated)?,
        };

        Ok((credential.access_token, account_id))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        user_id: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let (token, account_id) = self.auth_headers(user_id).await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header(ACCOUNT_ID_HEADER, account_id)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        user_id: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let (token, account_id) = self.auth_headers(user_id).await?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header(ACCOUNT_ID_HEADER, account_id)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        Self::decode(response).await
    }

    async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        user_id: &str,
    ) -> Result<T, ApiError> {
        let (token, account_id) = self.auth_headers(user_id).await?;
        let response = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header(ACCOUNT_ID_HEADER, account_id)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        Self::decode(response).await
    }

    /// Check response status and parse the JSON body.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::RequestFailed(format!("JSON parse error: {}", e)))
    }

    // ─── Domain Operations ───────────────────────────────────────────────

    /// Fetch the user's project assignments and refresh the cache.
    pub async fn list_project_assignments(
        &self,
        user_id: &str,
    ) -> Result<Vec<ProjectAssignment>, ApiError> {
        let page: ProjectAssignmentsPage = self
            .get_json("/v2/users/me/project_assignments", user_id, &[])
            .await?;

        self.store
            .set_assignments_cache(user_id, &page.project_assignments)
            .await?;

        Ok(page.project_assignments)
    }

    /// Cached assignments, fetching on a miss. Does not consume the cache.
    pub async fn cached_assignments(
        &self,
        user_id: &str,
    ) -> Result<Vec<ProjectAssignment>, ApiError> {
        match self.store.assignments_cache(user_id).await? {
            Some(assignments) => Ok(assignments),
            None => self.list_project_assignments(user_id).await,
        }
    }

    /// Tasks available on one project.
    ///
    /// Reads the assignments cache (fetch-on-miss) and then deletes it:
    /// single-use semantics carried over from the source design. Reading
    /// task lists for two projects back to back therefore costs a second
    /// remote fetch.
    pub async fn list_task_assignments(
        &self,
        user_id: &str,
        project_id: u64,
    ) -> Result<Vec<TaskAssignment>, ApiError> {
        let assignments = self.cached_assignments(user_id).await?;
        self.store.invalidate_assignments_cache(user_id).await?;

        Ok(assignments
            .into_iter()
            .find(|a| a.project.id == project_id)
            .map(|a| a.task_assignments)
            .unwrap_or_default())
    }

    /// Start a running time entry for a project/task pair, stamped with
    /// today's date in the configured zone.
    pub async fn create_time_entry(
        &self,
        user_id: &str,
        project_id: u64,
        task_id: u64,
    ) -> Result<TimeEntry, ApiError> {
        let spent_date = time_utils::today_in(self.time_zone);
        let entry = self
            .create_time_entry_on(user_id, project_id, task_id, spent_date)
            .await?;

        self.store
            .set_last_time_entry(user_id, &LastTimeEntry::from(&entry))
            .await?;

        Ok(entry)
    }

    async fn create_time_entry_on(
        &self,
        user_id: &str,
        project_id: u64,
        task_id: u64,
        spent_date: NaiveDate,
    ) -> Result<TimeEntry, ApiError> {
        let body = serde_json::json!({
            "project_id": project_id,
            "task_id": task_id,
            "spent_date": spent_date.format("%Y-%m-%d").to_string(),
        });

        self.post_json("/v2/time_entries", user_id, &body).await
    }

    /// Stop a running time entry.
    pub async fn stop_time_entry(
        &self,
        user_id: &str,
        entry_id: u64,
    ) -> Result<TimeEntry, ApiError> {
        self.patch_json(&format!("/v2/time_entries/{}/stop", entry_id), user_id)
            .await
    }

    /// List time entries in provider order.
    pub async fn list_time_entries(
        &self,
        user_id: &str,
        running_only: bool,
        page_size: u32,
    ) -> Result<Vec<TimeEntry>, ApiError> {
        let mut query = vec![("per_page", page_size.to_string())];
        if running_only {
            query.push(("is_running", "true".to_string()));
        }

        let page: TimeEntriesPage = self.get_json("/v2/time_entries", user_id, &query).await?;
        Ok(page.time_entries)
    }
}
