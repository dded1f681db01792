//! Key-value store layer.
//!
//! The persistence engine is an external collaborator reached through the
//! [`KvStore`] trait: plain get/set/delete plus a prefix scan, no
//! transactions. [`TokenStore`] layers the user-scoped key schema and typed
//! records on top.

pub mod memory;
pub mod token_store;

pub use memory::MemoryStore;
pub use token_store::TokenStore;

use async_trait::async_trait;

/// Per-user field names, stored under `"<user_id>:<field>"`.
pub mod fields {
    /// Serialized [`crate::models::UserCredential`]
    pub const AUTH: &str = "auth";
    /// Raw OAuth scope string (`harvest:<account_id>`)
    pub const SCOPE: &str = "scope";
    pub const SELECTED_PROJECT: &str = "selected_project";
    pub const SELECTED_TASK: &str = "selected_task";
    /// Single-use cache of the project-assignments payload
    pub const PROJECT_ASSIGNMENTS: &str = "project_assignments";
    pub const REMINDER_CONFIG: &str = "reminder_config";
    /// Project/task pair of the most recently created time entry
    pub const LAST_TIME_ENTRY: &str = "last_time_entry";
    pub const LOGIN_BUTTON_MESSAGE: &str = "login_button_message_id";
    pub const SETUP_BUTTON_MESSAGE: &str = "setup_button_message_id";
}

/// Store access errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key-value store error: {0}")]
    Backend(String),

    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

/// Minimal key-value store contract.
///
/// No transactions and no TTLs; read-modify-write sequences within one
/// handler invocation assume the store stays consistent between the two
/// calls (accepted design trade-off, see DESIGN.md).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys starting with `prefix`. An empty prefix returns every key.
    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
