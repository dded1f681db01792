//! Persisted reminder configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Per-user reminder settings.
///
/// `config_id` is regenerated on every save; a running timer that captured
/// an older id self-terminates on its next tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Zero disables reminders entirely
    pub interval_minutes: u64,
    /// Start of the daily local-time window (inclusive)
    pub window_start: NaiveTime,
    /// End of the daily local-time window (exclusive)
    pub window_end: NaiveTime,
    /// Remind even while a time entry is running
    pub remind_while_tracking: bool,
    pub config_id: String,
}
