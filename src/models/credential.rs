//! Stored OAuth credential for a user.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Refresh when the token is within this many days of expiry.
pub const REFRESH_MARGIN_DAYS: i64 = 3;

/// OAuth token pair stored per user.
///
/// Invariant: when present, `access_token` is valid for immediate use; the
/// scheduled refresh check keeps it from going stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds, as reported by the token endpoint
    pub expires_in: i64,
    /// Granted scope (`harvest:<account_id>`)
    #[serde(default)]
    pub scope: Option<String>,
    /// When the token pair was obtained
    pub logged_in_at: DateTime<Utc>,
}

impl UserCredential {
    /// When the access token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.logged_in_at + Duration::seconds(self.expires_in)
    }

    /// Whether the scheduled check should refresh now.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::days(REFRESH_MARGIN_DAYS) >= self.expires_at()
    }

    /// Harvest account id derived from the granted scope.
    pub fn account_id(&self) -> Option<&str> {
        self.scope
            .as_deref()
            .and_then(|s| s.strip_prefix("harvest:"))
    }
}
