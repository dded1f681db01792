// SPDX-License-Identifier: MIT

//! Reminder scheduler.
//!
//! One logical timer per user, re-armed on process start from persisted
//! configuration and replaced on every configuration change. A tick
//! re-renders the user's tracking status inside the configured daily
//! window, skipping weekends and (unless configured otherwise) ticks where
//! the user is already tracking.
//!
//! Cancellation is a per-user [`CancellationToken`]: reconfiguration and
//! logout cancel the old task immediately. The per-tick `config_id`
//! comparison against the stored config is kept as a backstop, so a timer
//! that somehow survives replacement still self-terminates.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::models::ReminderConfig;
use crate::services::{HarvestService, OAuthService, TrackingService};
use crate::store::{fields, TokenStore};
use crate::time_utils;

/// Floor applied to any non-zero interval.
const MIN_INTERVAL_MINUTES: u64 = 5;

/// How often the token-refresh check runs per user.
const REFRESH_CHECK_HOURS: u64 = 6;

/// What a single tick decided.
#[derive(Debug, PartialEq, Eq)]
enum TickOutcome {
    /// Config replaced or user logged out: the timer ends itself.
    Stop,
    /// Outside the window, weekend, or already tracking: do nothing.
    Skip,
    /// Render the status view.
    Remind,
}

/// Per-user reminder timers and refresh checks.
#[derive(Clone)]
pub struct ReminderScheduler {
    store: TokenStore,
    tracking: TrackingService,
    oauth: OAuthService,
    harvest: HarvestService,
    time_zone: Tz,
    timers: Arc<DashMap<String, CancellationToken>>,
    refresh_checks: Arc<DashMap<String, CancellationToken>>,
}

impl ReminderScheduler {
    pub fn new(
        store: TokenStore,
        tracking: TrackingService,
        oauth: OAuthService,
        harvest: HarvestService,
        time_zone: Tz,
    ) -> Self {
        Self {
            store,
            tracking,
            oauth,
            harvest,
            time_zone,
            timers: Arc::new(DashMap::new()),
            refresh_checks: Arc::new(DashMap::new()),
        }
    }

    // ─── Configuration ───────────────────────────────────────────────────

    /// Validate and persist a reminder configuration, then replace the
    /// user's timer. An inverted window is rejected without any mutation.
    pub async fn configure(
        &self,
        user_id: &str,
        interval_minutes: u64,
        window_start: chrono::NaiveTime,
        window_end: chrono::NaiveTime,
        remind_while_tracking: bool,
    ) -> Result<()> {
        if window_start > window_end {
            return Err(ValidationError::InvertedWindow {
                start: window_start,
                end: window_end,
            }
            .into());
        }

        let config = ReminderConfig {
            interval_minutes,
            window_start,
            window_end,
            remind_while_tracking,
            config_id: Uuid::new_v4().to_string(),
        };
        self.store.set_reminder_config(user_id, &config).await?;

        tracing::info!(
            user_id = %user_id,
            interval_minutes,
            config_id = %config.config_id,
            "Reminder configuration saved"
        );

        self.create_timer(user_id, interval_minutes, &config.config_id);
        Ok(())
    }

    /// Replace the user's timer. Zero minutes disables reminders; anything
    /// below the floor behaves as the floor.
    pub fn create_timer(&self, user_id: &str, interval_minutes: u64, config_id: &str) {
        if let Some((_, old)) = self.timers.remove(user_id) {
            old.cancel();
        }

        let interval = match effective_interval(interval_minutes) {
            Some(interval) => interval,
            None => {
                tracing::info!(user_id = %user_id, "Reminders disabled");
                return;
            }
        };

        let token = CancellationToken::new();
        self.timers.insert(user_id.to_string(), token.clone());

        let scheduler = self.clone();
        let user_id = user_id.to_string();
        let config_id = config_id.to_string();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // fires immediately, skip it

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !scheduler.on_tick(&user_id, &config_id).await {
                            break;
                        }
                    }
                }
            }

            tracing::debug!(user_id = %user_id, "Reminder timer ended");
        });
    }

    /// Whether a timer task is currently scheduled for the user.
    pub fn has_timer(&self, user_id: &str) -> bool {
        self.timers.contains_key(user_id)
    }

    /// Cancel the user's timer and refresh check (logout path).
    pub fn cancel_user(&self, user_id: &str) {
        if let Some((_, token)) = self.timers.remove(user_id) {
            token.cancel();
        }
        if let Some((_, token)) = self.refresh_checks.remove(user_id) {
            token.cancel();
        }
    }

    // ─── Ticks ───────────────────────────────────────────────────────────

    /// Run one tick; returns false when the timer should end.
    pub async fn on_tick(&self, user_id: &str, captured_config_id: &str) -> bool {
        match self.evaluate_tick(user_id, captured_config_id).await {
            TickOutcome::Stop => false,
            TickOutcome::Skip => true,
            TickOutcome::Remind => {
                if let Err(e) = self.tracking.post_status(user_id).await {
                    tracing::warn!(user_id = %user_id, error = %e, "Reminder status render failed");
                }
                true
            }
        }
    }

    async fn evaluate_tick(&self, user_id: &str, captured_config_id: &str) -> TickOutcome {
        let config = match self.store.reminder_config(user_id).await {
            Ok(Some(config)) => config,
            Ok(None) => return TickOutcome::Stop,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Reminder tick store read failed");
                return TickOutcome::Skip;
            }
        };

        // Reconfigured since this timer was armed.
        if config.config_id != captured_config_id {
            return TickOutcome::Stop;
        }

        // Logged out.
        match self.store.credential(user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return TickOutcome::Stop,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Reminder tick store read failed");
                return TickOutcome::Skip;
            }
        }

        let now = time_utils::now_in(self.time_zone);
        if !tick_within_schedule(&config, now) {
            return TickOutcome::Skip;
        }

        if !config.remind_while_tracking {
            match self.harvest.list_time_entries(user_id, true, 1).await {
                Ok(entries) if !entries.is_empty() => return TickOutcome::Skip,
                Ok(_) => {}
                Err(e) => {
                    // Degrade to a skipped tick, never a crash.
                    tracing::warn!(user_id = %user_id, error = %e, "Running-entry check failed");
                    return TickOutcome::Skip;
                }
            }
        }

        TickOutcome::Remind
    }

    // ─── Refresh Checks ──────────────────────────────────────────────────

    /// Arm (or re-arm) the 6-hourly token refresh check for a user. The
    /// refresh itself only happens once the token is inside the margin.
    pub fn arm_refresh_check(&self, user_id: &str) {
        if let Some((_, old)) = self.refresh_checks.remove(user_id) {
            old.cancel();
        }

        let token = CancellationToken::new();
        self.refresh_checks.insert(user_id.to_string(), token.clone());

        let scheduler = self.clone();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(REFRESH_CHECK_HOURS * 3600));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !scheduler.refresh_tick(&user_id, Utc::now()).await {
                            break;
                        }
                    }
                }
            }

            tracing::debug!(user_id = %user_id, "Refresh check ended");
        });
    }

    /// One refresh check; returns false when the check should end.
    pub async fn refresh_tick(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        let credential = match self.store.credential(user_id).await {
            Ok(Some(credential)) => credential,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Refresh check store read failed");
                return true;
            }
        };

        if !credential.needs_refresh(now) {
            return true;
        }

        // A failed refresh wipes the user and prompts re-login; the next
        // iteration finds no credential and ends the loop.
        if let Err(e) = self.oauth.refresh(user_id).await {
            tracing::warn!(user_id = %user_id, error = %e, "Scheduled token refresh failed");
        }
        true
    }

    // ─── Rehydration ─────────────────────────────────────────────────────

    /// On process start: one timer per persisted reminder config, one
    /// refresh check per persisted credential.
    pub async fn rehydrate(&self) -> Result<()> {
        for user_id in self.store.users_with(fields::REMINDER_CONFIG).await? {
            if let Some(config) = self.store.reminder_config(&user_id).await? {
                self.create_timer(&user_id, config.interval_minutes, &config.config_id);
            }
        }

        for user_id in self.store.users_with(fields::AUTH).await? {
            self.arm_refresh_check(&user_id);
        }

        tracing::info!("Reminder timers and refresh checks rehydrated");
        Ok(())
    }
}

/// Interval actually used by a timer: `None` disables, anything else is
/// clamped to the floor.
fn effective_interval(interval_minutes: u64) -> Option<Duration> {
    if interval_minutes == 0 {
        return None;
    }
    Some(Duration::from_secs(
        interval_minutes.max(MIN_INTERVAL_MINUTES) * 60,
    ))
}

/// Weekday and daily-window gate for one tick.
fn tick_within_schedule(config: &ReminderConfig, now: DateTime<Tz>) -> bool {
    time_utils::is_weekday(now.date_naive())
        && time_utils::within_window(now.time(), config.window_start, config.window_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn config(start: (u32, u32), end: (u32, u32)) -> ReminderConfig {
        ReminderConfig {
            interval_minutes: 30,
            window_start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            remind_while_tracking: false,
            config_id: "cfg-1".to_string(),
        }
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> DateTime<Tz> {
        chrono_tz::UTC
            .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
            .unwrap()
    }

    #[test]
    fn test_effective_interval_disabled_and_floored() {
        assert_eq!(effective_interval(0), None);
        assert_eq!(effective_interval(3), Some(Duration::from_secs(5 * 60)));
        assert_eq!(effective_interval(5), Some(Duration::from_secs(5 * 60)));
        assert_eq!(effective_interval(45), Some(Duration::from_secs(45 * 60)));
    }

    #[test]
    fn test_schedule_gate_window_and_weekend() {
        let cfg = config((9, 0), (18, 0));
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();

        assert!(tick_within_schedule(&cfg, at(monday, 9, 0)));
        assert!(tick_within_schedule(&cfg, at(monday, 12, 15)));
        // End is exclusive
        assert!(!tick_within_schedule(&cfg, at(monday, 18, 0)));
        assert!(!tick_within_schedule(&cfg, at(monday, 8, 59)));
        // Weekend
        assert!(!tick_within_schedule(&cfg, at(saturday, 12, 0)));
    }
}
