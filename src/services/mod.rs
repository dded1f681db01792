// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod commands;
pub mod harvest;
pub mod oauth;
pub mod reminder;
pub mod tracking;

pub use harvest::HarvestService;
pub use oauth::OAuthService;
pub use reminder::ReminderScheduler;
pub use tracking::TrackingService;
