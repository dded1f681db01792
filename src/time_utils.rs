// SPDX-License-Identifier: MIT

//! Shared helpers for reminder-window evaluation and date stamping.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Current wall-clock time in the configured zone.
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Current calendar date in the configured zone, for `spent_date` stamps.
pub fn today_in(tz: Tz) -> NaiveDate {
    now_in(tz).date_naive()
}

/// Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Half-open daily window check: `start <= now < end`.
pub fn within_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    start <= now && now < end
}
