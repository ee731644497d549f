//! Schedule entries and next-run computation

use crate::error::{PulseError, Result};
use chrono::{Days, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// One daily trigger time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleEntry {
    /// Parse "HH:MM"; a bare hour like "8" is accepted as "08:00"
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (hour_raw, minute_raw) = match raw.split_once(':') {
            Some((h, m)) => (h, m),
            None => (raw, "0"),
        };

        let invalid = || PulseError::InvalidConfig {
            message: format!("invalid schedule time: {raw:?} (expected HH:MM)"),
        };

        let hour: u32 = hour_raw.parse().map_err(|_| invalid())?;
        let minute: u32 = minute_raw.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }

        Ok(Self { hour, minute })
    }

    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    /// Deduplicate and sort ascending by minute-of-day
    pub fn normalize(mut entries: Vec<ScheduleEntry>) -> Vec<ScheduleEntry> {
        entries.sort_by_key(|e| e.minute_of_day());
        entries.dedup();
        entries
    }
}

impl std::fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Earliest entry strictly after `now` today, or the earliest entry tomorrow
/// when none remain. Pure; an empty entry set is a configuration error, not
/// an endless search.
pub fn next_run_after(now: NaiveDateTime, entries: &[ScheduleEntry]) -> Result<NaiveDateTime> {
    let entries = ScheduleEntry::normalize(entries.to_vec());
    let first = entries.first().ok_or_else(|| PulseError::InvalidConfig {
        message: "schedule is empty".to_string(),
    })?;

    let now_minute = now.hour() * 60 + now.minute();
    let today = now.date();

    for entry in &entries {
        if entry.minute_of_day() > now_minute {
            if let Some(at) = today.and_hms_opt(entry.hour, entry.minute, 0) {
                return Ok(at);
            }
        }
    }

    // Nothing left today: first entry tomorrow.
    let tomorrow = today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| PulseError::InvalidConfig {
            message: "date overflow computing next run".to_string(),
        })?;
    tomorrow
        .and_hms_opt(first.hour, first.minute, 0)
        .ok_or_else(|| PulseError::InvalidConfig {
            message: format!("invalid schedule entry {first}"),
        })
}
