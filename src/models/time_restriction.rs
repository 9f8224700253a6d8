use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Validity window attached to a user override.
///
/// Every configured dimension must pass for the override to apply. Times of
/// day are zero-padded `"HH:MM"` strings in UTC and are compared as strings,
/// so a window whose end is earlier than its start (one that crosses
/// midnight) never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeRestriction {
    /// ISO weekdays, Monday = 1 through Sunday = 7. Empty means every day.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_days: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "09:00")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "17:30")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl TimeRestriction {
    pub fn is_allowed_at(&self, at: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_date {
            if at < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if at > end {
                return false;
            }
        }

        if !self.allowed_days.is_empty() {
            let weekday = at.weekday().number_from_monday();
            if !self.allowed_days.contains(&weekday) {
                return false;
            }
        }

        let clock = at.format("%H:%M").to_string();
        if let Some(start) = self.start_time.as_deref() {
            if clock.as_str() < start {
                return false;
            }
        }
        if let Some(end) = self.end_time.as_deref() {
            if clock.as_str() > end {
                return false;
            }
        }

        true
    }
}

/// Absent restriction is always satisfied.
pub fn restriction_satisfied(restriction: Option<&TimeRestriction>, at: DateTime<Utc>) -> bool {
    restriction.map_or(true, |r| r.is_allowed_at(at))
}
