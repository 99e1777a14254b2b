//! Sleep night model representing one tracked sleep interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SleepQuality;

/// A sleep night as stored in the database.
///
/// A night is in progress while `end_time == start_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepNight {
    /// Row identifier (assigned by the store on insert).
    pub night_id: i64,
    /// When tracking started.
    pub start_time: DateTime<Utc>,
    /// When tracking stopped. Equal to `start_time` until then.
    pub end_time: DateTime<Utc>,
    /// Rating given after waking up.
    pub quality: Option<SleepQuality>,
}

impl SleepNight {
    /// Create a new in-progress night starting at `now` (id will be set by the store).
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            night_id: 0,
            start_time: now,
            end_time: now,
            quality: None,
        }
    }

    /// Whether this night is still being tracked.
    pub fn in_progress(&self) -> bool {
        self.end_time == self.start_time
    }

    /// Time slept, zero while in progress.
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}
