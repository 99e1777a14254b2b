//! View-facing state derived from the tracker.

use serde::Serialize;

use crate::models::SleepNight;

/// Which actions the view should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Controls {
    pub start: bool,
    pub stop: bool,
    pub clear: bool,
}

impl Controls {
    /// Derive controls from tonight's night and history.
    ///
    /// A stopped night counts as not tracking.
    pub fn derive(tonight: Option<&SleepNight>, nights: &[SleepNight]) -> Self {
        let tracking = tonight.is_some_and(SleepNight::in_progress);
        Self {
            start: !tracking,
            stop: tracking,
            clear: !nights.is_empty(),
        }
    }
}

/// One-shot notifications for the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// A night finished; the view should ask for a quality rating.
    NightStopped { night_id: i64 },
    /// History was wiped.
    HistoryCleared { count: usize },
}
