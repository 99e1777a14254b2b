//! Tracker error type.

use thiserror::Error;

/// Errors surfaced by [`SleepTracker`](super::SleepTracker) actions.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The store failed; passed through untouched.
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("no night with id {0}")]
    NightNotFound(i64),

    /// The tracker was closed while the operation was running.
    #[error("operation cancelled: tracker closed")]
    Cancelled,

    /// The tracker was already closed when the action was requested.
    #[error("tracker is closed")]
    Closed,

    #[error("background worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
