//! Night storage behind a single trait.
//!
//! The tracker only talks to a [`NightStore`]; `SQLite` backs the real
//! binary and the in-memory store backs tests.

mod memory;
mod sqlite;

use anyhow::Result;

use crate::models::SleepNight;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistence operations the tracker needs.
///
/// Calls are blocking; the tracker runs them on tokio's blocking pool.
pub trait NightStore: Send + Sync {
    /// Persist a new night and return its assigned id.
    fn insert(&self, night: &SleepNight) -> Result<i64>;

    /// Overwrite an existing night, matched by `night_id`.
    fn update(&self, night: &SleepNight) -> Result<()>;

    /// Look up a night by id.
    fn get(&self, night_id: i64) -> Result<Option<SleepNight>>;

    /// The most recently inserted night, finished or not.
    fn most_recent(&self) -> Result<Option<SleepNight>>;

    /// Every night, newest first.
    fn all(&self) -> Result<Vec<SleepNight>>;

    /// Delete every night and return how many were removed.
    fn clear(&self) -> Result<usize>;
}
