//! `SQLite`-backed store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use tracing::debug;

use super::NightStore;
use crate::db::{Database, NightQueries};
use crate::models::SleepNight;

/// Store that keeps nights in a `SQLite` database.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening sleep database");
        Ok(Self::from_database(Database::open_at(path)?))
    }

    /// Open a throwaway in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    /// Wrap an already opened database.
    pub const fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| anyhow!("sleep database lock poisoned"))
    }
}

impl NightStore for SqliteStore {
    fn insert(&self, night: &SleepNight) -> Result<i64> {
        let db = self.lock()?;
        let id = NightQueries::insert(db.conn(), night)?;
        debug!(night_id = id, "inserted night");
        Ok(id)
    }

    fn update(&self, night: &SleepNight) -> Result<()> {
        let db = self.lock()?;
        if NightQueries::update(db.conn(), night)? == 0 {
            bail!("No night with id {} to update", night.night_id);
        }
        debug!(night_id = night.night_id, "updated night");
        Ok(())
    }

    fn get(&self, night_id: i64) -> Result<Option<SleepNight>> {
        let db = self.lock()?;
        NightQueries::get_by_id(db.conn(), night_id)
    }

    fn most_recent(&self) -> Result<Option<SleepNight>> {
        let db = self.lock()?;
        NightQueries::get_latest(db.conn())
    }

    fn all(&self) -> Result<Vec<SleepNight>> {
        let db = self.lock()?;
        NightQueries::list(db.conn())
    }

    fn clear(&self) -> Result<usize> {
        let db = self.lock()?;
        let count = NightQueries::clear(db.conn())?;
        debug!(count, "cleared nights");
        Ok(count)
    }
}
