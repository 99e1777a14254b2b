//! In-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};

use super::NightStore;
use crate::models::SleepNight;

#[derive(Default)]
struct Inner {
    nights: Vec<SleepNight>,
    next_id: i64,
}

/// Store that keeps nights in a `Vec`, oldest first.
///
/// Counts writes so tests can assert that an action touched the store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of insert, update and clear calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of nights currently held.
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |inner| inner.nights.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl NightStore for MemoryStore {
    fn insert(&self, night: &SleepNight) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let mut stored = night.clone();
        stored.night_id = inner.next_id;
        inner.nights.push(stored);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(inner.next_id)
    }

    fn update(&self, night: &SleepNight) -> Result<()> {
        let mut inner = self.lock()?;
        let Some(slot) = inner
            .nights
            .iter_mut()
            .find(|n| n.night_id == night.night_id)
        else {
            bail!("No night with id {} to update", night.night_id);
        };
        *slot = night.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, night_id: i64) -> Result<Option<SleepNight>> {
        let inner = self.lock()?;
        Ok(inner.nights.iter().find(|n| n.night_id == night_id).cloned())
    }

    fn most_recent(&self) -> Result<Option<SleepNight>> {
        let inner = self.lock()?;
        Ok(inner.nights.last().cloned())
    }

    fn all(&self) -> Result<Vec<SleepNight>> {
        let inner = self.lock()?;
        Ok(inner.nights.iter().rev().cloned().collect())
    }

    fn clear(&self) -> Result<usize> {
        let mut inner = self.lock()?;
        let count = inner.nights.len();
        inner.nights.clear();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(count)
    }
}
