//! Sleep tracker state holder.
//!
//! Owns the cached "tonight" night, the history and the derived controls,
//! and publishes each of them through a `watch` channel. Every action runs
//! its store work on tokio's blocking pool and races it against the
//! tracker's cancellation token, so closing the tracker abandons whatever
//! is still pending.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sleeptrack::store::MemoryStore;
//! use sleeptrack::tracker::SleepTracker;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let tracker = SleepTracker::new(Arc::new(MemoryStore::new()));
//!     let mut tonight = tracker.subscribe_tonight();
//!
//!     tracker.refresh().await?;
//!     tracker.start().await?;
//!     tonight.changed().await?;
//!     println!("tracking: {:?}", *tonight.borrow());
//!
//!     tracker.stop().await?;
//!     tracker.close();
//!     Ok(())
//! }
//! ```

mod error;
mod state;

use std::sync::{Arc, Mutex};

use chrono::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::models::{SleepNight, SleepQuality};
use crate::store::NightStore;

pub use error::TrackerError;
pub use state::{Controls, TrackerEvent};

/// Result alias for tracker actions.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Presentation state for the sleep tracking screen.
pub struct SleepTracker {
    store: Arc<dyn NightStore>,
    clock: Arc<dyn Clock>,

    /// Tonight's night: in progress, or just stopped.
    tonight: watch::Sender<Option<SleepNight>>,

    /// All nights, newest first.
    nights: watch::Sender<Vec<SleepNight>>,

    controls: watch::Sender<Controls>,

    events: Mutex<EventSlot>,

    /// Cancelled on close or drop.
    cancel: CancellationToken,
}

impl SleepTracker {
    /// Create a tracker over `store` using the wall clock.
    ///
    /// Nothing is loaded until [`refresh`](Self::refresh) is called.
    pub fn new(store: Arc<dyn NightStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a tracker with a custom time source.
    pub fn with_clock(store: Arc<dyn NightStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            tonight: watch::Sender::new(None),
            nights: watch::Sender::new(Vec::new()),
            controls: watch::Sender::new(Controls::derive(None, &[])),
            events: Mutex::new(EventSlot::Untaken),
            cancel: CancellationToken::new(),
        }
    }

    // === Observables ===

    pub fn subscribe_tonight(&self) -> watch::Receiver<Option<SleepNight>> {
        self.tonight.subscribe()
    }

    pub fn subscribe_nights(&self) -> watch::Receiver<Vec<SleepNight>> {
        self.nights.subscribe()
    }

    pub fn subscribe_controls(&self) -> watch::Receiver<Controls> {
        self.controls.subscribe()
    }

    /// Take the event stream. Only the first caller gets it.
    ///
    /// Events raised before this call are not kept.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TrackerEvent>> {
        let mut slot = self.events.lock().ok()?;
        if matches!(*slot, EventSlot::Taken(_)) {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *slot = EventSlot::Taken(tx);
        Some(rx)
    }

    /// Tonight's night, still holding a stopped night until the next refresh.
    pub fn tonight(&self) -> Option<SleepNight> {
        self.tonight.borrow().clone()
    }

    /// Tonight's night while it is still in progress.
    pub fn tracking(&self) -> Option<SleepNight> {
        self.tonight.borrow().clone().filter(SleepNight::in_progress)
    }

    /// Current history snapshot, newest first.
    pub fn nights(&self) -> Vec<SleepNight> {
        self.nights.borrow().clone()
    }

    pub fn controls(&self) -> Controls {
        *self.controls.borrow()
    }

    /// The newest night that has been stopped.
    pub fn latest_finished(&self) -> Option<SleepNight> {
        self.nights.borrow().iter().find(|n| !n.in_progress()).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // === Actions ===

    /// Reload tonight and the history from the store.
    ///
    /// The most recent night only counts as tonight while it is still in
    /// progress.
    pub async fn refresh(&self) -> Result<Option<SleepNight>> {
        let (tonight, nights) = self
            .run("refresh", |store| {
                let tonight = store.most_recent()?.filter(SleepNight::in_progress);
                Ok((tonight, store.all()?))
            })
            .await?;

        debug!(
            tracking = tonight.is_some(),
            nights = nights.len(),
            "refreshed"
        );
        self.publish(tonight.clone(), nights);
        Ok(tonight)
    }

    /// Start tracking a new night, then refresh.
    ///
    /// Returns the inserted night with its assigned id.
    pub async fn start(&self) -> Result<SleepNight> {
        let mut night = SleepNight::new(self.clock.now());
        let stored = night.clone();
        night.night_id = self
            .run("start", move |store| store.insert(&stored))
            .await?;

        info!(night_id = night.night_id, "started tracking");
        self.refresh().await?;
        Ok(night)
    }

    /// Stop tonight's night. Does nothing unless a night is in progress.
    ///
    /// The stopped night stays in `tonight` with its end time set.
    ///
    /// The end time is kept at least one millisecond after the start so a
    /// stopped night never reads as in progress.
    pub async fn stop(&self) -> Result<Option<SleepNight>> {
        let Some(mut night) = self.tracking() else {
            debug!("stop requested with nothing in progress");
            return Ok(None);
        };

        let now = self.clock.now();
        night.end_time = now.max(night.start_time + Duration::milliseconds(1));

        let stored = night.clone();
        let nights = self
            .run("stop", move |store| {
                store.update(&stored)?;
                store.all()
            })
            .await?;

        info!(
            night_id = night.night_id,
            minutes = night.duration().num_minutes(),
            "stopped tracking"
        );
        self.publish(Some(night.clone()), nights);
        self.emit(TrackerEvent::NightStopped {
            night_id: night.night_id,
        });
        Ok(Some(night))
    }

    /// Delete every night and forget tonight.
    pub async fn clear(&self) -> Result<usize> {
        let count = self.run("clear", |store| store.clear()).await?;

        info!(count, "cleared history");
        self.publish(None, Vec::new());
        self.emit(TrackerEvent::HistoryCleared { count });
        Ok(count)
    }

    /// Record how well a night went.
    pub async fn rate(&self, night_id: i64, quality: SleepQuality) -> Result<SleepNight> {
        let rated = self
            .run("rate", move |store| {
                let Some(mut night) = store.get(night_id)? else {
                    return Ok(None);
                };
                night.quality = Some(quality);
                store.update(&night)?;
                Ok(Some((night, store.all()?)))
            })
            .await?;

        let Some((night, nights)) = rated else {
            return Err(TrackerError::NightNotFound(night_id));
        };

        info!(night_id, quality = quality.score(), "rated night");
        let tonight = self
            .tonight()
            .map(|t| if t.night_id == night_id { night.clone() } else { t });
        self.publish(tonight, nights);
        Ok(night)
    }

    /// Tear down: cancel pending store work and refuse further actions.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!("closing tracker");
            self.cancel.cancel();
        }
    }

    // === Internals ===

    /// Run `op` against the store on the blocking pool.
    async fn run<T, F>(&self, name: &'static str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn NightStore) -> anyhow::Result<T> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(TrackerError::Closed);
        }

        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || op(store.as_ref()));

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(op = name, "store operation cancelled");
                Err(TrackerError::Cancelled)
            }
            joined = task => Ok(joined??),
        }
    }

    fn emit(&self, event: TrackerEvent) {
        if let Ok(slot) = self.events.lock() {
            if let EventSlot::Taken(tx) = &*slot {
                let _ = tx.send(event);
            }
        }
    }

    fn publish(&self, tonight: Option<SleepNight>, nights: Vec<SleepNight>) {
        let controls = Controls::derive(tonight.as_ref(), &nights);
        self.tonight.send_replace(tonight);
        self.nights.send_replace(nights);
        self.controls.send_replace(controls);
    }
}

/// Event sender, created once a view takes the receiver.
enum EventSlot {
    Untaken,
    Taken(mpsc::UnboundedSender<TrackerEvent>),
}

impl Drop for SleepTracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{MemoryStore, SqliteStore};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::mpsc as std_mpsc;
    use tokio::sync::Notify;

    fn evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 22, 30, 0).unwrap()
    }

    fn tracker_with(store: Arc<MemoryStore>) -> (SleepTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(evening()));
        let tracker = SleepTracker::with_clock(store, clock.clone());
        (tracker, clock)
    }

    #[tokio::test]
    async fn test_start_publishes_in_progress_night() {
        let store = Arc::new(MemoryStore::new());
        let (tracker, _clock) = tracker_with(store.clone());
        let mut tonight = tracker.subscribe_tonight();

        let night = tracker.start().await.unwrap();
        assert!(night.in_progress());
        assert_eq!(night.start_time, evening());

        assert!(tonight.has_changed().unwrap());
        let observed = tonight.borrow_and_update().clone().unwrap();
        assert_eq!(observed.start_time, observed.end_time);
        assert_eq!(observed.night_id, night.night_id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_sets_end_after_start() {
        let store = Arc::new(MemoryStore::new());
        let (tracker, clock) = tracker_with(store.clone());
        let mut events = tracker.take_events().unwrap();
        let tonight = tracker.subscribe_tonight();

        let started = tracker.start().await.unwrap();
        clock.advance(Duration::hours(8));
        let stopped = tracker.stop().await.unwrap().unwrap();

        assert_eq!(stopped.night_id, started.night_id);
        assert_eq!(stopped.duration(), Duration::hours(8));

        let observed = tonight.borrow().clone().unwrap();
        assert_eq!(observed.night_id, started.night_id);
        assert!(observed.end_time > observed.start_time);
        assert!(tracker.tracking().is_none());
        assert!(tracker.controls().start);
        assert!(!tracker.controls().stop);

        let stored = store.get(started.night_id).unwrap().unwrap();
        assert!(stored.end_time > stored.start_time);
        assert_eq!(
            events.recv().await,
            Some(TrackerEvent::NightStopped {
                night_id: started.night_id
            })
        );
    }

    #[tokio::test]
    async fn test_stop_without_clock_movement_still_finishes() {
        let store = Arc::new(MemoryStore::new());
        let (tracker, _clock) = tracker_with(store.clone());

        tracker.start().await.unwrap();
        let stopped = tracker.stop().await.unwrap().unwrap();

        assert!(stopped.end_time > stopped.start_time);
        let observed = tracker.tonight().unwrap();
        assert!(observed.end_time > observed.start_time);
        assert!(tracker.refresh().await.unwrap().is_none());
        assert!(tracker.tonight().is_none());
    }

    #[tokio::test]
    async fn test_start_returns_inserted_night_when_refresh_finds_none() {
        /// Store that never reports a most recent night.
        struct NoRecentStore(MemoryStore);

        impl NightStore for NoRecentStore {
            fn insert(&self, night: &SleepNight) -> anyhow::Result<i64> {
                self.0.insert(night)
            }
            fn update(&self, night: &SleepNight) -> anyhow::Result<()> {
                self.0.update(night)
            }
            fn get(&self, night_id: i64) -> anyhow::Result<Option<SleepNight>> {
                self.0.get(night_id)
            }
            fn most_recent(&self) -> anyhow::Result<Option<SleepNight>> {
                Ok(None)
            }
            fn all(&self) -> anyhow::Result<Vec<SleepNight>> {
                self.0.all()
            }
            fn clear(&self) -> anyhow::Result<usize> {
                self.0.clear()
            }
        }

        let clock = Arc::new(ManualClock::new(evening()));
        let tracker =
            SleepTracker::with_clock(Arc::new(NoRecentStore(MemoryStore::new())), clock);

        let night = tracker.start().await.unwrap();
        assert_eq!(night.night_id, 1);
        assert_eq!(night.start_time, evening());
        assert!(night.in_progress());
        assert!(tracker.tonight().is_none());
    }

    #[tokio::test]
    async fn test_stop_with_nothing_in_progress_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let (tracker, _clock) = tracker_with(store.clone());

        assert!(tracker.stop().await.unwrap().is_none());
        assert_eq!(store.writes(), 0);

        tracker.start().await.unwrap();
        tracker.stop().await.unwrap();
        let writes = store.writes();
        assert!(tracker.stop().await.unwrap().is_none());
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_clear_resets_state() {
        let store = Arc::new(MemoryStore::new());
        let (tracker, clock) = tracker_with(store.clone());
        let mut events = tracker.take_events().unwrap();

        tracker.start().await.unwrap();
        clock.advance(Duration::hours(7));
        tracker.stop().await.unwrap();
        tracker.start().await.unwrap();

        assert_eq!(tracker.clear().await.unwrap(), 2);
        assert!(tracker.tonight().is_none());
        assert!(tracker.nights().is_empty());
        assert!(store.is_empty());
        assert_eq!(
            tracker.controls(),
            Controls {
                start: true,
                stop: false,
                clear: false
            }
        );

        assert!(matches!(
            events.recv().await,
            Some(TrackerEvent::NightStopped { .. })
        ));
        assert_eq!(
            events.recv().await,
            Some(TrackerEvent::HistoryCleared { count: 2 })
        );
    }

    #[tokio::test]
    async fn test_refresh_ignores_finished_night() {
        let store = Arc::new(MemoryStore::new());
        let mut night = SleepNight::new(evening());
        night.end_time = evening() + Duration::hours(6);
        store.insert(&night).unwrap();

        let (tracker, _clock) = tracker_with(store);
        assert!(tracker.refresh().await.unwrap().is_none());
        assert!(tracker.tonight().is_none());
        assert_eq!(tracker.nights().len(), 1);
        assert!(tracker.controls().start);
        assert!(tracker.controls().clear);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_existing_in_progress_night() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert(&SleepNight::new(evening())).unwrap();

        let (tracker, _clock) = tracker_with(store);
        let tonight = tracker.refresh().await.unwrap().unwrap();
        assert_eq!(tonight.night_id, id);
        assert!(tracker.controls().stop);
    }

    #[tokio::test]
    async fn test_rate_updates_history() {
        let store = Arc::new(MemoryStore::new());
        let (tracker, clock) = tracker_with(store.clone());

        let night = tracker.start().await.unwrap();
        clock.advance(Duration::hours(8));
        tracker.stop().await.unwrap();
        assert_eq!(tracker.latest_finished().unwrap().night_id, night.night_id);

        let rated = tracker
            .rate(night.night_id, SleepQuality::Good)
            .await
            .unwrap();
        assert_eq!(rated.quality, Some(SleepQuality::Good));
        assert_eq!(
            store.get(night.night_id).unwrap().unwrap().quality,
            Some(SleepQuality::Good)
        );
        assert_eq!(tracker.nights()[0].quality, Some(SleepQuality::Good));
        assert_eq!(tracker.tonight().unwrap().quality, Some(SleepQuality::Good));
    }

    #[tokio::test]
    async fn test_rate_unknown_night() {
        let (tracker, _clock) = tracker_with(Arc::new(MemoryStore::new()));
        let err = tracker.rate(404, SleepQuality::Poor).await.unwrap_err();
        assert!(matches!(err, TrackerError::NightNotFound(404)));
    }

    #[tokio::test]
    async fn test_controls_follow_actions() {
        let (tracker, clock) = tracker_with(Arc::new(MemoryStore::new()));
        let mut controls = tracker.subscribe_controls();
        assert!(controls.borrow().start);

        tracker.start().await.unwrap();
        assert!(controls.has_changed().unwrap());
        let now = *controls.borrow_and_update();
        assert!(!now.start && now.stop && now.clear);

        clock.advance(Duration::minutes(30));
        tracker.stop().await.unwrap();
        let now = *controls.borrow_and_update();
        assert!(now.start && !now.stop && now.clear);
    }

    #[tokio::test]
    async fn test_events_taken_once() {
        let (tracker, _clock) = tracker_with(Arc::new(MemoryStore::new()));
        assert!(tracker.take_events().is_some());
        assert!(tracker.take_events().is_none());
    }

    #[tokio::test]
    async fn test_events_before_take_are_not_buffered() {
        let (tracker, clock) = tracker_with(Arc::new(MemoryStore::new()));

        tracker.start().await.unwrap();
        clock.advance(Duration::hours(6));
        tracker.stop().await.unwrap();

        let mut events = tracker.take_events().unwrap();
        assert!(events.try_recv().is_err());

        tracker.clear().await.unwrap();
        assert_eq!(
            events.try_recv().ok(),
            Some(TrackerEvent::HistoryCleared { count: 1 })
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_tracker_rejects_actions() {
        let store = Arc::new(MemoryStore::new());
        let (tracker, _clock) = tracker_with(store.clone());
        tracker.close();

        assert!(tracker.is_closed());
        assert!(matches!(tracker.start().await, Err(TrackerError::Closed)));
        assert!(matches!(tracker.clear().await, Err(TrackerError::Closed)));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        struct FailingStore;

        impl NightStore for FailingStore {
            fn insert(&self, _: &SleepNight) -> anyhow::Result<i64> {
                anyhow::bail!("disk full")
            }
            fn update(&self, _: &SleepNight) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
            fn get(&self, _: i64) -> anyhow::Result<Option<SleepNight>> {
                anyhow::bail!("disk full")
            }
            fn most_recent(&self) -> anyhow::Result<Option<SleepNight>> {
                anyhow::bail!("disk full")
            }
            fn all(&self) -> anyhow::Result<Vec<SleepNight>> {
                anyhow::bail!("disk full")
            }
            fn clear(&self) -> anyhow::Result<usize> {
                anyhow::bail!("disk full")
            }
        }

        let tracker = SleepTracker::new(Arc::new(FailingStore));
        let err = tracker.start().await.unwrap_err();
        assert!(matches!(err, TrackerError::Store(_)));
        assert!(err.to_string().contains("disk full"));
        assert!(matches!(
            tracker.refresh().await,
            Err(TrackerError::Store(_))
        ));
    }

    /// Store whose `most_recent` blocks until released.
    struct GatedStore {
        inner: MemoryStore,
        entered: Arc<Notify>,
        release: Mutex<std_mpsc::Receiver<()>>,
    }

    impl NightStore for GatedStore {
        fn insert(&self, night: &SleepNight) -> anyhow::Result<i64> {
            self.inner.insert(night)
        }
        fn update(&self, night: &SleepNight) -> anyhow::Result<()> {
            self.inner.update(night)
        }
        fn get(&self, night_id: i64) -> anyhow::Result<Option<SleepNight>> {
            self.inner.get(night_id)
        }
        fn most_recent(&self) -> anyhow::Result<Option<SleepNight>> {
            self.entered.notify_one();
            if let Ok(release) = self.release.lock() {
                let _ = release.recv();
            }
            self.inner.most_recent()
        }
        fn all(&self) -> anyhow::Result<Vec<SleepNight>> {
            self.inner.all()
        }
        fn clear(&self) -> anyhow::Result<usize> {
            self.inner.clear()
        }
    }

    #[tokio::test]
    async fn test_close_cancels_pending_work() {
        let entered = Arc::new(Notify::new());
        let (release_tx, release_rx) = std_mpsc::channel();
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            entered: entered.clone(),
            release: Mutex::new(release_rx),
        });
        store.inner.insert(&SleepNight::new(evening())).unwrap();

        let tracker = Arc::new(SleepTracker::new(store));
        let pending = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.refresh().await })
        };

        entered.notified().await;
        tracker.close();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(TrackerError::Cancelled)));
        assert!(tracker.tonight().is_none());

        release_tx.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_full_cycle_on_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("sleep.db")).unwrap());
        let clock = Arc::new(ManualClock::new(evening()));
        let tracker = SleepTracker::with_clock(store.clone(), clock.clone());

        assert!(tracker.refresh().await.unwrap().is_none());
        let night = tracker.start().await.unwrap();
        assert!(night.in_progress());

        clock.advance(Duration::hours(9));
        tracker.stop().await.unwrap();
        tracker
            .rate(night.night_id, SleepQuality::Excellent)
            .await
            .unwrap();

        let stored = store.most_recent().unwrap().unwrap();
        assert_eq!(stored.duration(), Duration::hours(9));
        assert_eq!(stored.quality, Some(SleepQuality::Excellent));

        tracker.clear().await.unwrap();
        assert!(store.all().unwrap().is_empty());
        assert!(tracker.tonight().is_none());
    }
}
