//! The last fetched day of timings, persisted as JSON in the key-value store.
//!
//! Reads never fail: an unreadable record is a miss. A stale or missing
//! record triggers a background refresh; a failed refresh keeps serving the
//! old record and only surfaces its error when there is nothing to serve.

pub mod policy;

use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use thiserror::Error;

use crate::db::KeyValueStore;
use crate::models::CacheRecord;
use crate::prayer_times::Clock;
use crate::source::{FetchError, TimingsSource};

pub use policy::CachePolicy;

pub const CACHE_KEY: &str = "prayer_times_cache";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache store: {0}")]
    Store(#[from] anyhow::Error),

    #[error("cache parse failure: {0}")]
    Parse(#[from] serde_json::Error),
}

type RefreshResult = Result<CacheRecord, FetchError>;

/// A refresh other callers can wait on instead of starting their own.
#[derive(Default)]
struct Flight {
    result: Mutex<Option<RefreshResult>>,
    done: Condvar,
}

impl Flight {
    fn finish(&self, result: RefreshResult) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(result);
        self.done.notify_all();
    }

    fn wait(&self) -> RefreshResult {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Held by the caller that performs the fetch. Settles the flight and clears
/// the slot even if the fetch unwinds, so waiters and later refreshes go on.
struct LeaderGuard<'a> {
    slot: &'a Mutex<Option<Arc<Flight>>>,
    flight: Arc<Flight>,
    result: Option<RefreshResult>,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        let result = self.result.take().unwrap_or_else(|| {
            Err(FetchError::NetworkOrApiFailure(
                "refresh aborted".to_string(),
            ))
        });
        self.flight.finish(result);
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

pub struct TimingsCache {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn TimingsSource>,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
    in_flight: Mutex<Option<Arc<Flight>>>,
}

impl TimingsCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn TimingsSource>,
        clock: Arc<dyn Clock>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            store,
            source,
            clock,
            policy,
            in_flight: Mutex::new(None),
        }
    }

    fn read_record(&self) -> Result<Option<CacheRecord>, CacheError> {
        match self.store.get(CACHE_KEY)? {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        }
    }

    /// The persisted record, or `None` when absent or unreadable.
    pub fn load(&self) -> Option<CacheRecord> {
        match self.read_record() {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unreadable prayer times cache: {}", e);
                None
            }
        }
    }

    pub fn store(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let raw = serde_json::to_string(record)?;
        self.store.set(CACHE_KEY, &raw)?;
        Ok(())
    }

    pub fn is_stale(&self, record: &CacheRecord) -> bool {
        let now = self.clock.now().to_utc();
        self.policy.is_stale(record.fetched_at, now)
    }

    fn fetch_and_store(&self) -> RefreshResult {
        let daily = self.source.fetch_timings()?;
        let record = CacheRecord::new(daily, self.clock.now().to_utc());
        if let Err(e) = self.store(&record) {
            // Still worth showing; it just won't survive a restart
            warn!("Could not persist fetched timings: {}", e);
        }
        Ok(record)
    }

    /// Fetch now and overwrite the cache. Concurrent callers share one fetch.
    pub fn refresh(&self) -> RefreshResult {
        let (flight, leader) = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(flight) => (Arc::clone(flight), false),
                None => {
                    let flight = Arc::new(Flight::default());
                    *slot = Some(Arc::clone(&flight));
                    (flight, true)
                }
            }
        };

        if !leader {
            debug!("Joining refresh already in flight");
            return flight.wait();
        }

        let mut guard = LeaderGuard {
            slot: &self.in_flight,
            flight,
            result: None,
        };
        let result = self.fetch_and_store();
        match &result {
            Ok(record) => info!("Refreshed prayer times ({})", record.gregorian_date),
            Err(e) => warn!("Prayer times refresh failed: {}", e),
        }
        guard.result = Some(result.clone());
        result
    }

    /// Serve whatever is cached right away and refresh in the background if
    /// it is missing or stale.
    pub fn load_or_refresh(self: &Arc<Self>) -> ScheduleSource {
        let cached = self.load();

        let needs_refresh = match &cached {
            None => {
                info!("No cached prayer times, fetching");
                true
            }
            Some(record) if self.is_stale(record) => {
                info!(
                    "Cached prayer times from {} are stale under {} policy",
                    record.fetched_at, self.policy
                );
                true
            }
            Some(_) => false,
        };

        if !needs_refresh {
            debug!("Using cached prayer times");
            return ScheduleSource {
                cached,
                updates: None,
            };
        }

        self.spawn_refresh(cached)
    }

    /// Refresh in the background regardless of staleness, still serving the
    /// current record meanwhile.
    pub fn force_refresh(self: &Arc<Self>) -> ScheduleSource {
        self.spawn_refresh(self.load())
    }

    fn spawn_refresh(self: &Arc<Self>, cached: Option<CacheRecord>) -> ScheduleSource {
        let (tx, rx) = mpsc::channel();
        let cache = Arc::clone(self);
        let has_cache = cached.is_some();

        thread::spawn(move || {
            let update = match cache.refresh() {
                Ok(record) => Some(Ok(record)),
                Err(e) if has_cache => {
                    debug!("Keeping cached prayer times after failed refresh: {}", e);
                    None
                }
                Err(e) => Some(Err(e)),
            };
            if let Some(update) = update {
                if tx.send(update).is_err() {
                    debug!("Schedule consumer gone, dropping refresh result");
                }
            }
        });

        ScheduleSource {
            cached,
            updates: Some(rx),
        }
    }
}

/// Cached data now, and possibly one refresh result later.
pub struct ScheduleSource {
    cached: Option<CacheRecord>,
    updates: Option<Receiver<RefreshResult>>,
}

impl ScheduleSource {
    pub fn cached(&self) -> Option<&CacheRecord> {
        self.cached.as_ref()
    }

    pub fn is_refreshing(&self) -> bool {
        self.updates.is_some()
    }

    /// Poll for the refresh outcome without blocking. Yields at most once.
    ///
    /// A failed refresh is only reported when there was no cached record.
    pub fn try_update(&mut self) -> Option<RefreshResult> {
        let rx = self.updates.as_ref()?;
        match rx.try_recv() {
            Ok(update) => {
                self.updates = None;
                Some(update)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.updates = None;
                None
            }
        }
    }

    /// Block until any refresh settles and return the freshest record.
    pub fn wait(self) -> RefreshResult {
        let update = self.updates.and_then(|rx| rx.recv().ok());
        match (update, self.cached) {
            (Some(Ok(record)), _) => Ok(record),
            (Some(Err(_)), Some(cached)) | (None, Some(cached)) => Ok(cached),
            (Some(Err(e)), None) => Err(e),
            (None, None) => Err(FetchError::NetworkOrApiFailure(
                "refresh ended without a result".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{DailyTimings, PrayerTimeSet};
    use crate::prayer_times::clock::FixedClock;
    use chrono::{Duration as ChronoDuration, NaiveTime};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeSource {
        calls: AtomicUsize,
        result: Mutex<Result<DailyTimings, FetchError>>,
        delay: Duration,
    }

    impl FakeSource {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Mutex::new(Ok(fresh_day())),
                delay: Duration::ZERO,
            })
        }

        fn failing(err: FetchError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Mutex::new(Err(err)),
                delay: Duration::ZERO,
            })
        }

        fn slow() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Mutex::new(Ok(fresh_day())),
                delay: Duration::from_millis(300),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TimingsSource for FakeSource {
        fn fetch_timings(&self) -> Result<DailyTimings, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.result.lock().unwrap().clone()
        }
    }

    fn fresh_day() -> DailyTimings {
        let mut timings = PrayerTimeSet::sample();
        timings.fajr = NaiveTime::from_hms_opt(5, 1, 0).unwrap();
        DailyTimings {
            hijri_date: "15 Ramaḍān 1446".to_string(),
            gregorian_date: "15 March 2025".to_string(),
            timings,
        }
    }

    fn old_record(clock: &FixedClock) -> CacheRecord {
        CacheRecord {
            fetched_at: clock.now().to_utc(),
            hijri_date: "14 Ramaḍān 1446".to_string(),
            gregorian_date: "14 March 2025".to_string(),
            timings: PrayerTimeSet::sample(),
        }
    }

    fn cache_with(
        source: Arc<FakeSource>,
        clock: Arc<FixedClock>,
    ) -> (Arc<TimingsCache>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(TimingsCache::new(
            store.clone(),
            source,
            clock,
            CachePolicy::FixedTtl(ChronoDuration::hours(12)),
        ));
        (cache, store)
    }

    #[test]
    fn store_then_load_round_trips() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let (cache, _) = cache_with(FakeSource::ok(), clock.clone());
        let record = old_record(&clock);
        cache.store(&record).unwrap();
        assert_eq!(cache.load(), Some(record));
    }

    #[test]
    fn corrupt_record_is_a_miss() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let (cache, store) = cache_with(FakeSource::ok(), clock);
        store.set(CACHE_KEY, "{not json").unwrap();
        assert_eq!(cache.load(), None);
        assert!(matches!(cache.read_record(), Err(CacheError::Parse(_))));
    }

    #[test]
    fn fresh_record_is_served_without_refreshing() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let source = FakeSource::ok();
        let (cache, _) = cache_with(source.clone(), clock.clone());
        let record = old_record(&clock);
        cache.store(&record).unwrap();

        clock.set(clock.now() + ChronoDuration::hours(11));
        let src = cache.load_or_refresh();
        assert!(!src.is_refreshing());
        assert_eq!(src.cached(), Some(&record));
        assert_eq!(src.wait().unwrap(), record);
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn stale_record_is_served_then_replaced() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let source = FakeSource::ok();
        let (cache, _) = cache_with(source.clone(), clock.clone());
        let record = old_record(&clock);
        cache.store(&record).unwrap();

        clock.set(clock.now() + ChronoDuration::hours(13));
        let src = cache.load_or_refresh();
        assert!(src.is_refreshing());
        assert_eq!(src.cached(), Some(&record));

        let refreshed = src.wait().unwrap();
        assert_eq!(refreshed.gregorian_date, "15 March 2025");
        assert_eq!(refreshed.fetched_at, clock.now().to_utc());
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.load(), Some(refreshed));
    }

    #[test]
    fn failed_refresh_keeps_serving_the_stale_record() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let source = FakeSource::failing(FetchError::NetworkOrApiFailure("offline".into()));
        let (cache, _) = cache_with(source.clone(), clock.clone());
        let record = old_record(&clock);
        cache.store(&record).unwrap();

        clock.set(clock.now() + ChronoDuration::days(2));
        let src = cache.load_or_refresh();
        assert_eq!(src.wait().unwrap(), record);
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.load(), Some(record));
    }

    #[test]
    fn failed_refresh_without_cache_surfaces_the_error() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let source = FakeSource::failing(FetchError::PermissionDenied);
        let (cache, _) = cache_with(source, clock);

        let src = cache.load_or_refresh();
        assert!(src.cached().is_none());
        assert_eq!(src.wait(), Err(FetchError::PermissionDenied));
    }

    #[test]
    fn try_update_reports_the_refresh_once() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let (cache, _) = cache_with(FakeSource::ok(), clock);

        let mut src = cache.load_or_refresh();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let update = loop {
            if let Some(update) = src.try_update() {
                break update;
            }
            assert!(std::time::Instant::now() < deadline);
            thread::sleep(Duration::from_millis(5));
        };
        assert!(update.is_ok());
        assert!(!src.is_refreshing());
        assert!(src.try_update().is_none());
    }

    #[test]
    fn concurrent_refreshes_share_one_fetch() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let source = FakeSource::slow();
        let (cache, _) = cache_with(source.clone(), clock);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.refresh())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(source.calls(), 1);
        assert!(results.iter().all(|r| r == &results[0]));
        assert!(results[0].is_ok());
    }

    #[test]
    fn forced_refresh_ignores_freshness() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let source = FakeSource::ok();
        let (cache, _) = cache_with(source.clone(), clock.clone());
        cache.store(&old_record(&clock)).unwrap();

        let src = cache.force_refresh();
        assert!(src.is_refreshing());
        assert_eq!(src.wait().unwrap().gregorian_date, "15 March 2025");
        assert_eq!(source.calls(), 1);
    }

    struct PanicsOnce {
        panicked: std::sync::atomic::AtomicBool,
    }

    impl TimingsSource for PanicsOnce {
        fn fetch_timings(&self) -> Result<DailyTimings, FetchError> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("location backend crashed");
            }
            Ok(fresh_day())
        }
    }

    #[test]
    fn refresh_recovers_after_a_fetch_panics() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let cache = Arc::new(TimingsCache::new(
            Arc::new(MemoryStore::default()),
            Arc::new(PanicsOnce {
                panicked: std::sync::atomic::AtomicBool::new(false),
            }),
            clock,
            CachePolicy::FixedTtl(ChronoDuration::hours(12)),
        ));

        let first = Arc::clone(&cache);
        assert!(thread::spawn(move || first.refresh()).join().is_err());
        assert!(cache.in_flight.lock().unwrap().is_none());

        let (tx, rx) = mpsc::channel();
        let second = Arc::clone(&cache);
        thread::spawn(move || tx.send(second.refresh()).unwrap());
        let result = rx.recv_timeout(Duration::from_secs(2)).expect("refresh hung");
        assert_eq!(result.unwrap().gregorian_date, "15 March 2025");
    }

    #[test]
    fn sequential_refreshes_fetch_each_time() {
        let clock = Arc::new(FixedClock::at(8, 0));
        let source = FakeSource::ok();
        let (cache, _) = cache_with(source.clone(), clock);
        cache.refresh().unwrap();
        cache.refresh().unwrap();
        assert_eq!(source.calls(), 2);
    }
}
