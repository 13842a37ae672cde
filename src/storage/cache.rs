//! In-memory layout cache
//!
//! Maps a [`LayoutKey`] to a computed [`LayoutResult`]. The cache is bounded
//! by entry count (least-recently-accessed entry evicted first) and by age
//! (entries older than the TTL read as absent and are swept when an insert
//! needs room).
//!
//! [`LayoutCache::get_or_compute`] is single-flight: concurrent callers for
//! the same key share one computation and all receive its outcome. Failed
//! computations are never stored, so the next request retries.
//!
//! Locks are held only to look up, insert or evict; the computation itself
//! runs without any cache lock held.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::key::LayoutKey;
use crate::domain::{LayoutError, LayoutResult};
use crate::logging::{null_logger, SharedLogger};

/// Observable cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    /// Entries removed because their TTL ran out
    pub expired_count: u64,
    /// Callers served by another caller's in-flight computation
    pub coalesced_count: u64,
}

struct CacheEntry {
    result: Arc<LayoutResult>,
    created_at: Instant,
    /// Access tick; atomic so readers can touch it under the read lock
    last_access: AtomicU64,
}

type FlightOutcome = Result<Arc<LayoutResult>, LayoutError>;

/// One in-progress computation that waiters block on
#[derive(Default)]
struct Flight {
    outcome: Mutex<Option<FlightOutcome>>,
    done: Condvar,
}

impl Flight {
    fn complete(&self, outcome: FlightOutcome) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.done.notify_all();
    }

    fn wait(&self) -> FlightOutcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self.done.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Completes the flight even if the compute function unwinds
struct FlightGuard<'a> {
    cache: &'a LayoutCache,
    key: LayoutKey,
    flight: Arc<Flight>,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(mut self, outcome: FlightOutcome) {
        self.finished = true;
        self.flight.complete(outcome);
        self.cache.land(&self.key, &self.flight);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let error = LayoutError::CacheComputeFailed {
            key: self.key.to_string(),
            source: Box::new(LayoutError::ComputeAborted(
                "compute function panicked".to_string(),
            )),
        };
        self.cache
            .logger
            .error(&format!("layout {} aborted before completing", self.key.short()));
        self.flight.complete(Err(error));
        self.cache.land(&self.key, &self.flight);
    }
}

/// Bounded, TTL-aware, single-flight layout cache
///
/// Owned by whatever orchestrates rendering and shared by reference (or
/// `Arc`) with its workers.
pub struct LayoutCache {
    capacity: usize,
    ttl: Option<Duration>,
    logger: SharedLogger,
    entries: RwLock<HashMap<LayoutKey, CacheEntry>>,
    in_flight: Mutex<HashMap<LayoutKey, Arc<Flight>>>,
    ticks: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
    coalesced: AtomicU64,
}

impl LayoutCache {
    pub const DEFAULT_CAPACITY: usize = 64;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

    /// Creates a cache holding at most `capacity` layouts (minimum one)
    ///
    /// With `ttl` of `None` entries never expire.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            logger: null_logger(),
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            ticks: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<LayoutKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<LayoutKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<LayoutKey, Arc<Flight>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(entry.created_at) >= ttl,
            None => false,
        }
    }

    /// Live entry lookup without touching the hit/miss counters
    fn lookup(&self, key: &LayoutKey) -> Option<Arc<LayoutResult>> {
        let entries = self.read();
        let entry = entries.get(key)?;
        if self.is_expired(entry, Instant::now()) {
            return None;
        }
        entry.last_access.store(self.tick(), Ordering::Relaxed);
        Some(Arc::clone(&entry.result))
    }

    /// Returns the cached layout for `key`, if present and not expired
    pub fn get(&self, key: &LayoutKey) -> Option<Arc<LayoutResult>> {
        match self.lookup(key) {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.logger.debug(&format!("cache hit {}", key.short()));
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.logger.debug(&format!("cache miss {}", key.short()));
                None
            }
        }
    }

    /// Stores a layout, evicting to stay within capacity
    pub fn put(&self, key: LayoutKey, result: LayoutResult) -> Arc<LayoutResult> {
        let result = Arc::new(result);
        self.insert(key, Arc::clone(&result));
        result
    }

    fn insert(&self, key: LayoutKey, result: Arc<LayoutResult>) {
        let now = Instant::now();
        let entry = CacheEntry {
            result,
            created_at: now,
            last_access: AtomicU64::new(self.tick()),
        };

        let mut entries = self.write();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let before = entries.len();
            entries.retain(|_, entry| !self.is_expired(entry, now));
            let swept = before - entries.len();
            if swept > 0 {
                self.expired.fetch_add(swept as u64, Ordering::Relaxed);
                self.logger.debug(&format!("swept {} expired layouts", swept));
            }

            while entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
                    .map(|(key, _)| *key);
                let Some(oldest) = oldest else { break };
                entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                self.logger.debug(&format!("evicted layout {}", oldest.short()));
            }
        }
        entries.insert(key, entry);
    }

    /// Returns the cached layout or computes it once for all concurrent callers
    ///
    /// Only one `compute` runs per key at a time. Callers arriving while it
    /// runs wait and receive the same layout, or the same
    /// [`LayoutError::CacheComputeFailed`]. Failures are not cached.
    pub fn get_or_compute<F>(&self, key: LayoutKey, compute: F) -> Result<Arc<LayoutResult>, LayoutError>
    where
        F: FnOnce() -> Result<LayoutResult, LayoutError>,
    {
        if let Some(result) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            self.logger.debug(&format!("cache hit {}", key.short()));
            return Ok(result);
        }

        let (flight, leader) = {
            let mut flights = self.flights();
            match flights.get(&key) {
                Some(flight) => (Arc::clone(flight), false),
                None => {
                    // A leader may have landed between the miss and taking the lock
                    if let Some(result) = self.lookup(&key) {
                        self.coalesced.fetch_add(1, Ordering::Relaxed);
                        return Ok(result);
                    }
                    let flight = Arc::new(Flight::default());
                    flights.insert(key, Arc::clone(&flight));
                    (flight, true)
                }
            }
        };

        if !leader {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
            self.logger
                .debug(&format!("waiting on in-flight layout {}", key.short()));
            return flight.wait();
        }

        // Only the caller that computes counts as a miss
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.logger.debug(&format!("cache miss {}", key.short()));

        let guard = FlightGuard {
            cache: self,
            key,
            flight,
            finished: false,
        };

        match compute() {
            Ok(layout) => {
                let result = Arc::new(layout);
                self.insert(key, Arc::clone(&result));
                guard.finish(Ok(Arc::clone(&result)));
                Ok(result)
            }
            Err(source) => {
                self.logger
                    .error(&format!("layout {} failed: {}", key.short(), source));
                let error = LayoutError::CacheComputeFailed {
                    key: key.to_string(),
                    source: Box::new(source),
                };
                guard.finish(Err(error.clone()));
                Err(error)
            }
        }
    }

    /// Removes a finished flight so later callers go through the cache
    fn land(&self, key: &LayoutKey, flight: &Arc<Flight>) {
        let mut flights = self.flights();
        if flights.get(key).is_some_and(|current| Arc::ptr_eq(current, flight)) {
            flights.remove(key);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.len(),
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            expired_count: self.expired.load(Ordering::Relaxed),
            coalesced_count: self.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Number of stored entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry; returns how many were dropped
    pub fn clear(&self) -> usize {
        let mut entries = self.write();
        let count = entries.len();
        entries.clear();
        count
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Some(Self::DEFAULT_TTL))
    }
}

impl std::fmt::Debug for LayoutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GridConfig, LayoutStatistics, TaskInterval};
    use crate::logging::testing::MemoryLogger;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn key(n: u32) -> LayoutKey {
        let tasks = vec![TaskInterval::new("t", day(1), day(n)).unwrap()];
        LayoutKey::compute(&tasks, &GridConfig::new(day(1), day(31)))
    }

    fn layout(lanes: usize) -> LayoutResult {
        LayoutResult {
            task_bars: Vec::new(),
            statistics: LayoutStatistics {
                lane_count: lanes,
                ..LayoutStatistics::default()
            },
            dropped: Vec::new(),
        }
    }

    #[test]
    fn get_after_put_hits() {
        let cache = LayoutCache::new(4, None);
        assert!(cache.get(&key(1)).is_none());

        cache.put(key(1), layout(2));
        let hit = cache.get(&key(1)).unwrap();

        assert_eq!(hit.statistics.lane_count, 2);
        let stats = cache.stats();
        assert_eq!((stats.entry_count, stats.hit_count, stats.miss_count), (1, 1, 1));
    }

    #[test]
    fn get_or_compute_runs_once() {
        let cache = LayoutCache::new(4, None);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(layout(3))
        };

        let first = cache.get_or_compute(key(1), compute).unwrap();
        let second = cache.get_or_compute(key(1), compute).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!((stats.hit_count, stats.miss_count), (1, 1));
    }

    #[test]
    fn evicts_least_recently_accessed() {
        let cache = LayoutCache::new(3, None);
        cache.put(key(1), layout(1));
        cache.put(key(2), layout(2));
        cache.put(key(3), layout(3));
        // Touch 1 so 2 becomes the oldest
        cache.get(&key(1));

        cache.put(key(4), layout(4));

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(3)).is_some());
        assert!(cache.get(&key(4)).is_some());
        assert_eq!(cache.stats().eviction_count, 1);
    }

    #[test]
    fn replacing_a_key_does_not_evict() {
        let cache = LayoutCache::new(2, None);
        cache.put(key(1), layout(1));
        cache.put(key(2), layout(2));

        cache.put(key(1), layout(9));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().eviction_count, 0);
        assert_eq!(cache.get(&key(1)).unwrap().statistics.lane_count, 9);
    }

    #[test]
    fn expired_entries_read_as_absent_and_are_swept() {
        let cache = LayoutCache::new(2, Some(Duration::from_millis(20)));
        cache.put(key(1), layout(1));
        cache.put(key(2), layout(2));

        thread::sleep(Duration::from_millis(50));

        assert!(cache.get(&key(1)).is_none());
        assert_eq!(cache.len(), 2);

        cache.put(key(3), layout(3));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.expired_count, 2);
        assert_eq!(stats.eviction_count, 0);
    }

    #[test]
    fn expired_entry_is_recomputed() {
        let cache = LayoutCache::new(2, Some(Duration::from_millis(20)));
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(layout(1))
        };

        cache.get_or_compute(key(1), compute).unwrap();
        thread::sleep(Duration::from_millis(50));
        cache.get_or_compute(key(1), compute).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failures_are_reported_and_not_cached() {
        let logger = Arc::new(MemoryLogger::default());
        let cache = LayoutCache::new(2, None).with_logger(logger.clone());

        let err = cache
            .get_or_compute(key(1), || Err(LayoutError::InvalidGrid("broken".to_string())))
            .unwrap_err();

        assert!(matches!(err, LayoutError::CacheComputeFailed { .. }));
        assert!(err.to_string().contains("broken"));
        assert!(cache.is_empty());
        assert!(logger.contains("error: layout"));

        let retried = cache.get_or_compute(key(1), || Ok(layout(5))).unwrap();
        assert_eq!(retried.statistics.lane_count, 5);
    }

    #[test]
    fn panicking_compute_releases_waiters() {
        let cache = LayoutCache::new(2, None);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_compute(key(1), || panic!("boom"))
        }));
        assert!(outcome.is_err());

        // The key is not stuck in flight
        let result = cache.get_or_compute(key(1), || Ok(layout(1))).unwrap();
        assert_eq!(result.statistics.lane_count, 1);
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        const CALLERS: usize = 8;
        let cache = Arc::new(LayoutCache::new(4, None));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_compute(key(7), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok(layout(7))
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.hit_count + stats.coalesced_count, (CALLERS - 1) as u64);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn concurrent_failure_reaches_every_waiter() {
        const CALLERS: usize = 4;
        let cache = Arc::new(LayoutCache::new(4, None));
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_compute(key(3), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Err(LayoutError::InvalidGrid("nope".to_string()))
                    })
                })
            })
            .collect();

        let errors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap_err()).collect();

        // Late arrivals after the failure landed may retry
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert!(errors.iter().all(|e| matches!(e, LayoutError::CacheComputeFailed { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = LayoutCache::default();
        cache.put(key(1), layout(1));
        cache.put(key(2), layout(2));

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), LayoutCache::DEFAULT_CAPACITY);
    }
}
