//! Time-windowed memoization
//!
//! [`TtlCache`] remembers the result of an expensive async computation per
//! key for a caller-chosen freshness window. Each key has its own async
//! mutex that is held across the computation, so callers racing past the
//! same stale key run `compute` exactly once: the first caller recomputes,
//! the rest wait and then read the fresh value.
//!
//! Entries are never expired proactively. A cache built with
//! [`TtlCache::new`] grows with the number of distinct keys;
//! [`TtlCache::bounded`] drops the oldest inserted key once full.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use bts_detect::{DetectionStatus, Detector};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// A computed value and when it was computed
#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    computed_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self) -> bool {
        self.computed_at.elapsed() < self.ttl
    }
}

type Slot<V> = Arc<tokio::sync::Mutex<Option<CacheEntry<V>>>>;

#[derive(Debug)]
struct Slots<K, V> {
    map: HashMap<K, Slot<V>>,
    /// Insertion order, oldest first
    order: VecDeque<K>,
}

/// Per-key memoizer with independent expiry
#[derive(Debug)]
pub struct TtlCache<K, V> {
    slots: Mutex<Slots<K, V>>,
    capacity: Option<usize>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: None,
        }
    }

    /// Create a cache holding at most `capacity` keys
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::new()
        }
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.slots.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the cached value for `key`
    pub fn invalidate(&self, key: &K) {
        let mut slots = self.slots.lock();
        if slots.map.remove(key).is_some() {
            slots.order.retain(|k| k != key);
        }
    }

    /// Drop every cached value
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        slots.map.clear();
        slots.order.clear();
    }

    /// Return the cached value for `key`, or compute and store it
    ///
    /// `compute` runs only when there is no value for `key` or the stored
    /// value is at least `ttl` old.
    pub async fn get_or_compute<F, Fut>(&self, key: K, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref().filter(|e| e.is_fresh()) {
            return cached.value.clone();
        }

        trace!("Cache miss, recomputing");
        let value = compute().await;
        *entry = Some(CacheEntry {
            value: value.clone(),
            computed_at: Instant::now(),
            ttl,
        });
        value
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible computations
    ///
    /// An error is returned to the caller and nothing is stored, so the next
    /// call computes again.
    pub async fn try_get_or_compute<F, Fut, E>(
        &self,
        key: K,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref().filter(|e| e.is_fresh()) {
            return Ok(cached.value.clone());
        }

        let value = compute().await?;
        *entry = Some(CacheEntry {
            value: value.clone(),
            computed_at: Instant::now(),
            ttl,
        });
        Ok(value)
    }

    /// Get or create the slot for `key`, evicting the oldest key if full
    fn slot(&self, key: K) -> Slot<V> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.map.get(&key) {
            return Arc::clone(slot);
        }

        if let Some(capacity) = self.capacity {
            while slots.map.len() >= capacity {
                let Some(oldest) = slots.order.pop_front() else {
                    break;
                };
                slots.map.remove(&oldest);
            }
        }

        let slot: Slot<V> = Arc::default();
        slots.map.insert(key.clone(), Arc::clone(&slot));
        slots.order.push_back(key);
        slot
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Number of probe outcomes kept by [`CachedDetector`]
pub const DETECTION_HISTORY: usize = 10;

/// Detector whose results are reused for a freshness window
///
/// Every probe that actually runs is also kept in a short history, newest
/// last. Cache hits are not recorded.
#[derive(Debug)]
pub struct CachedDetector<D> {
    inner: D,
    ttl: Duration,
    cache: TtlCache<(), DetectionStatus>,
    history: Mutex<VecDeque<DetectionStatus>>,
}

impl<D: Detector> CachedDetector<D> {
    /// Wrap `inner`, reusing each detection for `ttl`
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: TtlCache::new(),
            history: Mutex::new(VecDeque::with_capacity(DETECTION_HISTORY)),
        }
    }

    /// Wrapped detector
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Forget the cached status so the next call probes again
    pub fn invalidate(&self) {
        self.cache.invalidate(&());
    }

    /// Probe now, replacing the cached status
    pub async fn refresh(&self) -> DetectionStatus {
        self.invalidate();
        self.detect().await
    }

    /// Recent probe outcomes, oldest first
    pub fn history(&self) -> Vec<DetectionStatus> {
        self.history.lock().iter().cloned().collect()
    }

    /// Number of probe outcomes currently kept
    pub fn detection_count(&self) -> usize {
        self.history.lock().len()
    }

    async fn probe(&self) -> DetectionStatus {
        let status = self.inner.detect().await;

        let mut history = self.history.lock();
        if history.len() == DETECTION_HISTORY {
            history.pop_front();
        }
        history.push_back(status.clone());
        trace!("Recorded detection {} of {}", history.len(), DETECTION_HISTORY);

        status
    }
}

impl<D: Detector> Detector for CachedDetector<D> {
    async fn detect(&self) -> DetectionStatus {
        self.cache
            .get_or_compute((), self.ttl, || self.probe())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bts_detect::ReasonCode;

    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_reuses_value_within_window() {
        let cache = TtlCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let compute = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        };

        assert_eq!(cache.get_or_compute("status", TTL, compute).await, 42);
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get_or_compute("status", TTL, compute).await, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_compute("status", TTL, compute).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_expire_independently() {
        let cache = TtlCache::new();

        cache.get_or_compute(("GSM900", 40), TTL, || async { 1 }).await;
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.get_or_compute(("DCS1800", 40), TTL, || async { 2 }).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        // First key is stale, second is still fresh
        assert_eq!(cache.get_or_compute(("GSM900", 40), TTL, || async { 10 }).await, 10);
        assert_eq!(cache.get_or_compute(("DCS1800", 40), TTL, || async { 20 }).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_racing_callers_compute_once() {
        let cache = Arc::new(TtlCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_compute("detect", TTL, move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            "connected"
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), "connected");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new();

        let failed: Result<u32, String> = cache
            .try_get_or_compute("key", TTL, || async { Err("probe failed".to_string()) })
            .await;
        assert_eq!(failed.unwrap_err(), "probe failed");

        let ok: Result<u32, String> = cache.try_get_or_compute("key", TTL, || async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let cached: Result<u32, String> =
            cache.try_get_or_compute("key", TTL, || async { Ok(8) }).await;
        assert_eq!(cached.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = TtlCache::new();
        cache.get_or_compute(1, TTL, || async { "a" }).await;
        cache.get_or_compute(2, TTL, || async { "b" }).await;
        assert_eq!(cache.len(), 2);

        cache.invalidate(&1);
        assert_eq!(cache.get_or_compute(1, TTL, || async { "c" }).await, "c");
        assert_eq!(cache.get_or_compute(2, TTL, || async { "d" }).await, "b");

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_bounded_evicts_oldest() {
        let cache = TtlCache::bounded(2);
        cache.get_or_compute(1, TTL, || async { 10 }).await;
        cache.get_or_compute(2, TTL, || async { 20 }).await;
        cache.get_or_compute(3, TTL, || async { 30 }).await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_or_compute(2, TTL, || async { 0 }).await, 20);
        assert_eq!(cache.get_or_compute(1, TTL, || async { 11 }).await, 11);
    }

    struct CountingDetector {
        calls: AtomicUsize,
    }

    impl Detector for CountingDetector {
        async fn detect(&self) -> DetectionStatus {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DetectionStatus::unavailable(ReasonCode::NotConnected)
        }
    }

    /// Reports a timeout on every third probe so outcomes can be told apart
    struct CyclingDetector {
        calls: AtomicUsize,
    }

    impl Detector for CyclingDetector {
        async fn detect(&self) -> DetectionStatus {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let reason = if call % 3 == 0 {
                ReasonCode::Timeout
            } else {
                ReasonCode::NotConnected
            };
            DetectionStatus::unavailable(reason)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_detector() {
        let detector = CachedDetector::new(
            CountingDetector {
                calls: AtomicUsize::new(0),
            },
            Duration::from_secs(300),
        );

        for _ in 0..5 {
            assert_eq!(detector.detect().await.reason, ReasonCode::NotConnected);
        }
        assert_eq!(detector.inner().calls.load(Ordering::SeqCst), 1);

        detector.refresh().await;
        assert_eq!(detector.inner().calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(300)).await;
        detector.detect().await;
        assert_eq!(detector.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_history_keeps_newest() {
        let detector = CachedDetector::new(
            CyclingDetector {
                calls: AtomicUsize::new(0),
            },
            Duration::from_secs(300),
        );
        assert_eq!(detector.detection_count(), 0);

        // Cache hits are not probes
        detector.detect().await;
        detector.detect().await;
        assert_eq!(detector.detection_count(), 1);

        for _ in 1..12 {
            detector.refresh().await;
        }
        assert_eq!(detector.inner().calls.load(Ordering::SeqCst), 12);
        assert_eq!(detector.detection_count(), DETECTION_HISTORY);

        // Probes 3..=12 remain; every third one timed out
        let reasons: Vec<ReasonCode> = detector.history().iter().map(|s| s.reason).collect();
        let expected: Vec<ReasonCode> = (3..=12)
            .map(|call| {
                if call % 3 == 0 {
                    ReasonCode::Timeout
                } else {
                    ReasonCode::NotConnected
                }
            })
            .collect();
        assert_eq!(reasons, expected);
    }
}
