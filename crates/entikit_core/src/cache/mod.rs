//! Namespaced key/value cache with per-entry TTL.
//!
//! The cache memoizes derived values (such as entity statistics) under a
//! `(namespace, key)` pair. It tracks no dependencies: whoever changes the
//! underlying data deletes the affected keys.
//!
//! # Thread Safety
//!
//! `Cache` is `Send + Sync`. Lookups take a shared lock; stores take an
//! exclusive lock for a single map insert. Producers passed to
//! [`Cache::remember`] run without any lock held, so two threads missing the
//! same key may both compute it; the last store wins.

mod entry;
mod stats;

pub use entry::CacheKey;
pub use stats::{CacheStats, CacheStatsSnapshot};

use crate::clock::Clock;
use entry::CacheEntry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// A TTL cache shared across entity types.
///
/// # Example
///
/// ```rust
/// use entikit_core::{Cache, ManualClock};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::at_date(2024, 1, 1).unwrap());
/// let cache = Cache::new(clock.clone());
///
/// let value: Result<u32, ()> = cache.remember("todos", "count", Duration::from_secs(60), || Ok(3));
/// assert_eq!(value, Ok(3));
/// assert_eq!(cache.get::<u32>("todos", "count"), Some(3));
///
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(cache.get::<u32>("todos", "count"), None);
/// ```
pub struct Cache {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    stats: CacheStats,
}

impl Cache {
    /// Creates an empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
            stats: CacheStats::new(),
        }
    }

    /// Returns the cached value if present, unexpired and of type `T`.
    ///
    /// An expired entry is dropped on the way out.
    pub fn get<T>(&self, namespace: &str, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cache_key = CacheKey::new(namespace, key);
        let now = self.clock.now();

        let expired = {
            let entries = self.entries.read();
            match entries.get(&cache_key) {
                None => false,
                Some(entry) if entry.is_live(now) => {
                    if let Some(value) = entry.downcast::<T>() {
                        self.stats.record_hit();
                        trace!(key = %cache_key, "cache hit");
                        return Some(value);
                    }
                    false
                }
                Some(_) => true,
            }
        };

        if expired {
            let mut entries = self.entries.write();
            // Another writer may have refreshed the entry in between.
            if entries.get(&cache_key).is_some_and(|e| !e.is_live(now)) {
                entries.remove(&cache_key);
                self.stats.record_evictions(1);
            }
        }

        self.stats.record_miss();
        trace!(key = %cache_key, "cache miss");
        None
    }

    /// Stores `value`, replacing any previous entry.
    ///
    /// A zero `ttl` keeps the value until it is deleted.
    pub fn set<T>(&self, namespace: &str, key: &str, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.write().insert(CacheKey::new(namespace, key), entry);
        self.stats.record_store();
    }

    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// The producer is called at most once per call and only on a miss. If
    /// it fails, its error is returned and nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns whatever error the producer returns.
    pub fn remember<T, E, F>(
        &self,
        namespace: &str,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get::<T>(namespace, key) {
            return Ok(value);
        }

        debug!(namespace, key, "computing cached value");
        let value = producer()?;
        self.set(namespace, key, value.clone(), ttl);
        Ok(value)
    }

    /// Removes an entry. Returns `false` if there was none.
    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        let removed = self
            .entries
            .write()
            .remove(&CacheKey::new(namespace, key))
            .is_some();
        if removed {
            debug!(namespace, key, "cache entry deleted");
        }
        removed
    }

    /// Removes every entry of a namespace and returns how many were removed.
    pub fn flush_namespace(&self, namespace: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|k, _| k.namespace() != namespace);
        before - entries.len()
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        let purged = before - entries.len();
        self.stats.record_evictions(purged as u64);
        purged
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the hit/miss counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("clock", &self.clock)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> (Arc<ManualClock>, Cache) {
        let clock = Arc::new(ManualClock::at_date(2024, 5, 1).unwrap());
        let cache = Cache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn get_missing_is_none() {
        let (_, cache) = cache();
        assert_eq!(cache.get::<u32>("ns", "k"), None);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn set_then_get() {
        let (_, cache) = cache();
        cache.set("ns", "k", "value".to_string(), Duration::from_secs(5));
        assert_eq!(cache.get::<String>("ns", "k").as_deref(), Some("value"));
        assert_eq!(cache.stats().hits(), 1);
    }

    #[test]
    fn wrong_type_is_a_miss() {
        let (_, cache) = cache();
        cache.set("ns", "k", 1_u8, Duration::ZERO);
        assert_eq!(cache.get::<u16>("ns", "k"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn namespaces_are_separate() {
        let (_, cache) = cache();
        cache.set("a", "k", 1_u32, Duration::ZERO);
        cache.set("b", "k", 2_u32, Duration::ZERO);
        assert_eq!(cache.get::<u32>("a", "k"), Some(1));
        assert_eq!(cache.get::<u32>("b", "k"), Some(2));
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let (clock, cache) = cache();
        cache.set("ns", "k", 1_u32, Duration::from_secs(10));
        clock.advance(Duration::from_secs(10));

        assert_eq!(cache.get::<u32>("ns", "k"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn zero_ttl_survives_time() {
        let (clock, cache) = cache();
        cache.set("ns", "k", 1_u32, Duration::ZERO);
        clock.advance(Duration::from_secs(365 * 86_400));
        assert_eq!(cache.get::<u32>("ns", "k"), Some(1));
    }

    #[test]
    fn remember_calls_producer_once_until_expiry() {
        let (clock, cache) = cache();
        let calls = AtomicUsize::new(0);
        let produce = || -> Result<usize, ()> { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) };

        let ttl = Duration::from_secs(30);
        assert_eq!(cache.remember("ns", "k", ttl, produce), Ok(1));
        assert_eq!(cache.remember("ns", "k", ttl, produce), Ok(1));
        clock.advance(Duration::from_secs(29));
        assert_eq!(cache.remember("ns", "k", ttl, produce), Ok(1));
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.remember("ns", "k", ttl, produce), Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remember_failure_stores_nothing() {
        let (_, cache) = cache();
        let result: Result<u32, &str> =
            cache.remember("ns", "k", Duration::ZERO, || Err("boom"));
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty());

        let result: Result<u32, &str> = cache.remember("ns", "k", Duration::ZERO, || Ok(4));
        assert_eq!(result, Ok(4));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_, cache) = cache();
        cache.set("ns", "k", 1_u32, Duration::ZERO);
        assert!(cache.delete("ns", "k"));
        assert!(!cache.delete("ns", "k"));
        assert_eq!(cache.get::<u32>("ns", "k"), None);
    }

    #[test]
    fn flush_namespace_leaves_others() {
        let (_, cache) = cache();
        cache.set("a", "1", 1_u32, Duration::ZERO);
        cache.set("a", "2", 2_u32, Duration::ZERO);
        cache.set("b", "1", 3_u32, Duration::ZERO);

        assert_eq!(cache.flush_namespace("a"), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u32>("b", "1"), Some(3));
    }

    #[test]
    fn purge_expired_drops_only_dead_entries() {
        let (clock, cache) = cache();
        cache.set("ns", "short", 1_u32, Duration::from_secs(1));
        cache.set("ns", "long", 2_u32, Duration::from_secs(100));
        cache.set("ns", "forever", 3_u32, Duration::ZERO);
        clock.advance(Duration::from_secs(5));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_remember() {
        use std::thread;

        let clock = Arc::new(ManualClock::at_date(2024, 5, 1).unwrap());
        let cache = Arc::new(Cache::new(clock));
        let mut handles = vec![];

        for i in 0..8_u32 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                let v: Result<u32, ()> =
                    cache.remember("ns", "shared", Duration::ZERO, || Ok(i));
                v.unwrap()
            }));
        }
        for handle in handles {
            let v = handle.join().unwrap();
            assert!(v < 8);
        }
        assert!(cache.get::<u32>("ns", "shared").is_some());
        assert_eq!(cache.len(), 1);
    }
}
