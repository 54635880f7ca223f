//! In-memory LRU result cache with per-entry TTL

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::cache::{CacheEntry, CacheEntrySummary, CacheKey, CacheStats, SearchCache};
use crate::domain::search::AnnotatedResult;
use crate::domain::DomainError;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: usize,
    /// TTL applied by callers that do not choose their own
    pub default_ttl: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            default_ttl: Duration::from_secs(300), // 5 minutes
        }
    }
}

impl InMemoryCacheConfig {
    /// Sets the maximum number of entries
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Sets the default TTL
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    tick: u64,
}

/// Entry map plus a recency index ordered by access tick
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Slot>,
    recency: BTreeMap<u64, CacheKey>,
    next_tick: u64,
    /// Sum of `approx_bytes` over stored entries
    bytes: usize,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn insert(&mut self, entry: CacheEntry) {
        let tick = self.tick();
        self.bytes += entry.approx_bytes;
        self.recency.insert(tick, entry.key.clone());
        self.entries.insert(entry.key.clone(), Slot { entry, tick });
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.tick);
        self.bytes = self.bytes.saturating_sub(slot.entry.approx_bytes);
        Some(slot.entry)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.bytes = 0;
    }

    fn remove_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }

        expired.len()
    }

    /// Removes the least recently accessed entry
    fn remove_oldest(&mut self) -> Option<CacheEntry> {
        while let Some((_, key)) = self.recency.pop_first() {
            // A recency record without an entry is stale bookkeeping; skip it
            if let Some(slot) = self.entries.remove(&key) {
                self.bytes = self.bytes.saturating_sub(slot.entry.approx_bytes);
                return Some(slot.entry);
            }
        }

        None
    }

    /// Rebuilds the recency index and byte total from the entry map
    fn repair(&mut self) {
        self.bytes = self
            .entries
            .values()
            .map(|slot| slot.entry.approx_bytes)
            .sum();
        self.recency = self
            .entries
            .iter()
            .map(|(key, slot)| (slot.tick, key.clone()))
            .collect();
        self.next_tick = self.recency.keys().next_back().copied().unwrap_or(0);
    }
}

/// Thread-safe in-memory result cache
///
/// Features:
/// - TTL measured from creation, checked lazily on lookup
/// - Exact LRU eviction once capacity is reached, expired entries first
/// - Hit/miss/eviction counters readable without the entry lock
/// - Recovers from a poisoned lock by rebuilding its index
#[derive(Debug)]
pub struct InMemoryCache {
    state: Mutex<CacheState>,
    config: InMemoryCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl InMemoryCache {
    /// Creates a new in-memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new in-memory cache with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Search cache lock was poisoned, rebuilding index");
                let mut guard = poisoned.into_inner();
                guard.repair();
                self.state.clear_poison();
                guard
            }
        }
    }

    pub(crate) fn lookup_at(&self, key: &CacheKey, now: Instant) -> Option<CacheEntry> {
        let mut state = self.lock();

        let expired = match state.entries.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(slot) => slot.entry.is_expired_at(now),
        };

        if expired {
            state.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(fingerprint = %key, "Cache entry expired");
            return None;
        }

        let tick = state.tick();
        let slot = state.entries.get_mut(key)?;
        let old_tick = std::mem::replace(&mut slot.tick, tick);
        slot.entry.last_accessed = now;
        slot.entry.hit_count += 1;
        let snapshot = slot.entry.clone();

        state.recency.remove(&old_tick);
        state.recency.insert(tick, key.clone());
        self.hits.fetch_add(1, Ordering::Relaxed);

        Some(snapshot)
    }

    pub(crate) fn insert_at(
        &self,
        key: CacheKey,
        results: Arc<Vec<AnnotatedResult>>,
        ttl: Duration,
        now: Instant,
    ) {
        let capacity = self.config.max_capacity;

        if capacity == 0 {
            return;
        }

        // Sized before locking; serialization cost stays off the lock
        let entry = CacheEntry::new(key.clone(), results, ttl, now);

        let mut state = self.lock();

        if state.remove(&key).is_none() && state.entries.len() >= capacity {
            let expired = state.remove_expired(now);
            let mut evicted = expired as u64;

            while state.entries.len() >= capacity {
                match state.remove_oldest() {
                    Some(entry) => {
                        debug!(fingerprint = %entry.key, "Evicted least recently used entry");
                        evicted += 1;
                    }
                    None => break,
                }
            }

            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }

        state.insert(entry);
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let removed = self.lock().remove_expired(now);
        self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub(crate) fn entries_at(&self, now: Instant) -> Vec<CacheEntrySummary> {
        let state = self.lock();

        state
            .recency
            .values()
            .rev()
            .filter_map(|key| state.entries.get(key))
            .filter(|slot| !slot.entry.is_expired_at(now))
            .map(|slot| slot.entry.summary_at(now))
            .collect()
    }

    fn snapshot_stats(&self) -> CacheStats {
        let (entries, approx_bytes) = {
            let state = self.lock();
            (state.entries.len(), state.bytes)
        };

        CacheStats {
            entries,
            capacity: self.config.max_capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            approx_bytes,
        }
    }

    fn reset(&self) {
        self.lock().clear();

        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }

    fn remove_by_fingerprint(&self, fingerprint: &str) -> bool {
        let mut state = self.lock();

        let key = state
            .entries
            .keys()
            .find(|key| key.fingerprint() == fingerprint)
            .cloned();

        match key {
            Some(key) => state.remove(&key).is_some(),
            None => false,
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchCache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, DomainError> {
        Ok(self.lookup_at(key, Instant::now()))
    }

    async fn put(
        &self,
        key: CacheKey,
        results: Arc<Vec<AnnotatedResult>>,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        self.insert_at(key, results, ttl, Instant::now());
        Ok(())
    }

    async fn len(&self) -> Result<usize, DomainError> {
        Ok(self.lock().entries.len())
    }

    async fn stats(&self) -> Result<CacheStats, DomainError> {
        Ok(self.snapshot_stats())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.reset();
        Ok(())
    }

    async fn invalidate(&self, fingerprint: &str) -> Result<bool, DomainError> {
        Ok(self.remove_by_fingerprint(fingerprint))
    }

    async fn purge_expired(&self) -> Result<usize, DomainError> {
        Ok(self.purge_expired_at(Instant::now()))
    }

    async fn entries(&self) -> Result<Vec<CacheEntrySummary>, DomainError> {
        Ok(self.entries_at(Instant::now()))
    }

    fn cache_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::search::{Listing, ResultKind};

    const TTL: Duration = Duration::from_secs(60);

    fn key(name: &str) -> CacheKey {
        CacheKey::from_canonical(name)
    }

    fn results(id: &str) -> Arc<Vec<AnnotatedResult>> {
        Arc::new(vec![AnnotatedResult::new(
            Listing::new(id, ResultKind::Service, format!("Listing {}", id)),
            Some(1.25),
        )])
    }

    fn cache_with_capacity(capacity: usize) -> InMemoryCache {
        InMemoryCache::with_config(InMemoryCacheConfig::default().with_max_capacity(capacity))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = InMemoryCache::new();

        cache.put(key("a"), results("1"), TTL).await.unwrap();

        let entry = cache.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(entry.results, results("1"));
        assert_eq!(entry.hit_count, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = InMemoryCache::new();

        assert!(cache.get(&key("missing")).await.unwrap().is_none());

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let cache = cache_with_capacity(1);

        cache.put(key("a"), results("1"), TTL).await.unwrap();
        cache.put(key("a"), results("2"), TTL).await.unwrap();

        let entry = cache.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(entry.results[0].record.id, "2");

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_entry_absent_once_ttl_elapses() {
        let cache = InMemoryCache::new();
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);

        cache.insert_at(key("a"), results("1"), ttl, t0);

        assert!(cache.lookup_at(&key("a"), t0 + Duration::from_secs(9)).is_some());
        assert!(cache.lookup_at(&key("a"), t0 + ttl).is_none());

        let stats = cache.snapshot_stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_hits_do_not_extend_ttl() {
        let cache = InMemoryCache::new();
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);

        cache.insert_at(key("a"), results("1"), ttl, t0);

        for second in 1..10 {
            assert!(cache.lookup_at(&key("a"), t0 + Duration::from_secs(second)).is_some());
        }

        assert!(cache.lookup_at(&key("a"), t0 + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let cache = cache_with_capacity(3);
        let t0 = Instant::now();

        for i in 0..10 {
            cache.insert_at(key(&format!("k{}", i)), results("1"), TTL, t0);
            assert!(cache.snapshot_stats().entries <= 3);
        }

        let stats = cache.snapshot_stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.evictions, 7);
    }

    #[test]
    fn test_least_recently_accessed_entry_is_evicted() {
        let cache = cache_with_capacity(3);
        let t0 = Instant::now();

        cache.insert_at(key("a"), results("a"), TTL, t0);
        cache.insert_at(key("b"), results("b"), TTL, t0);
        cache.insert_at(key("c"), results("c"), TTL, t0);

        // Touch "a" so "b" becomes the oldest
        assert!(cache.lookup_at(&key("a"), t0).is_some());

        cache.insert_at(key("d"), results("d"), TTL, t0);

        assert!(cache.lookup_at(&key("b"), t0).is_none());
        assert!(cache.lookup_at(&key("a"), t0).is_some());
        assert!(cache.lookup_at(&key("c"), t0).is_some());
        assert!(cache.lookup_at(&key("d"), t0).is_some());
    }

    #[test]
    fn test_expired_entries_are_evicted_before_live_ones() {
        let cache = cache_with_capacity(3);
        let t0 = Instant::now();

        cache.insert_at(key("old"), results("1"), TTL, t0);
        cache.insert_at(key("short"), results("2"), Duration::from_secs(1), t0);
        cache.insert_at(key("live"), results("3"), TTL, t0);

        let later = t0 + Duration::from_secs(5);
        cache.insert_at(key("new"), results("4"), TTL, later);

        // "old" is least recently used, but the expired "short" goes first
        assert!(cache.lookup_at(&key("old"), later).is_some());
        assert!(cache.lookup_at(&key("short"), later).is_none());
        assert_eq!(cache.snapshot_stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_clear_empties_and_resets_counters() {
        let cache = InMemoryCache::new();

        cache.put(key("a"), results("1"), TTL).await.unwrap();
        cache.put(key("b"), results("2"), TTL).await.unwrap();
        cache.get(&key("a")).await.unwrap();
        cache.get(&key("zzz")).await.unwrap();

        cache.clear().await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);

        assert!(cache.get(&key("a")).await.unwrap().is_none());
        assert!(cache.get(&key("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_by_fingerprint() {
        let cache = InMemoryCache::new();
        let target = key("a");

        cache.put(target.clone(), results("1"), TTL).await.unwrap();
        cache.put(key("b"), results("2"), TTL).await.unwrap();

        assert!(cache.invalidate(target.fingerprint()).await.unwrap());
        assert!(!cache.invalidate(target.fingerprint()).await.unwrap());

        assert!(cache.get(&target).await.unwrap().is_none());
        assert!(cache.get(&key("b")).await.unwrap().is_some());
    }

    #[test]
    fn test_purge_expired() {
        let cache = InMemoryCache::new();
        let t0 = Instant::now();

        cache.insert_at(key("a"), results("1"), Duration::from_secs(1), t0);
        cache.insert_at(key("b"), results("2"), Duration::from_secs(1), t0);
        cache.insert_at(key("c"), results("3"), TTL, t0);

        assert_eq!(cache.purge_expired_at(t0 + Duration::from_secs(2)), 2);
        assert_eq!(cache.snapshot_stats().entries, 1);
    }

    #[test]
    fn test_entries_are_listed_most_recent_first() {
        let cache = InMemoryCache::new();
        let t0 = Instant::now();

        cache.insert_at(key("a"), results("1"), TTL, t0);
        cache.insert_at(key("b"), results("2"), TTL, t0);
        cache.insert_at(key("gone"), results("3"), Duration::from_secs(1), t0);
        cache.lookup_at(&key("a"), t0);

        let summaries = cache.entries_at(t0 + Duration::from_secs(2));
        let canonical: Vec<&str> = summaries.iter().map(|s| s.canonical.as_str()).collect();

        assert_eq!(canonical, vec!["a", "b"]);
        assert_eq!(summaries[0].hit_count, 1);
    }

    #[test]
    fn test_stats_report_size() {
        let cache = cache_with_capacity(5);

        cache.insert_at(key("a"), results("1"), TTL, Instant::now());

        let stats = cache.snapshot_stats();
        assert_eq!(stats.capacity, 5);
        assert!(stats.approx_bytes > 0);
    }

    #[test]
    fn test_byte_total_follows_inserts_and_removals() {
        let cache = cache_with_capacity(2);
        let t0 = Instant::now();
        let size = |name: &str, id: &str| {
            CacheEntry::new(key(name), results(id), TTL, t0).approx_bytes
        };

        cache.insert_at(key("a"), results("1"), TTL, t0);
        cache.insert_at(key("b"), results("22"), TTL, t0);
        assert_eq!(cache.snapshot_stats().approx_bytes, size("a", "1") + size("b", "22"));

        // Replacing an entry swaps its size rather than adding to it
        cache.insert_at(key("a"), results("333"), TTL, t0);
        assert_eq!(cache.snapshot_stats().approx_bytes, size("a", "333") + size("b", "22"));

        // Eviction of "b" (least recently used)
        cache.insert_at(key("c"), results("1"), TTL, t0);
        assert_eq!(cache.snapshot_stats().approx_bytes, size("a", "333") + size("c", "1"));

        assert!(cache.remove_by_fingerprint(key("a").fingerprint()));
        assert_eq!(cache.snapshot_stats().approx_bytes, size("c", "1"));

        cache.reset();
        assert_eq!(cache.snapshot_stats().approx_bytes, 0);
    }

    #[test]
    fn test_stored_results_are_shared_not_copied() {
        let cache = InMemoryCache::new();
        let shared = results("1");

        cache.insert_at(key("a"), Arc::clone(&shared), TTL, Instant::now());

        let entry = cache.lookup_at(&key("a"), Instant::now()).unwrap();
        assert!(Arc::ptr_eq(&entry.results, &shared));
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let cache = Arc::new(InMemoryCache::new());
        let t0 = Instant::now();
        cache.insert_at(key("a"), results("1"), TTL, t0);

        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the cache lock");
        })
        .join();

        assert!(cache.state.is_poisoned());

        assert!(cache.lookup_at(&key("a"), t0).is_some());
        cache.insert_at(key("b"), results("2"), TTL, t0);
        assert!(cache.lookup_at(&key("b"), t0).is_some());
        assert!(!cache.state.is_poisoned());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = cache_with_capacity(0);

        cache.insert_at(key("a"), results("1"), TTL, Instant::now());

        assert_eq!(cache.snapshot_stats().entries, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_are_not_lost() {
        let cache = Arc::new(cache_with_capacity(1_000));

        let tasks: Vec<_> = (0..200)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .put(key(&format!("k{}", i)), results("1"), TTL)
                        .await
                        .unwrap();
                    cache.get(&key(&format!("k{}", i))).await.unwrap()
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().is_some());
        }

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 200);
        assert_eq!(stats.hits, 200);
    }
}
