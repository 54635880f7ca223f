//! Search orchestration - cache in front of a rate-limited data store

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::domain::cache::{CacheEntrySummary, CacheKey, CacheStats, SearchCache};
use crate::domain::geo::{DistanceAnnotator, DistanceUnit};
use crate::domain::rate_limit::{Admission, AdmissionGate, GateStats, RateLimitConfig};
use crate::domain::search::{
    AnnotatedResult, CandidateSource, QueryNormalizer, SearchQuery, MAX_COORDINATE_PRECISION,
};
use crate::domain::DomainError;
use crate::infrastructure::cache::{InMemoryCache, InMemoryCacheConfig};
use crate::infrastructure::observability::{
    record_cache_lookup, record_fetch, record_rate_limited, set_cache_entries,
};
use crate::infrastructure::rate_limit::RateLimiter;

/// Configuration for the search service
#[derive(Debug, Clone)]
pub struct SearchServiceConfig {
    /// Lifetime of a cached result set, measured from creation
    pub cache_ttl: Duration,
    /// Maximum number of cached result sets
    pub max_entries: usize,
    /// Decimal places kept when bucketing user coordinates
    pub coordinate_precision: u32,
    pub distance_unit: DistanceUnit,
    pub rate_limit: RateLimitConfig,
}

impl Default for SearchServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300), // 5 minutes
            max_entries: 1_000,
            coordinate_precision: 2,
            distance_unit: DistanceUnit::Kilometers,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl SearchServiceConfig {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_coordinate_precision(mut self, precision: u32) -> Self {
        self.coordinate_precision = precision;
        self
    }

    pub fn with_distance_unit(mut self, unit: DistanceUnit) -> Self {
        self.distance_unit = unit;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.cache_ttl.is_zero() {
            return Err(DomainError::configuration(
                "cache.ttl_secs must be greater than zero",
            ));
        }

        if self.max_entries == 0 {
            return Err(DomainError::configuration(
                "cache.max_entries must be at least 1",
            ));
        }

        if self.coordinate_precision > MAX_COORDINATE_PRECISION {
            return Err(DomainError::configuration(format!(
                "cache.coordinate_precision must be at most {}",
                MAX_COORDINATE_PRECISION
            )));
        }

        self.rate_limit.validate()
    }
}

/// Result of a successful search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Arc<Vec<AnnotatedResult>>,
    pub from_cache: bool,
    pub key: CacheKey,
}

/// Serves searches from the result cache, falling back to the data store
///
/// The admission gate is consulted only on cache misses. Nothing is locked
/// across the data store fetch, so identical concurrent misses may both
/// fetch; the last `put` wins.
pub struct SearchService {
    cache: Arc<dyn SearchCache>,
    gate: Arc<dyn AdmissionGate>,
    source: Arc<dyn CandidateSource>,
    normalizer: QueryNormalizer,
    annotator: DistanceAnnotator,
    cache_ttl: Duration,
    closed: AtomicBool,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("cache", &self.cache)
            .field("gate", &self.gate)
            .field("normalizer", &self.normalizer)
            .field("annotator", &self.annotator)
            .field("cache_ttl", &self.cache_ttl)
            .field("closed", &self.closed)
            .finish()
    }
}

impl SearchService {
    /// Builds the in-memory cache and rate limiter and wires them to `source`
    pub fn init(
        config: SearchServiceConfig,
        source: Arc<dyn CandidateSource>,
    ) -> Result<Arc<Self>, DomainError> {
        config.validate()?;

        let cache = InMemoryCache::with_config(
            InMemoryCacheConfig::default()
                .with_max_capacity(config.max_entries)
                .with_default_ttl(config.cache_ttl),
        );
        let gate = RateLimiter::new(config.rate_limit.clone());

        info!(
            ttl_secs = config.cache_ttl.as_secs(),
            max_entries = config.max_entries,
            precision = config.coordinate_precision,
            unit = config.distance_unit.as_str(),
            rate_limit_enabled = config.rate_limit.enabled,
            max_requests = config.rate_limit.max_requests,
            window_secs = config.rate_limit.window.as_secs(),
            "Search service initialized"
        );

        Ok(Arc::new(Self::new(
            Arc::new(cache),
            Arc::new(gate),
            source,
            &config,
        )))
    }

    /// Creates a service from explicit components
    pub fn new(
        cache: Arc<dyn SearchCache>,
        gate: Arc<dyn AdmissionGate>,
        source: Arc<dyn CandidateSource>,
        config: &SearchServiceConfig,
    ) -> Self {
        Self {
            cache,
            gate,
            source,
            normalizer: QueryNormalizer::new(config.coordinate_precision),
            annotator: DistanceAnnotator::new(config.distance_unit),
            cache_ttl: config.cache_ttl,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Runs a search on behalf of `caller`
    pub async fn search(
        &self,
        caller: &str,
        query: &SearchQuery,
    ) -> Result<SearchOutcome, DomainError> {
        if self.is_closed() {
            return Err(DomainError::internal("search service is shut down"));
        }

        let normalized = self.normalizer.normalize(query)?;
        let key = normalized.key.clone();

        match self.cache.get(&key).await {
            Ok(Some(entry)) => {
                record_cache_lookup(true);
                debug!(
                    fingerprint = %key,
                    hit_count = entry.hit_count,
                    results = entry.results.len(),
                    "Cache hit"
                );

                return Ok(SearchOutcome {
                    results: entry.results,
                    from_cache: true,
                    key,
                });
            }
            Ok(None) => {
                record_cache_lookup(false);
                debug!(fingerprint = %key, "Cache miss");
            }
            Err(e) => {
                record_cache_lookup(false);
                warn!(fingerprint = %key, error = %e, "Cache lookup failed, treating as miss");
            }
        }

        if let Admission::Denied { retry_after } = self.gate.check(caller).await {
            record_rate_limited();
            info!(
                caller = %caller,
                fingerprint = %key,
                retry_after_ms = retry_after.as_millis() as u64,
                "Search rate limited"
            );
            return Err(DomainError::rate_limited(retry_after));
        }

        let started = Instant::now();
        let records = match self.source.fetch_candidates(&normalized.filters).await {
            Ok(records) => {
                record_fetch(started.elapsed(), true);
                records
            }
            Err(e) => {
                record_fetch(started.elapsed(), false);
                warn!(fingerprint = %key, error = %e, "Candidate fetch failed");

                return Err(match e {
                    DomainError::FetchFailed { .. } => e,
                    other => DomainError::fetch_failed(other.to_string()),
                });
            }
        };

        let results = Arc::new(self.annotator.annotate(
            records,
            normalized.origin,
            normalized.sort_by_distance,
        ));

        debug!(
            fingerprint = %key,
            results = results.len(),
            fetch_ms = started.elapsed().as_millis() as u64,
            "Fetched and annotated results"
        );

        if let Err(e) = self
            .cache
            .put(key.clone(), Arc::clone(&results), self.cache_ttl)
            .await
        {
            warn!(fingerprint = %key, error = %e, "Failed to store results in cache");
        }

        if let Ok(entries) = self.cache.len().await {
            set_cache_entries(entries);
        }

        Ok(SearchOutcome {
            results,
            from_cache: false,
            key,
        })
    }

    pub fn cache_type(&self) -> &'static str {
        self.cache.cache_type()
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, DomainError> {
        let stats = self.cache.stats().await?;
        set_cache_entries(stats.entries);
        Ok(stats)
    }

    /// Drops every cached result set
    pub async fn clear_cache(&self) -> Result<(), DomainError> {
        self.cache.clear().await?;
        set_cache_entries(0);
        info!("Search cache cleared");
        Ok(())
    }

    /// Removes one cached result set by fingerprint
    pub async fn invalidate(&self, fingerprint: &str) -> Result<bool, DomainError> {
        let removed = self.cache.invalidate(fingerprint).await?;

        if removed {
            info!(fingerprint = %fingerprint, "Cache entry invalidated");
        }

        Ok(removed)
    }

    pub async fn cache_entries(&self) -> Result<Vec<CacheEntrySummary>, DomainError> {
        self.cache.entries().await
    }

    pub async fn purge_expired(&self) -> Result<usize, DomainError> {
        let removed = self.cache.purge_expired().await?;
        debug!(removed = removed, "Purged expired cache entries");
        Ok(removed)
    }

    pub async fn gate_stats(&self) -> GateStats {
        self.gate.stats().await
    }

    /// Forgets rate limit accounting for one caller
    pub async fn reset_caller(&self, caller: &str) {
        self.gate.reset(caller).await;
    }

    /// Logs final statistics and releases cache and gate state
    ///
    /// Later searches fail with an internal error. Calling it twice is a no-op.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        match self.cache.stats().await {
            Ok(stats) => info!(
                entries = stats.entries,
                hits = stats.hits,
                misses = stats.misses,
                evictions = stats.evictions,
                hit_rate = stats.hit_rate(),
                "Search service shutting down"
            ),
            Err(e) => warn!(error = %e, "Failed to read cache stats during shutdown"),
        }

        if let Err(e) = self.cache.clear().await {
            warn!(error = %e, "Failed to clear cache during shutdown");
        }

        self.gate.clear().await;
        set_cache_entries(0);
    }
}
