//! Cached result sets and cache statistics

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::CacheKey;
use crate::domain::search::AnnotatedResult;

/// A fully annotated result set held by the cache
///
/// Only the cache mutates entries; callers receive snapshots whose results
/// are shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub results: Arc<Vec<AnnotatedResult>>,
    pub created_at: Instant,
    pub created_at_utc: DateTime<Utc>,
    pub last_accessed: Instant,
    pub hit_count: u64,
    pub ttl: Duration,
    /// Rough in-memory footprint, fixed at creation
    pub approx_bytes: usize,
}

impl CacheEntry {
    pub fn new(
        key: CacheKey,
        results: Arc<Vec<AnnotatedResult>>,
        ttl: Duration,
        now: Instant,
    ) -> Self {
        let approx_bytes = estimate_bytes(&key, &results);

        Self {
            key,
            results,
            created_at: now,
            created_at_utc: Utc::now(),
            last_accessed: now,
            hit_count: 0,
            ttl,
            approx_bytes,
        }
    }

    /// True once `ttl` has elapsed since creation, regardless of access
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }

    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.created_at))
    }

    pub fn summary_at(&self, now: Instant) -> CacheEntrySummary {
        CacheEntrySummary {
            fingerprint: self.key.fingerprint().to_string(),
            canonical: self.key.canonical().to_string(),
            result_count: self.results.len(),
            hit_count: self.hit_count,
            created_at: self.created_at_utc,
            age_ms: now.saturating_duration_since(self.created_at).as_millis() as u64,
            idle_ms: now.saturating_duration_since(self.last_accessed).as_millis() as u64,
            ttl_remaining_ms: self.ttl_remaining_at(now).as_millis() as u64,
        }
    }
}

/// Serialized result size plus the key strings
fn estimate_bytes(key: &CacheKey, results: &[AnnotatedResult]) -> usize {
    let payload = serde_json::to_vec(results)
        .map(|bytes| bytes.len())
        .unwrap_or(0);

    payload + key.canonical().len() + key.fingerprint().len()
}

/// Introspection view of one entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntrySummary {
    pub fingerprint: String,
    pub canonical: String,
    pub result_count: usize,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
    pub age_ms: u64,
    pub idle_ms: u64,
    pub ttl_remaining_ms: u64,
}

/// Point-in-time cache counters; approximate under concurrent traffic
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub approx_bytes: usize,
}

impl CacheStats {
    /// Fraction of lookups served from cache; 0.0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;

        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
