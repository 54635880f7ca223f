//! Search and cache admin response bodies

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::cache::CacheStats;
use crate::domain::search::AnnotatedResult;
use crate::infrastructure::services::SearchOutcome;

/// Body of a successful search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Arc<Vec<AnnotatedResult>>,
    pub from_cache: bool,
    /// Identifies the cache entry; usable with `DELETE /cache/entries/{fingerprint}`
    pub fingerprint: String,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            fingerprint: outcome.key.fingerprint().to_string(),
            results: outcome.results,
            from_cache: outcome.from_cache,
        }
    }
}

/// `{ success: true, data }` envelope
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{ success: true, message }` envelope
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Cache statistics as reported over HTTP
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsData {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub timestamp: DateTime<Utc>,
    pub cache_type: &'static str,
    pub capacity: usize,
    pub expirations: u64,
    pub approx_bytes: usize,
    pub hit_rate: f64,
}

impl CacheStatsData {
    pub fn new(stats: CacheStats, cache_type: &'static str, timestamp: DateTime<Utc>) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            entries: stats.entries,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            timestamp,
            cache_type,
            capacity: stats.capacity,
            expirations: stats.expirations,
            approx_bytes: stats.approx_bytes,
        }
    }
}
