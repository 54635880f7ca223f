//! Result cache trait definition

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheEntry, CacheEntrySummary, CacheKey, CacheStats};
use crate::domain::search::AnnotatedResult;
use crate::domain::DomainError;

/// Cache of annotated search results keyed by normalized query
///
/// Lookups never touch the data store. Expired entries are reported as
/// absent. Errors are backend faults; callers degrade them to a miss.
#[async_trait]
pub trait SearchCache: Send + Sync + std::fmt::Debug {
    /// Returns a live entry and records the access, or `None`
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, DomainError>;

    /// Inserts or replaces an entry, evicting as needed to stay in capacity
    async fn put(
        &self,
        key: CacheKey,
        results: Arc<Vec<AnnotatedResult>>,
        ttl: Duration,
    ) -> Result<(), DomainError>;

    /// Number of stored entries, including not-yet-swept expired ones
    async fn len(&self) -> Result<usize, DomainError>;

    /// Snapshot of the cache counters
    async fn stats(&self) -> Result<CacheStats, DomainError>;

    /// Drops every entry and resets the counters
    async fn clear(&self) -> Result<(), DomainError>;

    /// Removes the entry with the given fingerprint, returning whether it existed
    async fn invalidate(&self, fingerprint: &str) -> Result<bool, DomainError>;

    /// Drops every expired entry, returning how many were removed
    async fn purge_expired(&self) -> Result<usize, DomainError>;

    /// Summaries of live entries, most recently accessed first
    async fn entries(&self) -> Result<Vec<CacheEntrySummary>, DomainError>;

    /// Backend label reported by the stats endpoint
    fn cache_type(&self) -> &'static str;
}
