//! Data store collaborator consulted on cache misses

use async_trait::async_trait;
use serde::Serialize;

#[cfg(test)]
use mockall::automock;

use super::listing::{Listing, ResultKind};
use crate::domain::DomainError;

/// Filters handed to the data store, already canonicalized
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateFilters {
    /// Lower-cased, whitespace-collapsed term; empty matches everything
    pub term: String,
    /// Lower-cased and sorted; a record matches if it carries any of them
    pub categories: Vec<String>,
    pub verified_only: bool,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub kind: Option<ResultKind>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Source of candidate records for a search
///
/// Implementations return records in their own relevance/name order and fail
/// with `DomainError::FetchFailed`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Fetches the records matching the given filters
    async fn fetch_candidates(&self, filters: &CandidateFilters)
        -> Result<Vec<Listing>, DomainError>;
}

