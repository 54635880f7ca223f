//! In-memory candidate source

use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::domain::search::{CandidateFilters, CandidateSource, Listing, ResultKind};
use crate::domain::DomainError;

/// Thread-safe in-memory listing store
///
/// Useful for testing and development. Records are returned ordered by name,
/// capped at `max_results`.
#[derive(Debug)]
pub struct InMemoryCandidateSource {
    listings: RwLock<Vec<Listing>>,
    max_results: usize,
}

impl Default for InMemoryCandidateSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryCandidateSource {
    /// Creates a source pre-populated with listings
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: RwLock::new(listings),
            max_results: 200,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Loads listings from a JSON array file
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read seed file {}: {}",
                path.display(),
                e
            ))
        })?;

        let listings: Vec<Listing> = serde_json::from_str(&content).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to parse seed file {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(path = %path.display(), count = listings.len(), "Loaded seed listings");

        Ok(Self::new(listings))
    }

    /// A small demo data set around downtown Indianapolis
    pub fn sample() -> Self {
        Self::new(vec![
            Listing::new("svc-1", ResultKind::Service, "Downtown Veterinary Clinic")
                .with_categories(&["vet", "pets"])
                .with_coordinates(39.7684, -86.1581)
                .verified(),
            Listing::new("svc-2", ResultKind::Service, "Broad Ripple Vet")
                .with_categories(&["vet"])
                .with_coordinates(39.8712, -86.1420),
            Listing::new("svc-3", ResultKind::Service, "Fountain Square Pet Grooming")
                .with_categories(&["grooming", "pets"])
                .with_coordinates(39.7510, -86.1430)
                .with_price(45.0),
            Listing::new("svc-4", ResultKind::Service, "Mobile Vet Visits")
                .with_categories(&["vet"])
                .with_price(80.0)
                .verified(),
            Listing::new("prd-1", ResultKind::Product, "Orthopedic Dog Bed")
                .with_categories(&["pets", "bedding"])
                .with_coordinates(39.7900, -86.1600)
                .with_price(120.0),
            Listing::new("prd-2", ResultKind::Product, "Stainless Food Bowl")
                .with_categories(&["pets"])
                .with_price(12.5),
        ])
    }

    /// Adds a listing
    pub fn insert(&self, listing: Listing) -> Result<(), DomainError> {
        let mut listings = self.listings.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        listings.push(listing);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listings.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn eq_ci(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.trim().to_lowercase() == expected)
}

/// Filters arrive normalized (lower-cased, trimmed)
fn matches(listing: &Listing, filters: &CandidateFilters) -> bool {
    if let Some(kind) = filters.kind {
        if listing.kind != kind {
            return false;
        }
    }

    if filters.verified_only && !listing.verified {
        return false;
    }

    if !filters.term.is_empty() {
        let term = filters.term.as_str();
        let hit = contains_ci(&listing.name, term)
            || listing
                .description
                .as_deref()
                .is_some_and(|d| contains_ci(d, term))
            || listing.categories.iter().any(|c| contains_ci(c, term));

        if !hit {
            return false;
        }
    }

    if !filters.categories.is_empty() {
        let any = listing
            .categories
            .iter()
            .any(|c| filters.categories.contains(&c.trim().to_lowercase()));

        if !any {
            return false;
        }
    }

    if filters.min_price.is_some() || filters.max_price.is_some() {
        let Some(price) = listing.price else {
            return false;
        };

        if filters.min_price.is_some_and(|min| price < min)
            || filters.max_price.is_some_and(|max| price > max)
        {
            return false;
        }
    }

    if let Some(postal_code) = &filters.postal_code {
        if !eq_ci(listing.postal_code.as_deref(), postal_code) {
            return false;
        }
    }

    if let Some(city) = &filters.city {
        if !eq_ci(listing.city.as_deref(), city) {
            return false;
        }
    }

    if let Some(state) = &filters.state {
        if !eq_ci(listing.state.as_deref(), state) {
            return false;
        }
    }

    true
}

#[async_trait]
impl CandidateSource for InMemoryCandidateSource {
    async fn fetch_candidates(
        &self,
        filters: &CandidateFilters,
    ) -> Result<Vec<Listing>, DomainError> {
        let listings = self.listings.read().map_err(|e| {
            DomainError::fetch_failed(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut found: Vec<Listing> = listings
            .iter()
            .filter(|listing| matches(listing, filters))
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        found.truncate(self.max_results);

        Ok(found)
    }
}
