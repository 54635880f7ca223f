//! Canonicalization of search requests into cache keys

use std::collections::BTreeSet;

use serde::Serialize;

use super::listing::ResultKind;
use super::query::{SearchQuery, UserLocation};
use super::source::CandidateFilters;
use crate::domain::cache::CacheKey;
use crate::domain::geo::GeoPoint;
use crate::domain::DomainError;

const KEY_NAMESPACE: &str = "search:v1";

/// Highest supported coordinate precision (decimal places)
pub const MAX_COORDINATE_PRECISION: u32 = 6;

/// A search request after canonicalization
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    pub key: CacheKey,
    pub filters: CandidateFilters,
    /// Bucket centre of the user's coordinates
    pub origin: Option<GeoPoint>,
    /// False whenever `origin` is absent
    pub sort_by_distance: bool,
}

/// Coordinates snapped to a grid of `precision` decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct GeoCell {
    lat: i64,
    lng: i64,
    precision: u32,
}

impl GeoCell {
    fn snap(point: GeoPoint, precision: u32) -> Self {
        let factor = 10f64.powi(precision as i32);

        Self {
            lat: (point.latitude() * factor).round() as i64,
            lng: (point.longitude() * factor).round() as i64,
            precision,
        }
    }

    fn centre(&self) -> Result<GeoPoint, DomainError> {
        let factor = 10f64.powi(self.precision as i32);
        GeoPoint::new(self.lat as f64 / factor, self.lng as f64 / factor)
    }
}

/// Serialized form that defines key identity; defaults are omitted
#[derive(Debug, Serialize)]
struct CanonicalQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ResultKind>,
    #[serde(skip_serializing_if = "is_empty_str")]
    term: &'a str,
    #[serde(skip_serializing_if = "is_empty_set")]
    categories: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "is_false")]
    verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cell: Option<GeoCell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "is_false")]
    by_distance: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_empty_str(value: &&str) -> bool {
    value.is_empty()
}

fn is_empty_set(value: &&BTreeSet<String>) -> bool {
    value.is_empty()
}

/// Turns raw search requests into deterministic cache keys
///
/// Pure and I/O free. Text is trimmed, lower-cased and whitespace-collapsed,
/// category sets are sorted and de-duplicated, and coordinates are snapped to
/// a grid so nearby users share an entry.
#[derive(Debug, Clone, Copy)]
pub struct QueryNormalizer {
    precision: u32,
}

impl Default for QueryNormalizer {
    fn default() -> Self {
        Self { precision: 2 }
    }
}

impl QueryNormalizer {
    /// Creates a normalizer snapping coordinates to `precision` decimals
    pub fn new(precision: u32) -> Self {
        Self {
            precision: precision.min(MAX_COORDINATE_PRECISION),
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Computes only the cache key for a query
    pub fn key_for(&self, query: &SearchQuery) -> Result<CacheKey, DomainError> {
        Ok(self.normalize(query)?.key)
    }

    /// Validates and canonicalizes a query
    pub fn normalize(&self, query: &SearchQuery) -> Result<NormalizedQuery, DomainError> {
        let (min_price, max_price) = normalize_price_range(query.min_price, query.max_price)?;
        let term = normalize_text(&query.term);
        let categories: BTreeSet<String> = query
            .categories
            .iter()
            .map(|c| normalize_text(c))
            .filter(|c| !c.is_empty())
            .collect();

        let location = query.location.as_ref();
        let cell = location
            .map(coordinates_of)
            .transpose()?
            .flatten()
            .map(|point| GeoCell::snap(point, self.precision));
        let origin = cell.map(|c| c.centre()).transpose()?;
        let sort_by_distance = query.sort_by_distance && origin.is_some();

        let postal_code = location
            .and_then(|l| l.postal_code.as_deref())
            .map(normalize_text)
            .filter(|s| !s.is_empty());
        let city = location
            .and_then(|l| l.city.as_deref())
            .map(normalize_text)
            .filter(|s| !s.is_empty());
        let state = location
            .and_then(|l| l.state.as_deref())
            .map(normalize_text)
            .filter(|s| !s.is_empty());

        let canonical = CanonicalQuery {
            kind: query.kind,
            term: &term,
            categories: &categories,
            verified: query.verified_only,
            min_price,
            max_price,
            cell,
            postal_code: postal_code.as_deref(),
            city: city.as_deref(),
            state: state.as_deref(),
            by_distance: sort_by_distance,
        };

        let key = CacheKey::from_serializable(KEY_NAMESPACE, &canonical).map_err(|e| {
            DomainError::internal(format!("Failed to serialize cache key: {}", e))
        })?;

        let filters = CandidateFilters {
            term,
            categories: categories.into_iter().collect(),
            verified_only: query.verified_only,
            min_price,
            max_price,
            kind: query.kind,
            postal_code,
            city,
            state,
        };

        Ok(NormalizedQuery {
            key,
            filters,
            origin,
            sort_by_distance,
        })
    }
}

fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn coordinates_of(location: &UserLocation) -> Result<Option<GeoPoint>, DomainError> {
    match (location.latitude, location.longitude) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).map(Some),
        (None, None) => Ok(None),
        _ => Err(DomainError::invalid_query(
            "latitude and longitude must be provided together",
        )),
    }
}

fn normalize_price_range(
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(Option<f64>, Option<f64>), DomainError> {
    let min = min.map(|p| validate_price("minPrice", p)).transpose()?;
    let max = max.map(|p| validate_price("maxPrice", p)).transpose()?;

    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(DomainError::invalid_query(format!(
                "minPrice {} exceeds maxPrice {}",
                lo, hi
            )));
        }
    }

    Ok((min, max))
}

fn validate_price(field: &str, price: f64) -> Result<f64, DomainError> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::invalid_query(format!(
            "{} must be a non-negative number",
            field
        )));
    }

    // Collapse -0.0 so it keys the same as 0.0
    Ok(price + 0.0)
}
