//! Domain layer - search model, cache and admission abstractions

pub mod cache;
pub mod error;
pub mod geo;
pub mod rate_limit;
pub mod search;

pub use cache::{CacheEntry, CacheEntrySummary, CacheKey, CacheStats, SearchCache};
pub use error::DomainError;
pub use geo::{haversine_distance, DistanceAnnotator, DistanceUnit, GeoPoint};
pub use rate_limit::{Admission, AdmissionGate, GateStats, RateLimitConfig, RateLimitStrategy};
pub use search::{
    AnnotatedResult, CandidateFilters, CandidateSource, Listing, NormalizedQuery, QueryNormalizer,
    ResultKind, SearchQuery, UserLocation,
};
