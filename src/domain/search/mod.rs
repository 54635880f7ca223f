//! Search domain - requests, records and the data store seam

mod listing;
mod normalizer;
mod query;
mod source;

pub use listing::{AnnotatedResult, Listing, ResultKind};
pub use normalizer::{NormalizedQuery, QueryNormalizer, MAX_COORDINATE_PRECISION};
pub use query::{SearchQuery, UserLocation};
pub use source::{CandidateFilters, CandidateSource};

#[cfg(test)]
pub use source::MockCandidateSource;
