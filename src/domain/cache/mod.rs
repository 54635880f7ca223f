//! Cache domain - result cache abstraction for search

mod entry;
mod key;
mod repository;

pub use entry::{CacheEntry, CacheEntrySummary, CacheStats};
pub use key::CacheKey;
pub use repository::SearchCache;
