//! Candidate source infrastructure - Data store adapters

mod in_memory;
mod postgres;

pub use in_memory::InMemoryCandidateSource;
pub use postgres::{PostgresCandidateSource, PostgresSourceConfig};
