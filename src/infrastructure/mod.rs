//! Infrastructure layer - Cache, admission, data store and observability implementations

pub mod cache;
pub mod logging;
pub mod observability;
pub mod rate_limit;
pub mod services;
pub mod source;
