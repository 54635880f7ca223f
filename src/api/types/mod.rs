//! Request and response types shared by the handlers

pub mod error;
pub mod json;
pub mod search;

pub use error::{retry_after_secs, ApiError, ApiErrorResponse};
pub use json::Json;
pub use search::{CacheStatsData, MessageResponse, SearchResponse, SuccessResponse};
