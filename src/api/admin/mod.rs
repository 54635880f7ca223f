//! Operational endpoints for inspecting the cache and the admission gate

pub mod cache;
pub mod rate_limit;

use axum::{
    routing::{delete, get},
    Router,
};

use super::state::AppState;

/// Create admin router, mounted at the root
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/cache/stats",
            get(cache::get_cache_stats).delete(cache::clear_cache),
        )
        .route("/cache/entries", get(cache::list_cache_entries))
        .route(
            "/cache/entries/{fingerprint}",
            delete(cache::invalidate_cache_entry),
        )
        .route("/rate-limit/stats", get(rate_limit::get_rate_limit_stats))
}
