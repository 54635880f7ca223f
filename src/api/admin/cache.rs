//! Cache statistics and invalidation handlers

use axum::extract::{Path, State};
use chrono::Utc;
use tracing::{debug, error};

use crate::api::state::AppState;
use crate::api::types::{ApiError, CacheStatsData, Json, MessageResponse, SuccessResponse};
use crate::domain::cache::CacheEntrySummary;

/// GET /cache/stats
pub async fn get_cache_stats(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<CacheStatsData>>, ApiError> {
    let service = &state.search_service;

    let stats = service.cache_stats().await.map_err(|e| {
        error!(error = %e, "Failed to read cache stats");
        ApiError::internal(e.to_string())
    })?;

    Ok(Json(SuccessResponse::new(CacheStatsData::new(
        stats,
        service.cache_type(),
        Utc::now(),
    ))))
}

/// DELETE /cache/stats
pub async fn clear_cache(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    state.search_service.clear_cache().await.map_err(|e| {
        error!(error = %e, "Failed to clear cache");
        ApiError::internal(e.to_string())
    })?;

    Ok(Json(MessageResponse::new("Cache cleared")))
}

/// GET /cache/entries
pub async fn list_cache_entries(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<CacheEntrySummary>>>, ApiError> {
    let entries = state
        .search_service
        .cache_entries()
        .await
        .map_err(ApiError::from)?;

    debug!(count = entries.len(), "Listing cache entries");

    Ok(Json(SuccessResponse::new(entries)))
}

/// DELETE /cache/entries/{fingerprint}
pub async fn invalidate_cache_entry(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state
        .search_service
        .invalidate(&fingerprint)
        .await
        .map_err(ApiError::from)?;

    if !removed {
        return Err(ApiError::not_found(format!(
            "Cache entry '{}' not found",
            fingerprint
        )));
    }

    Ok(Json(MessageResponse::new(format!(
        "Cache entry '{}' invalidated",
        fingerprint
    ))))
}
