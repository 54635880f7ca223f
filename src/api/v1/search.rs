//! Search endpoint handler

use axum::extract::State;
use tracing::debug;

use crate::api::middleware::CallerIdentity;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, SearchResponse};
use crate::domain::search::SearchQuery;

/// POST /v1/search
pub async fn search(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    debug!(caller = %caller.as_str(), term = %query.term, "Search requested");

    let outcome = state
        .search_service
        .search(caller.as_str(), &query)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SearchResponse::from(outcome)))
}
