//! Rate limiter introspection handler

use axum::extract::State;

use crate::api::state::AppState;
use crate::api::types::{Json, SuccessResponse};
use crate::domain::rate_limit::GateStats;

/// GET /rate-limit/stats
pub async fn get_rate_limit_stats(State(state): State<AppState>) -> Json<SuccessResponse<GateStats>> {
    Json(SuccessResponse::new(state.search_service.gate_stats().await))
}
