//! Key rotation statistics endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::services::PoolStats;

/// Per-key usage and failure counters, previews only
///
/// GET /api/stats
pub async fn key_stats(State(state): State<AppState>) -> Json<PoolStats> {
    Json(state.dispatcher.stats())
}
