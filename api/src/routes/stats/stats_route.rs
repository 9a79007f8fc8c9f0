//! GET /stats: index statistics.

use std::sync::Arc;

use axum::{Json, extract::State};
use rag_store::IndexStats;

use crate::core::app_state::LevelState;

/// Handler: GET /stats
pub async fn stats(State(state): State<Arc<LevelState>>) -> Json<IndexStats> {
    Json(state.store.stats().await)
}
