//! GET /health: liveness plus index stats; never fails.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    core::app_state::LevelState,
    error_handler::AppResult,
    routes::health::health_request::{HealthDetails, HealthParams, HealthResponse},
};

/// Handler: GET /health
///
/// # Example
/// ```bash
/// curl 'http://127.0.0.1:8000/health?deep=true'
/// ```
pub async fn health(
    State(state): State<Arc<LevelState>>,
    params: Result<Query<HealthParams>, axum::extract::rejection::QueryRejection>,
) -> AppResult<Json<HealthResponse>> {
    let Query(params) = params?;
    let stats = state.store.stats().await;

    let providers = match (&state.llm, params.deep) {
        (Some(llm), true) => Some(llm.health_all().await),
        _ => None,
    };

    Ok(Json(HealthResponse {
        status: "ok",
        details: HealthDetails { stats, providers },
    }))
}
