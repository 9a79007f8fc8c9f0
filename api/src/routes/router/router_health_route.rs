//! GET /health on the router: last polled state of every level.

use std::sync::Arc;

use axum::{Json, extract::State};
use level_router::RouterHealth;

use crate::core::app_state::RouterState;

/// Handler: GET /health (router role)
pub async fn router_health(State(state): State<Arc<RouterState>>) -> Json<RouterHealth> {
    Json(state.router.health().await.as_ref().clone())
}
