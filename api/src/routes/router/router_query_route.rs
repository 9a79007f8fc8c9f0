//! POST /query on the router: forwards to the resolved level.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
};
use query_orchestrator::QueryRequest;
use serde_json::Value;

use crate::{
    core::app_state::RouterState, error_handler::AppResult,
    routes::query::query_request::merge_request,
};

/// Handler: POST /query (router role)
///
/// # Example
/// ```bash
/// curl -X POST 'http://127.0.0.1:8080/query?question=Summarize%20the%20startup%20policy'
/// ```
pub async fn router_query(
    State(state): State<Arc<RouterState>>,
    params: Result<Query<QueryRequest>, QueryRejection>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let Query(params) = params?;
    let req = merge_request(params, &body)?;
    Ok(Json(state.router.route(req).await?))
}
