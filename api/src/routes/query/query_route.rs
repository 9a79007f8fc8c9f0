//! POST /query: answers a question with citations.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
};
use query_orchestrator::{QueryRequest, QueryResponse};

use crate::{
    core::app_state::LevelState, error_handler::AppResult,
    routes::query::query_request::merge_request,
};

/// Handler: POST /query
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/query \
///   -H 'content-type: application/json' \
///   -d '{"question":"What is the solar pump subsidy?","top_k":4,"level":"technical"}'
/// ```
pub async fn query(
    State(state): State<Arc<LevelState>>,
    params: Result<Query<QueryRequest>, QueryRejection>,
    body: Bytes,
) -> AppResult<Json<QueryResponse>> {
    let Query(params) = params?;
    let req = merge_request(params, &body)?;
    Ok(Json(state.orchestrator.answer(req).await?))
}
