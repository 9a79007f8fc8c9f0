//! POST /ingest on the router: multi-level ingestion of uploaded PDFs.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use level_router::{MultiLevelIngest, Upload};
use tracing::info;

use crate::{
    core::app_state::RouterState,
    error_handler::AppResult,
    routes::ingest::ingest_request::read_upload_form,
};

/// Handler: POST /ingest (router role)
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/ingest -F files=@policy.pdf
/// ```
pub async fn router_ingest(
    State(state): State<Arc<RouterState>>,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<MultiLevelIngest>> {
    let form = read_upload_form(mp?).await?;
    info!(uploads = form.files.len(), "multi-level ingest request");
    let uploads = form
        .files
        .into_iter()
        .map(|(name, bytes)| Upload::new(name, bytes))
        .collect();
    Ok(Json(state.router.ingest_all_levels(uploads).await?))
}
