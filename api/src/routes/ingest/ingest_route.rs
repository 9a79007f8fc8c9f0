//! POST /ingest: JSON `{force_rebuild}` or multipart uploads.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request, State, rejection::QueryRejection},
};
use rag_store::{IngestReport, SourceDoc};
use tracing::info;

use crate::{
    core::app_state::LevelState,
    error_handler::AppResult,
    routes::ingest::ingest_request::{
        IngestParams, IngestRequest, UploadForm, is_multipart, read_upload_form,
    },
};

/// Handler: POST /ingest
///
/// - JSON (or empty) body: ingest every document in `PDFS_DIR`
/// - multipart: save the uploads into `PDFS_DIR`, then ingest them
///   (or rebuild from the whole directory when `force_rebuild` is set)
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/ingest \
///   -H 'content-type: application/json' -d '{"force_rebuild":true}'
/// curl -X POST 'http://127.0.0.1:8000/ingest?force_rebuild=false' \
///   -F files=@policy.pdf
/// ```
pub async fn ingest(
    State(state): State<Arc<LevelState>>,
    params: Result<Query<IngestParams>, QueryRejection>,
    req: Request,
) -> AppResult<Json<IngestReport>> {
    let Query(params) = params?;

    let (form, body_force) = if is_multipart(req.headers()) {
        let mp = Multipart::from_request(req, &()).await?;
        (read_upload_form(mp).await?, None)
    } else {
        let body = Bytes::from_request(req, &()).await?;
        let parsed: IngestRequest = if body.iter().all(u8::is_ascii_whitespace) {
            IngestRequest::default()
        } else {
            serde_json::from_slice(&body)?
        };
        (UploadForm::default(), parsed.force_rebuild)
    };

    let force_rebuild = form
        .force_rebuild
        .or(body_force)
        .or(params.force_rebuild)
        .unwrap_or(false);
    info!(uploads = form.files.len(), force_rebuild, "ingest request");

    let extractor = Arc::clone(&state.extractor);
    let embedder = state.embedder.as_ref();

    let report = if form.files.is_empty() {
        state.store.ingest_dir(force_rebuild, extractor, embedder).await?
    } else {
        let mut docs = Vec::with_capacity(form.files.len());
        for (name, bytes) in form.files {
            state.store.save_upload(&name, &bytes).await?;
            docs.push(SourceDoc::new(name, bytes));
        }
        if force_rebuild {
            state.store.ingest_dir(true, extractor, embedder).await?
        } else {
            state
                .store
                .ingest_documents(docs, false, extractor, embedder)
                .await?
        }
    };

    info!(
        files = report.files_processed,
        chunks = report.chunks_added,
        vectors = report.vectors,
        failures = report.failures.len(),
        "ingest finished"
    );
    Ok(Json(report))
}
