//! Ingestion pipeline: documents → pages → chunks → embeddings → new snapshot.
//!
//! Runs under the store's writer lock. The new snapshot shares every existing
//! chunk `Arc` with its predecessor and is persisted before it is published.

use std::{collections::BTreeMap, sync::Arc};

use services::{digest::sha256_hex, uuid::chunk_uuid};
use tracing::{debug, info, warn};

use crate::{
    RagStore,
    chunking::{ChunkDraft, split_into_chunks},
    embed::EmbeddingsProvider,
    embed_pool::embed_all,
    errors::RagError,
    index::IndexSnapshot,
    pdf::{PageExtractor, extract_blocking},
    record::{Chunk, FileEntry, IngestFailure, IngestReport},
};

/// One document handed to the pipeline.
#[derive(Clone, Debug)]
pub struct SourceDoc {
    /// Bare file name; also the citation label.
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl SourceDoc {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: Arc::new(bytes),
        }
    }
}

struct Prepared {
    file_name: String,
    sha256: String,
    drafts: Vec<ChunkDraft>,
}

/// Ingests `sources` into `store`.
///
/// - `force_rebuild`: start from an empty index instead of the current one.
/// - Unchanged files (same name + digest) are skipped; a known name with new
///   content is a per-file failure.
/// - Per-file extraction failures are reported; if no file could be used the
///   call fails with [`RagError::Ingestion`] and nothing is committed.
/// - Any embedding failure aborts the call; nothing is committed.
pub async fn ingest(
    store: &RagStore,
    sources: Vec<SourceDoc>,
    force_rebuild: bool,
    extractor: Arc<dyn PageExtractor>,
    embedder: &dyn EmbeddingsProvider,
) -> Result<IngestReport, RagError> {
    let _writer = store.writer.lock().await;
    let cfg = store.config();

    let base = if force_rebuild {
        info!("force rebuild: discarding current index");
        Arc::new(IndexSnapshot::empty(cfg.distance))
    } else {
        store.snapshot().await
    };

    if sources.is_empty() {
        return Err(RagError::Ingestion("no documents to ingest".into()));
    }

    // last upload wins for duplicate names within one call
    let mut by_name: BTreeMap<String, SourceDoc> = BTreeMap::new();
    for s in sources {
        by_name.insert(s.file_name.clone(), s);
    }

    let mut report = IngestReport::default();
    let mut prepared = Vec::new();

    for (name, doc) in by_name {
        let sha256 = sha256_hex(&doc.bytes);
        if let Some(entry) = base.files.get(&name) {
            if entry.sha256 == sha256 {
                debug!(file = %name, "unchanged, skipping");
                report.skipped.push(name);
            } else {
                warn!(file = %name, "content changed since it was indexed");
                report.failures.push(IngestFailure {
                    file: name,
                    reason: "already indexed with different content; use force_rebuild".into(),
                });
            }
            continue;
        }

        match extract_blocking(Arc::clone(&extractor), name.clone(), Arc::clone(&doc.bytes)).await
        {
            Ok(pages) if pages.is_empty() => {
                warn!(file = %name, "no extractable text");
                report.failures.push(IngestFailure {
                    file: name,
                    reason: "no extractable text".into(),
                });
            }
            Ok(pages) => {
                let drafts = split_into_chunks(&pages, cfg.chunk_size, cfg.chunk_overlap);
                info!(file = %name, pages = pages.len(), chunks = drafts.len(), "document split");
                prepared.push(Prepared {
                    file_name: name,
                    sha256,
                    drafts,
                });
            }
            Err(e) => {
                warn!(file = %name, error = %e, "document rejected");
                report.failures.push(IngestFailure {
                    file: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if prepared.is_empty() {
        if report.skipped.is_empty() {
            let detail = report
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.file, f.reason))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RagError::Ingestion(detail));
        }
        report.vectors = base.len();
        report.message = "No new documents; index unchanged".into();
        return Ok(report);
    }

    let texts: Vec<&str> = prepared
        .iter()
        .flat_map(|p| p.drafts.iter().map(|d| d.text.as_str()))
        .collect();
    let want_dim = base.dimension.or(cfg.embedding_dim);
    let vectors = embed_all(
        &texts,
        embedder,
        want_dim,
        cfg.embed_concurrency,
        cfg.show_progress,
    )
    .await?;

    let mut next = IndexSnapshot {
        chunks: base.chunks.clone(),
        files: base.files.clone(),
        dimension: base.dimension.or_else(|| vectors.first().map(Vec::len)),
        distance: base.distance,
        next_seq: base.next_seq,
        initialized: true,
    };

    let mut vectors = vectors.into_iter();
    for p in prepared {
        let count = p.drafts.len();
        for (ordinal, draft) in p.drafts.into_iter().enumerate() {
            let Some(v) = vectors.next() else {
                return Err(RagError::Internal(anyhow::anyhow!(
                    "embedding count does not match chunk count"
                )));
            };
            let embedding = next.prepare(v);
            next.chunks.push(Arc::new(Chunk {
                id: chunk_uuid(&p.file_name, &p.sha256, ordinal).to_string(),
                seq: next.next_seq,
                source_file: p.file_name.clone(),
                page_start: draft.page_start,
                page_end: draft.page_end,
                text: draft.text,
                embedding,
            }));
            next.next_seq += 1;
        }
        next.files.insert(
            p.file_name,
            FileEntry {
                sha256: p.sha256,
                chunk_count: count,
            },
        );
        report.files_processed += 1;
        report.chunks_added += count;
    }

    report.vectors = next.len();
    report.message = if force_rebuild {
        format!("Index rebuilt from {} file(s)", report.files_processed)
    } else {
        "Ingestion complete".into()
    };

    store.commit(next).await?;
    info!(
        files = report.files_processed,
        chunks = report.chunks_added,
        vectors = report.vectors,
        skipped = report.skipped.len(),
        failed = report.failures.len(),
        "ingestion committed"
    );
    Ok(report)
}
