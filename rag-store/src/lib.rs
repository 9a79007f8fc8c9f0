//! Local vector store for policy documents: ingestion + retrieval.
//!
//! - Extract page text from PDFs (and plain-text summaries)
//! - Split pages into overlapping, page-aware chunks
//! - Embed chunks through an [`EmbeddingsProvider`]
//! - Keep an exact inner-product index in memory, persisted as JSON
//!
//! Readers clone the current `Arc<IndexSnapshot>` and search without holding
//! any lock; ingestion is serialized by a writer mutex and publishes a new
//! snapshot only after it has been written to disk.

mod chunking;
mod config;
mod discovery;
mod embed;
mod embed_pool;
mod errors;
mod index;
mod ingest;
mod normalize;
mod pdf;
mod persist;
mod record;

pub use chunking::{ChunkDraft, split_into_chunks};
pub use config::{DistanceKind, StoreConfig};
pub use discovery::{list_documents, sanitize_file_name};
pub use embed::{EmbeddingsProvider, llm_service::ServiceEmbedder};
pub use errors::RagError;
pub use index::IndexSnapshot;
pub use ingest::SourceDoc;
pub use pdf::{
    DocumentExtractor, LopdfExtractor, PageExtractor, Pages, PlainTextExtractor, extract_blocking,
};
pub use record::{
    Chunk, FileEntry, IndexStats, IngestFailure, IngestReport, RagHit, RagQuery, clamp_snippet,
};

use std::{path::PathBuf, sync::Arc, time::Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, trace};

/// High-level facade over the persisted index.
///
/// This is the single entry point recommended for application code.
pub struct RagStore {
    cfg: StoreConfig,
    current: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
    opened_at: Instant,
}

impl RagStore {
    /// Opens the store, loading a persisted index if one exists.
    ///
    /// # Errors
    /// Config validation, I/O, or inconsistent index files.
    pub async fn open(cfg: StoreConfig) -> Result<Self, RagError> {
        cfg.validate()?;
        let load_cfg = cfg.clone();
        let loaded = tokio::task::spawn_blocking(move || persist::load(&load_cfg))
            .await
            .map_err(|e| RagError::Internal(anyhow::anyhow!("index load task failed: {e}")))??;

        let snap = match loaded {
            Some(s) => {
                info!(
                    vectors = s.len(),
                    files = s.document_count(),
                    path = %cfg.index_path().display(),
                    "index loaded"
                );
                s
            }
            None => {
                info!(dir = %cfg.index_dir.display(), "no index on disk yet");
                IndexSnapshot::empty(cfg.distance)
            }
        };

        Ok(Self {
            cfg,
            current: RwLock::new(Arc::new(snap)),
            writer: Mutex::new(()),
            opened_at: Instant::now(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// The currently published snapshot.
    pub async fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Searches the current snapshot with a ready query vector.
    ///
    /// # Errors
    /// [`RagError::NotInitialized`] if no index was ever built or loaded.
    pub async fn search_by_vector(
        &self,
        query_vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<RagHit>, RagError> {
        let snap = self.snapshot().await;
        if !snap.initialized {
            return Err(RagError::NotInitialized);
        }
        trace!(top_k, vectors = snap.len(), "search_by_vector");
        snap.search(query_vector, top_k)
    }

    /// Embeds the query text and returns the top-k hits.
    ///
    /// The initialization check runs before the embedding call.
    pub async fn rag_context(
        &self,
        query: RagQuery<'_>,
        provider: &dyn EmbeddingsProvider,
    ) -> Result<Vec<RagHit>, RagError> {
        let snap = self.snapshot().await;
        if !snap.initialized {
            return Err(RagError::NotInitialized);
        }
        let qv = provider.embed_query(query.text).await?;
        if let Some(want) = snap.dimension {
            if qv.len() != want {
                return Err(RagError::EmbeddingShape {
                    got: qv.len(),
                    want,
                });
            }
        }
        let hits = snap.search(qv, query.top_k)?;
        debug!(top_k = query.top_k, hits = hits.len(), "rag_context");
        Ok(hits)
    }

    /// Current statistics.
    pub async fn stats(&self) -> IndexStats {
        let snap = self.snapshot().await;
        let index_path = self.cfg.index_path();
        let last_modified = tokio::fs::metadata(&index_path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

        IndexStats {
            document_count: snap.document_count(),
            chunk_count: snap.len(),
            index_size: snap.len(),
            dimension: snap.dimension,
            uptime: self.opened_at.elapsed().as_secs(),
            index_path: index_path.display().to_string(),
            metadata_path: self.cfg.meta_path().display().to_string(),
            index_exists: last_modified.is_some(),
            last_modified,
        }
    }

    /// Ingests explicit documents (see [`ingest::ingest`] for semantics).
    pub async fn ingest_documents(
        &self,
        sources: Vec<SourceDoc>,
        force_rebuild: bool,
        extractor: Arc<dyn PageExtractor>,
        embedder: &dyn EmbeddingsProvider,
    ) -> Result<IngestReport, RagError> {
        ingest::ingest(self, sources, force_rebuild, extractor, embedder).await
    }

    /// Ingests every supported document in `pdfs_dir`.
    pub async fn ingest_dir(
        &self,
        force_rebuild: bool,
        extractor: Arc<dyn PageExtractor>,
        embedder: &dyn EmbeddingsProvider,
    ) -> Result<IngestReport, RagError> {
        let sources = self.read_dir_sources().await?;
        info!(count = sources.len(), force_rebuild, "ingesting documents directory");
        self.ingest_documents(sources, force_rebuild, extractor, embedder)
            .await
    }

    /// Saves an upload into `pdfs_dir` under its sanitized name.
    ///
    /// # Errors
    /// [`RagError::Ingestion`] for names that are not `.pdf`/`.txt`.
    pub async fn save_upload(&self, raw_name: &str, bytes: &[u8]) -> Result<PathBuf, RagError> {
        let name = sanitize_file_name(raw_name).ok_or_else(|| {
            RagError::Ingestion(format!("unsupported upload name: {raw_name:?}"))
        })?;
        tokio::fs::create_dir_all(&self.cfg.pdfs_dir).await?;
        let path = self.cfg.pdfs_dir.join(&name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "upload saved");
        Ok(path)
    }

    async fn read_dir_sources(&self) -> Result<Vec<SourceDoc>, RagError> {
        let mut out = Vec::new();
        for path in list_documents(&self.cfg.pdfs_dir)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let bytes = tokio::fs::read(&path).await?;
            out.push(SourceDoc::new(name, bytes));
        }
        Ok(out)
    }

    /// Persists `next` and publishes it. Caller holds the writer lock.
    async fn commit(&self, next: IndexSnapshot) -> Result<(), RagError> {
        let next = Arc::new(next);
        let to_save = Arc::clone(&next);
        let cfg = self.cfg.clone();
        tokio::task::spawn_blocking(move || persist::save(&cfg, &to_save))
            .await
            .map_err(|e| RagError::Internal(anyhow::anyhow!("index save task failed: {e}")))??;

        *self.current.write().await = next;
        Ok(())
    }
}
