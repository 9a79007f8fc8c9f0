//! Core data models used by the library.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A retrievable slice of one document. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// UUIDv5 of `(file digest, file name, ordinal)`.
    pub id: String,
    /// Internal insertion sequence; breaks score ties.
    pub seq: u64,
    pub source_file: String,
    pub page_start: u32,
    pub page_end: u32,
    pub text: String,
    /// Stored as indexed (normalized for cosine).
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// Query parameters for RAG retrieval.
pub struct RagQuery<'a> {
    pub text: &'a str,
    pub top_k: usize,
}

/// A single retrieval hit.
#[derive(Clone, Debug)]
pub struct RagHit {
    pub chunk: Arc<Chunk>,
    pub score: f32,
}

/// Digest bookkeeping for an indexed file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub sha256: String,
    pub chunk_count: usize,
}

/// Index statistics as served by `GET /stats`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub chunk_count: usize,
    /// Number of stored vectors.
    pub index_size: usize,
    pub dimension: Option<usize>,
    /// Seconds since the store was opened.
    pub uptime: u64,
    pub index_path: String,
    pub metadata_path: String,
    pub index_exists: bool,
    /// RFC3339 modification time of the index file.
    pub last_modified: Option<String>,
}

/// One file that could not be ingested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub file: String,
    pub reason: String,
}

/// Outcome of one ingestion call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub files_processed: usize,
    pub chunks_added: usize,
    /// Index size after the call.
    pub vectors: usize,
    /// Files skipped because identical content is already indexed.
    #[serde(default)]
    pub skipped: Vec<String>,
    #[serde(default)]
    pub failures: Vec<IngestFailure>,
    pub message: String,
}

/// Cuts `s` to at most `max_chars` characters on a char boundary.
pub fn clamp_snippet(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(clamp_snippet("héllo", 2), "hé");
        assert_eq!(clamp_snippet("abc", 10), "abc");
        assert_eq!(clamp_snippet("", 5), "");
    }
}
