//! Unified error types for the crate.

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Stored or caller-supplied vector length differs from the index dimension.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// The embedding provider answered with a vector of the wrong length.
    #[error("embedding provider returned a {got}-dim vector, index expects {want}")]
    EmbeddingShape { got: usize, want: usize },

    /// Document could not be turned into page text.
    #[error("cannot read {file}: {reason}")]
    Extract { file: String, reason: String },

    /// Embedding provider failed.
    #[error("embedding provider: {0}")]
    Llm(#[from] AiLlmError),

    /// Embedding call exceeded its deadline.
    #[error("embedding timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// No index on disk and nothing ingested yet.
    #[error("index has not been built yet")]
    NotInitialized,

    /// Every supplied document failed; nothing was committed.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    /// Index and metadata files disagree.
    #[error("index files are inconsistent: {0}")]
    Corrupt(String),

    /// Generic error from anyhow chain.
    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RagError {
    /// True for failures of the external embedding collaborator.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RagError::Llm(_) | RagError::Timeout(_) | RagError::EmbeddingShape { .. }
        )
    }

    /// True when the upstream failure is worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            RagError::Timeout(_) => true,
            RagError::Llm(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_embedding_is_a_permanent_upstream_fault() {
        let e = RagError::EmbeddingShape { got: 16, want: 32 };
        assert!(e.is_upstream());
        assert!(!e.is_transient());
        assert!(!RagError::VectorSizeMismatch { got: 1, want: 2 }.is_upstream());
    }
}
