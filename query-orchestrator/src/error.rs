//! Typed error for the query-orchestrator crate.

use ai_llm_service::AiLlmError;
use rag_store::RagError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Caller input rejected before any collaborator call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Embedding or completion collaborator failed.
    #[error("{stage} failed: {message}")]
    Upstream {
        stage: &'static str,
        transient: bool,
        message: String,
    },

    /// No index has been built or loaded yet.
    #[error("index not found: ingest documents first")]
    NotFound,

    /// Store-side failure (I/O, inconsistent index).
    #[error("RAG error: {0}")]
    Store(RagError),
}

impl OrchestratorError {
    pub(crate) fn upstream(stage: &'static str, err: &AiLlmError) -> Self {
        Self::Upstream {
            stage,
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }

    pub(crate) fn timed_out(stage: &'static str, after: std::time::Duration) -> Self {
        Self::Upstream {
            stage,
            transient: true,
            message: format!("timed out after {after:?}"),
        }
    }
}

impl From<RagError> for OrchestratorError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::NotInitialized => Self::NotFound,
            e if e.is_upstream() => Self::Upstream {
                stage: "embedding",
                transient: e.is_transient(),
                message: e.to_string(),
            },
            e => Self::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn store_errors_map_to_taxonomy() {
        assert!(matches!(
            OrchestratorError::from(RagError::NotInitialized),
            OrchestratorError::NotFound
        ));
        match OrchestratorError::from(RagError::Timeout(Duration::from_secs(3))) {
            OrchestratorError::Upstream {
                stage, transient, ..
            } => {
                assert_eq!(stage, "embedding");
                assert!(transient);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            OrchestratorError::from(RagError::Corrupt("x".into())),
            OrchestratorError::Store(_)
        ));
        assert!(matches!(
            OrchestratorError::from(RagError::EmbeddingShape { got: 16, want: 32 }),
            OrchestratorError::Upstream {
                stage: "embedding",
                transient: false,
                ..
            }
        ));
    }
}
