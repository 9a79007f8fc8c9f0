//! Level-aware question answering over the policy index.
//!
//! Public API: [`QueryOrchestrator::answer`]. It validates the request,
//! resolves the answer level, embeds the question, retrieves the top-k chunks
//! from `rag-store`, renders the level's prompt with numbered `[Source N]`
//! blocks, calls the completion collaborator and returns the raw answer with
//! one citation per retrieved chunk.

mod api_types;
mod cfg;
mod error;
mod llm;

pub mod level;
pub mod prompt;

pub use api_types::{Citation, QueryRequest, QueryResponse};
pub use cfg::OrchestratorConfig;
pub use error::OrchestratorError;
pub use level::{Level, ResolvedLevel};
pub use llm::{CompletionProvider, ServiceCompleter};

use std::sync::Arc;

use rag_store::{EmbeddingsProvider, RagHit, RagQuery, RagStore, clamp_snippet};
use tracing::{debug, info, instrument, warn};

/// Shared query service. Cheap to clone behind an `Arc`; holds no
/// per-request state.
pub struct QueryOrchestrator {
    store: Arc<RagStore>,
    embedder: Arc<dyn EmbeddingsProvider>,
    completer: Arc<dyn CompletionProvider>,
    cfg: OrchestratorConfig,
}

impl QueryOrchestrator {
    pub fn new(
        store: Arc<RagStore>,
        embedder: Arc<dyn EmbeddingsProvider>,
        completer: Arc<dyn CompletionProvider>,
        cfg: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            completer,
            cfg,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<RagStore> {
        &self.store
    }

    /// Answers one question.
    ///
    /// # Errors
    /// - [`OrchestratorError::InvalidRequest`] for a blank question (no
    ///   collaborator is called)
    /// - [`OrchestratorError::NotFound`] before any index exists
    /// - [`OrchestratorError::Upstream`] when embedding or completion fails
    ///   or exceeds its deadline
    #[instrument(skip_all, fields(level = tracing::field::Empty, top_k = tracing::field::Empty))]
    pub async fn answer(&self, req: QueryRequest) -> Result<QueryResponse, OrchestratorError> {
        let question = req.question.trim();
        if question.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "question must not be empty".into(),
            ));
        }

        let top_k = self.cfg.clamp_top_k(req.top_k);
        let max_tokens = self.cfg.clamp_max_tokens(req.max_output_tokens);
        let level = level::resolve(req.level, self.cfg.default_level, question);
        tracing::Span::current().record("level", level.as_str());
        tracing::Span::current().record("top_k", top_k);

        // 1) Retrieve
        let query = RagQuery {
            text: question,
            top_k,
        };
        let hits = tokio::time::timeout(
            self.cfg.embedding_timeout,
            self.store.rag_context(query, self.embedder.as_ref()),
        )
        .await
        .map_err(|_| {
            warn!("retrieval timed out");
            OrchestratorError::timed_out("embedding", self.cfg.embedding_timeout)
        })??;
        debug!(hits = hits.len(), "retrieved");

        // 2) Prompt + completion
        let prompt = prompt::build_prompt(level, question, &hits, self.cfg.max_ctx_chars);
        let answer = match tokio::time::timeout(
            self.cfg.llm_timeout,
            self.completer.complete(&prompt, max_tokens),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "completion failed");
                return Err(OrchestratorError::upstream("completion", &e));
            }
            Err(_) => {
                warn!("completion timed out");
                return Err(OrchestratorError::timed_out(
                    "completion",
                    self.cfg.llm_timeout,
                ));
            }
        };

        // 3) Citations in retrieval order
        let citations = hits
            .iter()
            .map(|h| citation(h, self.cfg.snippet_chars))
            .collect::<Vec<_>>();

        info!(
            level = level.as_str(),
            citations = citations.len(),
            answer_chars = answer.len(),
            "query answered"
        );
        Ok(QueryResponse {
            answer,
            citations,
            prompt,
            level,
            used_top_k: top_k,
        })
    }
}

fn citation(hit: &RagHit, snippet_chars: usize) -> Citation {
    Citation {
        source_file: hit.chunk.source_file.clone(),
        page_start: hit.chunk.page_start,
        page_end: hit.chunk.page_end,
        score: hit.score,
        snippet: clamp_snippet(&hit.chunk.text, snippet_chars),
    }
}
