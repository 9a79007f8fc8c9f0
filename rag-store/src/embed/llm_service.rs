//! Embedding provider backed by the shared `LlmServiceProfiles`.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use ai_llm_service::{EmbedTask, service_profiles::LlmServiceProfiles};
use tracing::warn;

use crate::{EmbeddingsProvider, RagError};

/// Calls the embedding profile with a per-call deadline.
#[derive(Clone)]
pub struct ServiceEmbedder {
    svc: Arc<LlmServiceProfiles>,
    timeout: Duration,
}

impl ServiceEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, timeout: Duration) -> Self {
        Self { svc, timeout }
    }
}

impl ServiceEmbedder {
    async fn call(&self, text: &str, task: EmbedTask) -> Result<Vec<f32>, RagError> {
        let fut = async {
            match task {
                EmbedTask::Document => self.svc.embed(text).await,
                EmbedTask::Query => self.svc.embed_query(text).await,
            }
        };
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis(), "embedding call timed out");
                Err(RagError::Timeout(self.timeout))
            }
        }
    }
}

impl EmbeddingsProvider for ServiceEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(self.call(text, EmbedTask::Document))
    }

    fn embed_query<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(self.call(text, EmbedTask::Query))
    }
}
