use crate::errors::RagError;
use std::{future::Future, pin::Pin};

/// Asynchronous embedding provider.
///
/// Implement this trait to plug in an embedding backend (Gemini, OpenAI,
/// Ollama, or a deterministic stub in tests).
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;

    /// Embeds a search question. Defaults to [`Self::embed`].
    fn embed_query<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        self.embed(text)
    }
}

pub mod llm_service;
