//! Completion collaborator.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::{AiLlmError, service_profiles::LlmServiceProfiles};
use tracing::debug;

/// Asynchronous text completion: `prompt` in, raw answer text out.
///
/// Implemented over the shared provider profiles in production and by
/// stubs in tests.
pub trait CompletionProvider: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>>;
}

/// Completion through the generation profile of [`LlmServiceProfiles`].
#[derive(Clone)]
pub struct ServiceCompleter {
    svc: Arc<LlmServiceProfiles>,
}

impl ServiceCompleter {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl CompletionProvider for ServiceCompleter {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>> {
        Box::pin(async move {
            debug!(prompt_chars = prompt.len(), max_tokens, "completion request");
            self.svc.generate(prompt, None, Some(max_tokens)).await
        })
    }
}
