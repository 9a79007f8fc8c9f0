//! Shared LLM service with two profiles: `generation` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Provider clients are built eagerly, so a bad key or endpoint fails at startup.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::service_profiles::LlmServiceProfiles;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Arc::new(LlmServiceProfiles::from_env()?);
//!
//!     let txt = svc.generate("What is PMAY?", None, Some(256)).await?;
//!     println!("{txt}");
//!
//!     let emb = svc.embed("housing subsidy").await?;
//!     println!("Embedding dim = {}", emb.len());
//!     Ok(())
//! }
//! ```

use crate::{
    config::{
        default_config::{config_embedding_from_env, config_generation_from_env},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::{AiLlmError, env_opt_u64},
    health_service::{HealthService, HealthStatus},
    services::{
        gemini_service::{EmbedTask, GeminiService},
        ollama_service::OllamaService,
        open_ai_service::OpenAiService,
    },
};

/// One ready-to-use provider client.
#[derive(Debug)]
enum ProviderClient {
    Gemini(GeminiService),
    OpenAI(OpenAiService),
    Ollama(OllamaService),
}

impl ProviderClient {
    fn build(cfg: &LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::Gemini => Self::Gemini(GeminiService::new(cfg.clone())?),
            LlmProvider::OpenAI => Self::OpenAI(OpenAiService::new(cfg.clone())?),
            LlmProvider::Ollama => Self::Ollama(OllamaService::new(cfg.clone())?),
        })
    }

    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<String, AiLlmError> {
        match self {
            Self::Gemini(c) => c.generate(prompt, system, max_tokens).await,
            Self::OpenAI(c) => c.generate(prompt, system, max_tokens).await,
            Self::Ollama(c) => c.generate(prompt, system, max_tokens).await,
        }
    }

    async fn embed(&self, input: &str, task: EmbedTask) -> Result<Vec<f32>, AiLlmError> {
        match self {
            Self::Gemini(c) => c.embeddings(input, task).await,
            Self::OpenAI(c) => c.embeddings(input).await,
            Self::Ollama(c) => c.embeddings(input).await,
        }
    }
}

/// Shared service that manages the **generation** and **embedding** profiles.
pub struct LlmServiceProfiles {
    generation: LlmModelConfig,
    embedding: LlmModelConfig,
    gen_client: ProviderClient,
    emb_client: ProviderClient,
    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service from explicit profiles.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if any provider client cannot be constructed.
    pub fn new(
        generation: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Ok(Self {
            gen_client: ProviderClient::build(&generation)?,
            emb_client: ProviderClient::build(&embedding)?,
            generation,
            embedding,
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds both profiles from environment (see [`crate::config::default_config`]).
    pub fn from_env() -> Result<Self, AiLlmError> {
        Self::new(
            config_generation_from_env()?,
            config_embedding_from_env()?,
            env_opt_u64("HEALTH_TIMEOUT_SECS")?,
        )
    }

    /// Generates text using the **generation** profile.
    ///
    /// `max_tokens` overrides the profile default for this call only.
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<String, AiLlmError> {
        self.gen_client.generate(prompt, system, max_tokens).await
    }

    /// Computes one document embedding using the **embedding** profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.emb_client.embed(input, EmbedTask::Document).await
    }

    /// Computes the embedding of a search question.
    pub async fn embed_query(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        self.emb_client.embed(input, EmbedTask::Query).await
    }

    /// Returns a health snapshot for all distinct profiles.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = vec![self.generation.clone()];
        if self.embedding != self.generation {
            list.push(self.embedding.clone());
        }
        self.health.check_many(&list).await
    }

    /// Returns references to the current profiles `(generation, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.generation, &self.embedding)
    }
}
