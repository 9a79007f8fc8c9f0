//! Google Gemini (Generative Language API) client.
//!
//! Endpoints, relative to `LlmModelConfig::endpoint`:
//! - `POST /v1beta/{model}:generateContent`: single-turn generation
//! - `POST /v1beta/{model}:embedContent`   : one embedding vector
//!
//! Authentication uses the `x-goog-api-key` header so the key never shows up
//! in URLs or logs. Model ids are accepted with or without the `models/` prefix.

use std::time::Instant;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
    services::{build_client, decode_error, status_error},
};

/// What an embedding is for; Gemini tunes the vector to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTask {
    /// Indexed document text.
    Document,
    /// A question searched against indexed documents.
    Query,
}

impl EmbedTask {
    pub fn task_type(self) -> &'static str {
        match self {
            Self::Document => "RETRIEVAL_DOCUMENT",
            Self::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Thin client for Gemini.
#[derive(Debug)]
pub struct GeminiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    model_path: String,
    url_generate: String,
    url_embed: String,
}

impl GeminiService {
    /// Creates a new [`GeminiService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not Gemini
    /// - `MissingApiKey` if `cfg.api_key` is `None`
    /// - `InvalidEndpoint` if `cfg.endpoint` is invalid
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let api_key = cfg.api_key.clone().ok_or_else(|| {
            ProviderError::new(LlmProvider::Gemini, ProviderErrorKind::MissingApiKey)
        })?;

        let mut headers = header::HeaderMap::new();
        let mut key = header::HeaderValue::from_str(&api_key).map_err(|e| {
            decode_error(LlmProvider::Gemini, format!("invalid API key header: {e}"))
        })?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
        let client = build_client(&cfg, LlmProvider::Gemini, headers)?;

        let model_path = model_path(&cfg.model);
        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        let url_generate = format!("{base}/v1beta/{model_path}:generateContent");
        let url_embed = format!("{base}/v1beta/{model_path}:embedContent");

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs.unwrap_or(60),
            "GeminiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            model_path,
            url_generate,
            url_embed,
        })
    }

    /// Generates a completion for `prompt`.
    ///
    /// `max_tokens` overrides the profile default (`maxOutputTokens`).
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: system.map(|s| Content {
                role: None,
                parts: vec![Part { text: s }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens.or(self.cfg.max_tokens),
                temperature: self.cfg.temperature,
                top_p: self.cfg.top_p,
            },
        };

        debug!(prompt_len = prompt.len(), "POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(
                LlmProvider::Gemini,
                resp,
                &self.url_generate,
                &self.cfg.model,
                started,
            )
            .await);
        }

        let out: GenerateContentResponse = resp.json().await.map_err(|e| {
            decode_error(
                LlmProvider::Gemini,
                format!("serde error: {e}; expected `candidates[0].content.parts`"),
            )
        })?;

        let text = out
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .find(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::new(LlmProvider::Gemini, ProviderErrorKind::EmptyChoices)
            })?;

        debug!(
            latency_ms = started.elapsed().as_millis(),
            "generateContent completed"
        );
        Ok(text)
    }

    /// Retrieves one embedding vector for `input`, tagged with `task`.
    #[instrument(skip_all, fields(model = %self.cfg.model, task = task.task_type()))]
    pub async fn embeddings(&self, input: &str, task: EmbedTask) -> Result<Vec<f32>, AiLlmError> {
        let started = Instant::now();
        let body = EmbedContentRequest {
            model: &self.model_path,
            content: Content {
                role: None,
                parts: vec![Part { text: input }],
            },
            task_type: task.task_type(),
        };

        debug!(input_len = input.len(), "POST {}", self.url_embed);
        let resp = self.client.post(&self.url_embed).json(&body).send().await?;

        if !resp.status().is_success() {
            return Err(status_error(
                LlmProvider::Gemini,
                resp,
                &self.url_embed,
                &self.cfg.model,
                started,
            )
            .await);
        }

        let out: EmbedContentResponse = resp.json().await.map_err(|e| {
            decode_error(
                LlmProvider::Gemini,
                format!("serde error: {e}; expected `embedding.values`"),
            )
        })?;

        Ok(out.embedding.values)
    }
}

/// Normalizes a model id to the `models/<id>` form used in request paths.
pub fn model_path(model: &str) -> String {
    let m = model.trim();
    if m.starts_with("models/") || m.starts_with("tunedModels/") {
        m.to_string()
    } else {
        format!("models/{m}")
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartOut>,
}

#[derive(Debug, Deserialize)]
struct PartOut {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
