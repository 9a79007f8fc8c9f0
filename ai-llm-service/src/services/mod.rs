pub mod gemini_service;
pub mod ollama_service;
pub mod open_ai_service;

use std::time::{Duration, Instant};

use tracing::error;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet},
};

/// Validates provider + endpoint and builds a `reqwest::Client` with the config timeout.
pub(crate) fn build_client(
    cfg: &LlmModelConfig,
    expected: LlmProvider,
    headers: reqwest::header::HeaderMap,
) -> Result<reqwest::Client, AiLlmError> {
    if cfg.provider != expected {
        return Err(ProviderError::new(expected, ProviderErrorKind::InvalidProvider).into());
    }

    let endpoint = cfg.endpoint.trim();
    if endpoint.is_empty()
        || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ProviderError::new(
            expected,
            ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
        )
        .into());
    }

    let timeout = cfg
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(60));

    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .gzip(true)
        .brotli(true)
        .build()?)
}

/// Turns a non-2xx response into a provider error carrying a body snippet.
pub(crate) async fn status_error(
    provider: LlmProvider,
    resp: reqwest::Response,
    url: &str,
    model: &str,
    started: Instant,
) -> AiLlmError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet = make_snippet(&text);

    error!(
        ?provider,
        %status,
        %url,
        %snippet,
        %model,
        latency_ms = started.elapsed().as_millis(),
        "provider returned non-success status"
    );

    ProviderError::new(
        provider,
        ProviderErrorKind::HttpStatus(HttpError {
            status,
            url: url.to_string(),
            snippet,
        }),
    )
    .into()
}

pub(crate) fn decode_error(provider: LlmProvider, msg: String) -> AiLlmError {
    ProviderError::new(provider, ProviderErrorKind::Decode(msg)).into()
}
