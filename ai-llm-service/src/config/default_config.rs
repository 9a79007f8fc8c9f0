//! Default LLM configs loaded from environment variables.
//!
//! Two roles are resolved for the selected provider:
//!
//! - **Generation** → answers and summaries
//! - **Embedding**  → vectors for chunks and questions
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_PROVIDER`            = `gemini` (default), `openai`, `ollama`
//! - `LLM_MAX_TOKENS`          = optional default output budget (u32)
//! - `LLM_TEMPERATURE`         = optional sampling temperature (default `0.2`)
//! - `LLM_TIMEOUT_SECS`        = generation timeout (default `60`)
//! - `EMBEDDING_TIMEOUT_SECS`  = embedding timeout (default `30`)
//!
//! Gemini:
//! - `GOOGLE_API_KEY` (required), `GEMINI_URL`
//! - `GEMINI_MODEL`    (default `models/gemini-2.5-flash-lite`)
//! - `EMBEDDING_MODEL` (default `models/text-embedding-004`)
//!
//! OpenAI:
//! - `OPENAI_API_KEY` (required), `OPENAI_URL`
//! - `OPENAI_MODEL`    (default `gpt-4o-mini`)
//! - `EMBEDDING_MODEL` (default `text-embedding-3-small`)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (required)
//! - `OLLAMA_MODEL`, `EMBEDDING_MODEL` (required)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, env_opt_u64, env_or, must_env,
        validate_http_endpoint, validate_range_f32,
    },
};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "models/gemini-2.5-flash-lite";
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Reads `LLM_PROVIDER`, defaulting to Gemini.
pub fn provider_from_env() -> Result<LlmProvider, AiLlmError> {
    Ok(env_or("LLM_PROVIDER", "gemini").parse::<LlmProvider>()?)
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
///
/// # Errors
///
/// - [`ConfigError::MissingVar`] if both are missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            validate_http_endpoint("OLLAMA_URL", &url)?;
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Provider endpoint and credential, resolved once per role.
fn endpoint_and_key(provider: LlmProvider) -> Result<(String, Option<String>), AiLlmError> {
    match provider {
        LlmProvider::Gemini => {
            let url = env_or("GEMINI_URL", DEFAULT_GEMINI_URL);
            validate_http_endpoint("GEMINI_URL", &url)?;
            Ok((url, Some(must_env("GOOGLE_API_KEY")?)))
        }
        LlmProvider::OpenAI => {
            let url = env_or("OPENAI_URL", DEFAULT_OPENAI_URL);
            validate_http_endpoint("OPENAI_URL", &url)?;
            Ok((url, Some(must_env("OPENAI_API_KEY")?)))
        }
        LlmProvider::Ollama => Ok((ollama_endpoint()?, None)),
    }
}

/// Constructs the **generation** profile for the configured provider.
///
/// # Defaults
/// - `temperature = Some(0.2)`
/// - `timeout_secs = Some(60)`
pub fn config_generation_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env()?;
    let (endpoint, api_key) = endpoint_and_key(provider)?;
    let model = match provider {
        LlmProvider::Gemini => env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        LlmProvider::OpenAI => env_or("OPENAI_MODEL", "gpt-4o-mini"),
        LlmProvider::Ollama => must_env("OLLAMA_MODEL")?,
    };
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(0.2);
    validate_range_f32("temperature", temperature, 0.0, 2.0)?;

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(60)),
    })
}

/// Constructs the **embedding** profile for the configured provider.
///
/// # Defaults
/// - `temperature = Some(0.0)` (deterministic)
/// - `max_tokens = None`
/// - `timeout_secs = Some(30)`
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env()?;
    let (endpoint, api_key) = endpoint_and_key(provider)?;
    let model = match provider {
        LlmProvider::Gemini => env_or("EMBEDDING_MODEL", DEFAULT_GEMINI_EMBEDDING_MODEL),
        LlmProvider::OpenAI => env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
        LlmProvider::Ollama => must_env("EMBEDDING_MODEL")?,
    };

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(env_opt_u64("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(30)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_to_gemini() {
        if std::env::var_os("LLM_PROVIDER").is_none() {
            assert_eq!(provider_from_env().unwrap(), LlmProvider::Gemini);
        }
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err: AiLlmError = "bard"
            .parse::<LlmProvider>()
            .map_err(AiLlmError::from)
            .unwrap_err();
        assert!(matches!(
            err,
            AiLlmError::Config(ConfigError::UnsupportedProvider(ref p)) if p == "bard"
        ));
    }
}
