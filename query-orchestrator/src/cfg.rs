//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use tracing::warn;

use crate::level::{Level, ResolvedLevel};

/// Query knobs. Every field has a default via [`OrchestratorConfig::default`].
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub top_k: usize,
    pub top_k_min: usize,
    pub top_k_max: usize,
    pub max_tokens: u32,
    pub max_tokens_min: u32,
    pub max_tokens_max: u32,
    /// Character budget for the rendered source blocks.
    pub max_ctx_chars: usize,
    /// Citation snippet length in characters.
    pub snippet_chars: usize,
    /// Concrete level for absent/`auto` requests; `None` runs the heuristic.
    pub default_level: Option<ResolvedLevel>,
    pub embedding_timeout: Duration,
    pub llm_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            top_k_min: 1,
            top_k_max: 12,
            max_tokens: 512,
            max_tokens_min: 128,
            max_tokens_max: 2048,
            max_ctx_chars: 16_000,
            snippet_chars: 500,
            default_level: None,
            embedding_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(60),
        }
    }
}

impl OrchestratorConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        let top_k_min = parse("TOP_K_MIN", d.top_k_min).max(1);
        let top_k_max = parse("TOP_K_MAX", d.top_k_max).max(top_k_min);
        let max_tokens_min = parse("MAX_TOKENS_MIN", d.max_tokens_min).max(1);
        let max_tokens_max = parse("MAX_TOKENS_MAX", d.max_tokens_max).max(max_tokens_min);

        Self {
            top_k: parse("TOP_K", d.top_k),
            top_k_min,
            top_k_max,
            max_tokens: parse("MAX_OUTPUT_TOKENS", d.max_tokens),
            max_tokens_min,
            max_tokens_max,
            max_ctx_chars: parse("MAX_CTX_CHARS", d.max_ctx_chars),
            snippet_chars: parse("SNIPPET_CHARS", d.snippet_chars),
            default_level: default_level(&env("DEFAULT_LEVEL", "auto")),
            embedding_timeout: Duration::from_secs(parse("EMBEDDING_TIMEOUT_SECS", 30)),
            llm_timeout: Duration::from_secs(parse("LLM_TIMEOUT_SECS", 60)),
        }
    }

    /// Effective `top_k`: absent → default, then clamped to the bounds.
    pub fn clamp_top_k(&self, requested: Option<i64>) -> usize {
        let v = requested.unwrap_or(self.top_k as i64);
        v.clamp(self.top_k_min as i64, self.top_k_max as i64) as usize
    }

    /// Effective output-token limit: absent → default, then clamped.
    pub fn clamp_max_tokens(&self, requested: Option<i64>) -> u32 {
        let v = requested.unwrap_or(i64::from(self.max_tokens));
        v.clamp(i64::from(self.max_tokens_min), i64::from(self.max_tokens_max)) as u32
    }
}

fn default_level(raw: &str) -> Option<ResolvedLevel> {
    match raw.parse::<Level>() {
        Ok(Level::General) => Some(ResolvedLevel::General),
        Ok(Level::Summary) => Some(ResolvedLevel::Summary),
        Ok(Level::Technical) => Some(ResolvedLevel::Technical),
        Ok(Level::Auto) => None,
        Err(e) => {
            warn!(error = %e, "DEFAULT_LEVEL ignored; using auto");
            None
        }
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(dflt)
}
