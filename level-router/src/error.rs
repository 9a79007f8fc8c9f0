//! Typed error for the level-router crate.

use query_orchestrator::ResolvedLevel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    /// Downstream instance answered with a non-2xx status.
    #[error("{level} instance returned {status}: {body}")]
    Downstream {
        level: ResolvedLevel,
        status: u16,
        body: String,
    },

    /// Downstream instance could not be reached or sent an unreadable body.
    #[error("{level} instance unreachable: {message}")]
    Unreachable {
        level: ResolvedLevel,
        transient: bool,
        message: String,
    },

    /// Summary generation failed.
    #[error("compression for {level} failed: {message}")]
    Compression {
        level: ResolvedLevel,
        transient: bool,
        message: String,
    },

    /// Uploaded documents yielded no usable text.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl RouterError {
    pub(crate) fn unreachable(level: ResolvedLevel, err: &reqwest::Error) -> Self {
        Self::Unreachable {
            level,
            transient: err.is_timeout() || err.is_connect(),
            message: err.to_string(),
        }
    }
}
