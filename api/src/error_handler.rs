use axum::{
    extract::rejection::{BytesRejection, QueryRejection},
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use level_router::RouterError;
use query_orchestrator::OrchestratorError;
use rag_store::RagError;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::http::response_envelope::{ApiErrorDetail, ErrorEnvelope};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request handling ---
    #[error("{message}")]
    InvalidRequest {
        message: String,
        details: Vec<ApiErrorDetail>,
    },

    #[error("{0}")]
    UpstreamTimeout(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{message}")]
    IngestionFailed {
        message: String,
        details: Vec<ApiErrorDetail>,
    },

    #[error("{0}")]
    IndexNotFound(String),

    #[error("{0}")]
    Internal(String),

    /// Error relayed from a level instance with its own status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: String,
        message: String,
    },
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidRequest {
            message: message.into(),
            details: vec![],
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::IndexNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IngestionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Http { status, .. } => *status,
            AppError::Config(_)
            | AppError::Bind(_)
            | AppError::Server(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            AppError::InvalidRequest { .. } => "INVALID_REQUEST",
            AppError::IndexNotFound(_) => "INDEX_NOT_FOUND",
            AppError::IngestionFailed { .. } => "INGESTION_FAILED",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            AppError::Http { code, .. } => code.as_str(),
            AppError::Config(_)
            | AppError::Bind(_)
            | AppError::Server(_)
            | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let code = self.error_code().to_string();
        let message = self.to_string();
        let details = match self {
            AppError::InvalidRequest { details, .. } | AppError::IngestionFailed { details, .. } => {
                details
            }
            _ => vec![],
        };
        ErrorEnvelope::new(&code, message, details).into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        AppError::invalid(err.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(err: BytesRejection) -> Self {
        AppError::invalid(err.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::invalid(format!("malformed multipart body: {}", err.body_text()))
    }
}

impl From<axum::extract::multipart::MultipartRejection> for AppError {
    fn from(err: axum::extract::multipart::MultipartRejection) -> Self {
        AppError::invalid(err.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidRequest {
            message: format!("malformed JSON body: {err}"),
            details: vec![ApiErrorDetail {
                path: None,
                hint: Some("Expected a JSON object here (e.g. { \"question\": \"...\" }).".into()),
            }],
        }
    }
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::InvalidRequest(m) => AppError::InvalidRequest {
                message: m,
                details: vec![ApiErrorDetail {
                    path: Some("question".into()),
                    hint: None,
                }],
            },
            e @ OrchestratorError::NotFound => AppError::IndexNotFound(e.to_string()),
            e @ OrchestratorError::Upstream { transient: true, .. } => {
                AppError::UpstreamTimeout(e.to_string())
            }
            e @ OrchestratorError::Upstream { .. } => AppError::Upstream(e.to_string()),
            OrchestratorError::Store(e) => AppError::from(e),
        }
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::NotInitialized => AppError::IndexNotFound(err.to_string()),
            RagError::Ingestion(m) => AppError::IngestionFailed {
                message: format!("ingestion failed: {m}"),
                details: vec![],
            },
            e if e.is_upstream() && e.is_transient() => AppError::UpstreamTimeout(e.to_string()),
            e if e.is_upstream() => AppError::Upstream(e.to_string()),
            e @ RagError::Extract { .. } => {
                AppError::IngestionFailed {
                    message: e.to_string(),
                    details: vec![],
                }
            }
            e => AppError::Internal(e.to_string()),
        }
    }
}

impl From<RouterError> for AppError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::InvalidRequest(m) => AppError::invalid(m),
            RouterError::Downstream {
                level,
                status,
                body,
            } => relay_downstream(level.as_str(), status, &body),
            e @ (RouterError::Unreachable { transient: true, .. }
            | RouterError::Compression { transient: true, .. }) => {
                AppError::UpstreamTimeout(e.to_string())
            }
            e @ (RouterError::Unreachable { .. } | RouterError::Compression { .. }) => {
                AppError::Upstream(e.to_string())
            }
            RouterError::Ingestion(m) => AppError::IngestionFailed {
                message: m,
                details: vec![],
            },
            e @ (RouterError::Config(_) | RouterError::Client(_)) => AppError::Internal(e.to_string()),
        }
    }
}

/// Keeps a level instance's 4xx (and 504) with its envelope code; other
/// downstream failures become `UPSTREAM_ERROR`.
fn relay_downstream(level: &str, status: u16, body: &str) -> AppError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| format!("{level} instance: {}", e.error.message))
        .unwrap_or_else(|| format!("{level} instance returned {status}"));
    match (StatusCode::from_u16(status), parsed) {
        (Ok(s), Some(env)) if s.is_client_error() || s == StatusCode::GATEWAY_TIMEOUT => {
            AppError::Http {
                status: s,
                code: env.error.code,
                message,
            }
        }
        _ => AppError::Upstream(message),
    }
}

#[cfg(test)]
mod tests {
    use query_orchestrator::ResolvedLevel;

    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (
                OrchestratorError::InvalidRequest("x".into()).into(),
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
            ),
            (OrchestratorError::NotFound.into(), StatusCode::NOT_FOUND, "INDEX_NOT_FOUND"),
            (
                OrchestratorError::Upstream {
                    stage: "completion",
                    transient: true,
                    message: "slow".into(),
                }
                .into(),
                StatusCode::GATEWAY_TIMEOUT,
                "UPSTREAM_TIMEOUT",
            ),
            (
                OrchestratorError::Upstream {
                    stage: "completion",
                    transient: false,
                    message: "quota".into(),
                }
                .into(),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
            ),
            (
                RagError::Ingestion("all failed".into()).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "INGESTION_FAILED",
            ),
            (
                RagError::Corrupt("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
            (
                RagError::EmbeddingShape { got: 16, want: 32 }.into(),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
            ),
            (
                OrchestratorError::from(RagError::EmbeddingShape { got: 16, want: 32 }).into(),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn downstream_client_errors_are_relayed() {
        let body = r#"{"success":false,"error":{"code":"INDEX_NOT_FOUND","message":"no index","details":[]}}"#;
        let e = AppError::from(RouterError::Downstream {
            level: ResolvedLevel::Summary,
            status: 404,
            body: body.into(),
        });
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(e.error_code(), "INDEX_NOT_FOUND");

        let e = AppError::from(RouterError::Downstream {
            level: ResolvedLevel::Summary,
            status: 500,
            body: "oops".into(),
        });
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
    }
}
