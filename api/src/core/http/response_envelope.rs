use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Error envelope shared by every endpoint:
/// `{ "success": false, "error": { code, message, details } }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ApiError,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable, machine-readable error code (e.g. "INVALID_REQUEST").
    pub code: String,
    /// Human-friendly error message.
    pub message: String,
    /// Fine-grained details (per-field, hints, per-file failures).
    #[serde(default)]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Field path like `question` or a file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Optional hint to help the client fix the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: &str, message: impl Into<String>, details: Vec<ApiErrorDetail>) -> Self {
        Self {
            success: false,
            error: ApiError {
                code: code.to_string(),
                message: message.into(),
                details,
            },
        }
    }

    /// Convert to axum Response.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}
