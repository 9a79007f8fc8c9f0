use axum::{
    extract::Multipart,
    http::{HeaderMap, header},
};
use rag_store::sanitize_file_name;
use serde::Deserialize;

use crate::{
    core::http::response_envelope::ApiErrorDetail,
    error_handler::{AppError, AppResult},
};

/// JSON body for POST /ingest. An absent flag defers to the query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub force_rebuild: Option<bool>,
}

/// Query parameters for POST /ingest.
#[derive(Debug, Default, Deserialize)]
pub struct IngestParams {
    #[serde(default)]
    pub force_rebuild: Option<bool>,
}

/// Parsed multipart upload.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// `(sanitized file name, bytes)` in upload order.
    pub files: Vec<(String, Vec<u8>)>,
    pub force_rebuild: Option<bool>,
}

pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// Reads `files` parts (any part with a file name counts) and an optional
/// `force_rebuild` text part. Unsupported names reject the whole request.
pub async fn read_upload_form(mut mp: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = mp.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(raw) => {
                let Some(name) = sanitize_file_name(&raw) else {
                    return Err(AppError::InvalidRequest {
                        message: format!("unsupported upload {raw:?}: only .pdf and .txt files are accepted"),
                        details: vec![ApiErrorDetail {
                            path: Some(raw),
                            hint: Some("Upload PDF documents in the `files` field.".into()),
                        }],
                    });
                };
                let bytes = field.bytes().await?;
                form.files.push((name, bytes.to_vec()));
            }
            None if field_name == "force_rebuild" => {
                let text = field.text().await?;
                form.force_rebuild = Some(parse_bool(&text).ok_or_else(|| {
                    AppError::invalid(format!("force_rebuild must be true or false, got {text:?}"))
                })?);
            }
            None => {}
        }
    }
    Ok(form)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_booleans() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn absent_body_flag_stays_unset() {
        let body: IngestRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(body.force_rebuild, None);
        let body: IngestRequest = serde_json::from_str(r#"{"force_rebuild":false}"#).unwrap();
        assert_eq!(body.force_rebuild, Some(false));
    }
}
