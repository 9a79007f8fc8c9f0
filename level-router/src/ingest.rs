//! Multi-level ingestion: originals to technical, compressed text below.

use std::sync::Arc;

use query_orchestrator::{ResolvedLevel, prompt::compress_prompt};
use rag_store::{extract_blocking, sanitize_file_name};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use services::digest::sha256_hex;
use tracing::{info, instrument, warn};

use crate::{LevelRouter, RouterError, forward::read_json};

/// One uploaded document.
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Downstream ingest replies keyed by level.
#[derive(Clone, Debug, Serialize)]
pub struct MultiLevelIngest {
    pub technical: Value,
    pub summary: Value,
    pub general: Value,
}

impl LevelRouter {
    /// Sends the uploads to the technical instance, then feeds a compressed
    /// summary to the summary instance and a further compressed one to the
    /// general instance.
    ///
    /// Steps run in order; the first failing step aborts the call, leaving
    /// earlier levels ingested.
    #[instrument(skip_all, fields(files = uploads.len()))]
    pub async fn ingest_all_levels(
        &self,
        uploads: Vec<Upload>,
    ) -> Result<MultiLevelIngest, RouterError> {
        if uploads.is_empty() {
            return Err(RouterError::InvalidRequest("no files uploaded".into()));
        }
        let mut docs = Vec::with_capacity(uploads.len());
        for u in uploads {
            let name = sanitize_file_name(&u.file_name).ok_or_else(|| {
                RouterError::InvalidRequest(format!(
                    "unsupported upload {:?} (expected .pdf or .txt)",
                    u.file_name
                ))
            })?;
            docs.push(Upload::new(name, u.bytes));
        }

        // 1) originals → technical
        let technical = self.post_files(ResolvedLevel::Technical, &docs).await?;
        info!("technical level ingested");

        // 2) full text, locally extracted
        let full_text = self.extract_text(&docs).await?;
        info!(chars = full_text.chars().count(), "extracted text for compression");

        // 3) technical → summary
        let summary_text = self
            .compress(&full_text, self.cfg.level2_to_1_ratio, ResolvedLevel::Summary)
            .await?;
        let summary_doc = summary_upload("summary_l1", &summary_text);
        let summary = self
            .post_files(ResolvedLevel::Summary, std::slice::from_ref(&summary_doc))
            .await?;
        info!(file = %summary_doc.file_name, "summary level ingested");

        // 4) summary → general
        let general_text = self
            .compress(&summary_text, self.cfg.level1_to_0_ratio, ResolvedLevel::General)
            .await?;
        let general_doc = summary_upload("summary_l0", &general_text);
        let general = self
            .post_files(ResolvedLevel::General, std::slice::from_ref(&general_doc))
            .await?;
        info!(file = %general_doc.file_name, "general level ingested");

        Ok(MultiLevelIngest {
            technical,
            summary,
            general,
        })
    }

    async fn post_files(
        &self,
        level: ResolvedLevel,
        docs: &[Upload],
    ) -> Result<Value, RouterError> {
        let mut form = Form::new();
        for d in docs {
            let part = Part::bytes(d.bytes.clone())
                .file_name(d.file_name.clone())
                .mime_str(mime_for(&d.file_name))?;
            form = form.part("files", part);
        }
        let url = format!("{}/ingest", self.cfg.url(level));
        let resp = self
            .http
            .post(&url)
            .timeout(self.cfg.ingest_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "ingest forward failed");
                RouterError::unreachable(level, &e)
            })?;
        read_json(level, resp).await
    }

    /// Page texts joined per file with `\n`, files joined with a blank line.
    async fn extract_text(&self, docs: &[Upload]) -> Result<String, RouterError> {
        let mut texts = Vec::with_capacity(docs.len());
        for d in docs {
            match extract_blocking(
                Arc::clone(&self.extractor),
                d.file_name.clone(),
                Arc::new(d.bytes.clone()),
            )
            .await
            {
                Ok(pages) => {
                    let text = pages
                        .into_iter()
                        .map(|(_, t)| t)
                        .collect::<Vec<_>>()
                        .join("\n");
                    if !text.trim().is_empty() {
                        texts.push(text);
                    }
                }
                Err(e) => warn!(file = %d.file_name, error = %e, "skipping file for summaries"),
            }
        }
        if texts.is_empty() {
            return Err(RouterError::Ingestion(
                "no text could be extracted for summary levels".into(),
            ));
        }
        Ok(texts.join("\n\n"))
    }

    async fn compress(
        &self,
        text: &str,
        ratio: f64,
        level_to: ResolvedLevel,
    ) -> Result<String, RouterError> {
        let target_chars = ((text.chars().count() as f64) * ratio) as usize;
        let prompt = compress_prompt(text, target_chars.max(1), level_to);
        let timeout = self.cfg.compress_timeout;

        let out = match tokio::time::timeout(
            timeout,
            self.completer.complete(&prompt, self.cfg.summary_max_tokens),
        )
        .await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                return Err(RouterError::Compression {
                    level: level_to,
                    transient: e.is_transient(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(RouterError::Compression {
                    level: level_to,
                    transient: true,
                    message: format!("timed out after {timeout:?}"),
                });
            }
        };
        if out.trim().is_empty() {
            return Err(RouterError::Compression {
                level: level_to,
                transient: false,
                message: "empty summary".into(),
            });
        }
        info!(%level_to, target_chars, got_chars = out.chars().count(), "text compressed");
        Ok(out)
    }
}

/// Summary document named by its content so repeated uploads never clash.
fn summary_upload(prefix: &str, text: &str) -> Upload {
    let digest = sha256_hex(text.as_bytes());
    Upload::new(format!("{prefix}_{}.txt", &digest[..12]), text.as_bytes().to_vec())
}

fn mime_for(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "text/plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_names_follow_content() {
        let a = summary_upload("summary_l1", "alpha");
        let b = summary_upload("summary_l1", "beta");
        assert!(a.file_name.starts_with("summary_l1_") && a.file_name.ends_with(".txt"));
        assert_ne!(a.file_name, b.file_name);
        assert_eq!(a.file_name, summary_upload("summary_l1", "alpha").file_name);
        assert_eq!(mime_for("X.PDF"), "application/pdf");
    }
}
