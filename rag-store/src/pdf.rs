//! Document → `(page_number, text)` extraction.
//!
//! PDFs go through `lopdf`; `.txt` documents (used for generated summaries)
//! are split into pages on form feeds. Extraction is CPU-bound and runs on the
//! blocking pool (see [`extract_blocking`]).

use std::{path::Path, sync::Arc};

use lopdf::Document;
use tracing::{debug, warn};

use crate::{
    errors::RagError,
    normalize::{clean_page_text, is_blank},
};

/// Cleaned, non-empty pages, 1-based and ascending.
pub type Pages = Vec<(u32, String)>;

/// Turns raw document bytes into page text.
pub trait PageExtractor: Send + Sync {
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<Pages, RagError>;
}

/// PDF pages via `lopdf`. A page whose text cannot be decoded is skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct LopdfExtractor;

impl PageExtractor for LopdfExtractor {
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<Pages, RagError> {
        let doc = Document::load_mem(bytes).map_err(|e| RagError::Extract {
            file: file_name.to_string(),
            reason: e.to_string(),
        })?;

        let mut pages = Vec::new();
        for page_no in doc.get_pages().into_keys() {
            match doc.extract_text(&[page_no]) {
                Ok(raw) => {
                    let text = clean_page_text(&raw);
                    if !is_blank(&text) {
                        pages.push((page_no, text));
                    }
                }
                Err(e) => warn!(file = file_name, page = page_no, error = %e, "page text unreadable"),
            }
        }
        debug!(file = file_name, pages = pages.len(), "extracted pdf");
        Ok(pages)
    }
}

/// UTF-8 text, one page per form-feed separated section.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextExtractor;

impl PageExtractor for PlainTextExtractor {
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<Pages, RagError> {
        let s = std::str::from_utf8(bytes).map_err(|e| RagError::Extract {
            file: file_name.to_string(),
            reason: format!("not valid UTF-8: {e}"),
        })?;
        Ok(s.split('\x0c')
            .enumerate()
            .map(|(i, page)| (i as u32 + 1, clean_page_text(page)))
            .filter(|(_, t)| !is_blank(t))
            .collect())
    }
}

/// Dispatches on file extension (`.pdf` / `.txt`, case-insensitive).
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentExtractor;

impl PageExtractor for DocumentExtractor {
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<Pages, RagError> {
        match extension(file_name).as_deref() {
            Some("pdf") => LopdfExtractor.extract(file_name, bytes),
            Some("txt") => PlainTextExtractor.extract(file_name, bytes),
            _ => Err(RagError::Extract {
                file: file_name.to_string(),
                reason: "unsupported file type (expected .pdf or .txt)".into(),
            }),
        }
    }
}

/// Lowercased extension of `file_name`.
pub fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// `true` for names this crate can ingest.
pub fn is_supported(file_name: &str) -> bool {
    matches!(extension(file_name).as_deref(), Some("pdf" | "txt"))
}

/// Runs `extractor` on the blocking pool.
pub async fn extract_blocking(
    extractor: Arc<dyn PageExtractor>,
    file_name: String,
    bytes: Arc<Vec<u8>>,
) -> Result<Pages, RagError> {
    tokio::task::spawn_blocking(move || extractor.extract(&file_name, &bytes))
        .await
        .map_err(|e| RagError::Internal(anyhow::anyhow!("extractor task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_pages_split_on_form_feed() {
        let pages = PlainTextExtractor
            .extract("s.txt", b"first page\x0c\x0c  third \n page ")
            .unwrap();
        assert_eq!(
            pages,
            vec![(1, "first page".to_string()), (3, "third\npage".to_string())]
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = DocumentExtractor.extract("a.docx", b"x").unwrap_err();
        assert!(matches!(err, RagError::Extract { .. }));
        assert!(is_supported("Policy.PDF"));
        assert!(!is_supported("notes"));
    }

    #[test]
    fn garbage_pdf_is_an_extract_error() {
        let err = LopdfExtractor.extract("bad.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, RagError::Extract { ref file, .. } if file == "bad.pdf"));
    }
}
