//! Locating source documents and placing uploads.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::pdf::is_supported;

/// Supported documents directly under `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn list_documents(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, std::io::Error> {
    let dir = dir.as_ref();
    trace!("discovery::list_documents dir={:?}", dir);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_supported(name) {
                out.push(entry.path());
            }
        }
    }
    out.sort();
    debug!(count = out.len(), "discovery::list_documents");
    Ok(out)
}

/// Reduces a client-supplied name to its final path component.
///
/// Returns `None` for empty names, `.`/`..`, and unsupported extensions.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." || !is_supported(name) {
        return None;
    }
    Some(name.to_string())
}
