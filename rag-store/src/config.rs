//! Store, chunking and embedding configuration.

use std::path::PathBuf;

use crate::errors::RagError;

/// Similarity function of the flat index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceKind {
    /// Inner product over L2-normalized vectors (default).
    Cosine,
    /// Raw inner product.
    Dot,
}

/// Configuration for ingestion, persistence and retrieval.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding the index and metadata files.
    pub index_dir: PathBuf,
    /// Directory scanned for source documents (and where uploads are saved).
    pub pdfs_dir: PathBuf,
    /// Vector file name inside `index_dir`.
    pub index_file_name: String,
    /// Metadata file name inside `index_dir`.
    pub meta_file_name: String,
    pub distance: DistanceKind,
    /// Chunk window in characters.
    pub chunk_size: usize,
    /// Characters carried from the end of one chunk into the next.
    pub chunk_overlap: usize,
    /// Max in-flight embedding calls.
    pub embed_concurrency: usize,
    /// If set, every embedding must have exactly this length.
    pub embedding_dim: Option<usize>,
    /// Draw an `indicatif` progress bar while embedding.
    pub show_progress: bool,
}

impl StoreConfig {
    /// Defaults rooted at the given directories.
    pub fn new_default(index_dir: impl Into<PathBuf>, pdfs_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            pdfs_dir: pdfs_dir.into(),
            index_file_name: "vectors.json".into(),
            meta_file_name: "metadata.json".into(),
            distance: DistanceKind::Cosine,
            chunk_size: 1200,
            chunk_overlap: 200,
            embed_concurrency: 4,
            embedding_dim: None,
            show_progress: false,
        }
    }

    /// Reads the config from environment, falling back to defaults.
    pub fn from_env() -> Result<Self, RagError> {
        let mut cfg = Self::new_default(
            env("INDEX_DIR", "data/index"),
            env("PDFS_DIR", "data/pdfs"),
        );
        cfg.index_file_name = env("INDEX_FILE_NAME", &cfg.index_file_name);
        cfg.meta_file_name = env("META_FILE_NAME", &cfg.meta_file_name);
        cfg.distance = match env("INDEX_DISTANCE", "cosine").to_ascii_lowercase().as_str() {
            "cosine" => DistanceKind::Cosine,
            "dot" => DistanceKind::Dot,
            other => return Err(RagError::Config(format!("unknown INDEX_DISTANCE: {other}"))),
        };
        cfg.chunk_size = parse("CHUNK_SIZE", cfg.chunk_size)?;
        cfg.chunk_overlap = parse("CHUNK_OVERLAP", cfg.chunk_overlap)?;
        cfg.embed_concurrency = parse("EMBED_CONCURRENCY", cfg.embed_concurrency)?;
        cfg.embedding_dim = match std::env::var("EMBEDDING_DIM") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse()
                    .map_err(|_| RagError::Config("EMBEDDING_DIM must be an integer".into()))?,
            ),
            _ => None,
        };
        cfg.show_progress = parse("INGEST_PROGRESS", false)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_dir.join(&self.index_file_name)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.index_dir.join(&self.meta_file_name)
    }

    /// Vector file kept from the previous commit until new metadata lands.
    pub fn prev_index_path(&self) -> PathBuf {
        self.index_dir.join(format!("{}.prev", self.index_file_name))
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(
                "chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(RagError::Config("embed_concurrency must be > 0".into()));
        }
        if self.index_file_name.trim().is_empty() || self.meta_file_name.trim().is_empty() {
            return Err(RagError::Config("index file names must not be empty".into()));
        }
        if self.index_file_name == self.meta_file_name {
            return Err(RagError::Config(
                "index and metadata files must differ".into(),
            ));
        }
        Ok(())
    }
}

fn env(k: &str, default: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, default: T) -> Result<T, RagError> {
    match std::env::var(k) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| RagError::Config(format!("invalid value for {k}: {v}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_must_fit_in_window() {
        let mut cfg = StoreConfig::new_default("i", "p");
        assert!(cfg.validate().is_ok());
        cfg.chunk_overlap = cfg.chunk_size;
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));
    }
}
