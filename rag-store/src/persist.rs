//! On-disk layout: a vector file and a metadata file, both JSON.
//!
//! The metadata file is the commit point. It records the SHA-256 of the
//! vector file it belongs to, and the vectors it replaces stay on disk as
//! `<index>.prev` until the new metadata has been renamed into place. A load
//! picks whichever vector file matches the metadata, so an interrupted save
//! leaves the previous generation readable.
//!
//! Commit order:
//! 1. write `<index>.tmp` and `<meta>.tmp` (fsynced)
//! 2. move the committed vectors to `<index>.prev`
//! 3. rename `<index>.tmp` → `<index>`
//! 4. rename `<meta>.tmp` → `<meta>`

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use services::digest::sha256_hex;
use tracing::{debug, info, warn};

use crate::{
    config::{DistanceKind, StoreConfig},
    errors::RagError,
    index::IndexSnapshot,
    record::{Chunk, FileEntry},
};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct VectorFile {
    version: u32,
    distance: DistanceKind,
    dimension: Option<usize>,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct MetaFile {
    version: u32,
    next_id: u64,
    /// Digest of the vector file written in the same commit.
    #[serde(default)]
    vectors_sha256: Option<String>,
    chunks: Vec<Chunk>,
    files: BTreeMap<String, FileEntry>,
}

/// Only the commit pointer of a metadata file.
#[derive(Deserialize)]
struct MetaHead {
    #[serde(default)]
    vectors_sha256: Option<String>,
}

/// Persists `snap` under `cfg.index_dir`.
///
/// On error the previously committed pair is still what [`load`] returns.
pub fn save(cfg: &StoreConfig, snap: &IndexSnapshot) -> Result<(), RagError> {
    fs::create_dir_all(&cfg.index_dir)?;
    let (index_path, meta_path, prev_path) =
        (cfg.index_path(), cfg.meta_path(), cfg.prev_index_path());

    let vectors = VectorFile {
        version: FORMAT_VERSION,
        distance: snap.distance,
        dimension: snap.dimension,
        ids: snap.chunks.iter().map(|c| c.id.clone()).collect(),
        vectors: snap.chunks.iter().map(|c| c.embedding.clone()).collect(),
    };
    let vector_bytes = serde_json::to_vec(&vectors)?;

    let meta = MetaFile {
        version: FORMAT_VERSION,
        next_id: snap.next_seq,
        vectors_sha256: Some(sha256_hex(&vector_bytes)),
        chunks: snap.chunks.iter().map(|c| c.as_ref().clone()).collect(),
        files: snap.files.clone(),
    };
    let meta_bytes = serde_json::to_vec(&meta)?;

    let vector_tmp = write_tmp(&index_path, &vector_bytes)?;
    let meta_tmp = match write_tmp(&meta_path, &meta_bytes) {
        Ok(p) => p,
        Err(e) => {
            let _ = fs::remove_file(&vector_tmp);
            return Err(e);
        }
    };

    // an orphan left by an interrupted commit must not overwrite the
    // committed vectors already parked in `.prev`
    match committed_vectors(cfg)? {
        Some(p) if p == prev_path => {
            warn!(path = %index_path.display(), "discarding uncommitted vector file");
        }
        _ if index_path.exists() => fs::rename(&index_path, &prev_path)?,
        _ => {}
    }
    fs::rename(&vector_tmp, &index_path)?;
    fs::rename(&meta_tmp, &meta_path)?;

    info!(
        vectors = snap.len(),
        files = snap.document_count(),
        dir = %cfg.index_dir.display(),
        "index persisted"
    );
    Ok(())
}

/// Loads the persisted index. `Ok(None)` when no metadata was ever committed.
pub fn load(cfg: &StoreConfig) -> Result<Option<IndexSnapshot>, RagError> {
    let meta_path = cfg.meta_path();
    if !meta_path.exists() {
        if cfg.index_path().exists() {
            warn!(
                path = %cfg.index_path().display(),
                "vector file without metadata; treating the index as never committed"
            );
        }
        return Ok(None);
    }

    let mf: MetaFile = serde_json::from_slice(&fs::read(&meta_path)?)?;
    let vector_bytes = read_matching(cfg, mf.vectors_sha256.as_deref())?;
    let vf: VectorFile = serde_json::from_slice(&vector_bytes)?;

    if vf.vectors.len() != mf.chunks.len() || vf.ids.len() != mf.chunks.len() {
        return Err(RagError::Corrupt(format!(
            "{} vectors but {} chunks",
            vf.vectors.len(),
            mf.chunks.len()
        )));
    }
    if vf.distance != cfg.distance {
        return Err(RagError::Config(format!(
            "index was built with {:?} distance, configured {:?}",
            vf.distance, cfg.distance
        )));
    }

    let mut chunks = Vec::with_capacity(mf.chunks.len());
    for ((mut chunk, id), vector) in mf.chunks.into_iter().zip(vf.ids).zip(vf.vectors) {
        if chunk.id != id {
            return Err(RagError::Corrupt(format!("chunk id {} out of order", chunk.id)));
        }
        if let Some(want) = vf.dimension {
            if vector.len() != want {
                return Err(RagError::VectorSizeMismatch {
                    got: vector.len(),
                    want,
                });
            }
        }
        chunk.embedding = vector;
        chunks.push(Arc::new(chunk));
    }

    debug!(chunks = chunks.len(), "index loaded");
    Ok(Some(IndexSnapshot {
        chunks,
        files: mf.files,
        dimension: vf.dimension,
        distance: vf.distance,
        next_seq: mf.next_id,
        initialized: true,
    }))
}

/// Bytes of the vector file the metadata points at.
///
/// Metadata written before digests were recorded pairs with `<index>` as is.
fn read_matching(cfg: &StoreConfig, want: Option<&str>) -> Result<Vec<u8>, RagError> {
    let Some(want) = want else {
        let path = cfg.index_path();
        if !path.exists() {
            return Err(RagError::Corrupt("metadata exists but the vector file is missing".into()));
        }
        return Ok(fs::read(path)?);
    };

    for path in [cfg.index_path(), cfg.prev_index_path()] {
        if !path.exists() {
            continue;
        }
        let bytes = fs::read(&path)?;
        if sha256_hex(&bytes) == want {
            if path != cfg.index_path() {
                warn!(path = %path.display(), "recovered vectors of the last committed index");
            }
            return Ok(bytes);
        }
    }
    Err(RagError::Corrupt(
        "no vector file matches the committed metadata".into(),
    ))
}

/// Which vector file the current metadata commits to, if any.
fn committed_vectors(cfg: &StoreConfig) -> Result<Option<PathBuf>, RagError> {
    let meta_path = cfg.meta_path();
    if !meta_path.exists() {
        return Ok(None);
    }
    let head: MetaHead = serde_json::from_slice(&fs::read(&meta_path)?)?;
    let Some(want) = head.vectors_sha256 else {
        return Ok(Some(cfg.index_path()));
    };
    for path in [cfg.index_path(), cfg.prev_index_path()] {
        if path.exists() && sha256_hex(&fs::read(&path)?) == want {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf, RagError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    Ok(tmp)
}
