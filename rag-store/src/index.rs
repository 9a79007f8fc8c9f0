//! Exact (flat) inner-product index over immutable chunks.

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use crate::{
    config::DistanceKind,
    errors::RagError,
    record::{Chunk, FileEntry, RagHit},
};

/// One immutable generation of the index.
///
/// Published behind an `Arc`; ingestion builds a successor that shares the
/// existing chunk `Arc`s and swaps it in.
#[derive(Clone, Debug)]
pub struct IndexSnapshot {
    /// Chunks in insertion order.
    pub chunks: Vec<Arc<Chunk>>,
    /// Indexed documents by file name.
    pub files: BTreeMap<String, FileEntry>,
    pub dimension: Option<usize>,
    pub distance: DistanceKind,
    pub next_seq: u64,
    /// `false` until an index is loaded from disk or first committed.
    pub initialized: bool,
}

impl IndexSnapshot {
    pub fn empty(distance: DistanceKind) -> Self {
        Self {
            chunks: Vec::new(),
            files: BTreeMap::new(),
            dimension: None,
            distance,
            next_seq: 0,
            initialized: false,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.files.len()
    }

    /// Brings a vector into the form stored in this index.
    pub fn prepare(&self, mut v: Vec<f32>) -> Vec<f32> {
        if self.distance == DistanceKind::Cosine {
            normalize(&mut v);
        }
        v
    }

    /// Top-`k` chunks by descending score; equal scores keep insertion order.
    pub fn search(&self, query: Vec<f32>, k: usize) -> Result<Vec<RagHit>, RagError> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(want) = self.dimension {
            if query.len() != want {
                return Err(RagError::VectorSizeMismatch {
                    got: query.len(),
                    want,
                });
            }
        }
        let q = self.prepare(query);

        let mut scored: Vec<(f32, &Arc<Chunk>)> = self
            .chunks
            .iter()
            .map(|c| (dot(&q, &c.embedding), c))
            .collect();
        scored.sort_by(|a, b| match b.0.total_cmp(&a.0) {
            Ordering::Equal => a.1.seq.cmp(&b.1.seq),
            o => o,
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, c)| RagHit {
                chunk: Arc::clone(c),
                score,
            })
            .collect())
    }
}

/// In-place L2 normalization; zero vectors stay zero.
pub fn normalize(v: &mut [f32]) {
    let n = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if n > 0.0 {
        v.iter_mut().for_each(|x| *x /= n);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
