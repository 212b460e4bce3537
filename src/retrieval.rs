//! Cosine top-K retrieval over cached endpoint embeddings.
//!
//! The index is rebuilt from a [`CacheEntry`]: it packs the entry's
//! vectors into a dense matrix and precomputes row norms so ranking a
//! query is one dot product per endpoint. Ranking is a pure function of
//! (entry, query vector, k): same inputs, same output, always.

use crate::error::{AppError, Result};
use crate::persistence::CacheEntry;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::sync::Arc;

/// One retrieved endpoint with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEndpoint {
    /// Position of the endpoint in the cache entry's descriptor order
    pub index: usize,
    pub method: String,
    pub path: String,
    pub summary: String,
    pub description: String,
    pub score: f32,
}

/// In-memory ranking structure over one cache entry's vectors.
pub struct RetrievalIndex {
    entry: Arc<CacheEntry>,
    matrix: Array2<f32>,
    norms: Vec<f32>,
}

impl RetrievalIndex {
    /// Build the index from a complete cache entry.
    ///
    /// The store only hands out entries satisfying the completeness
    /// invariant, so a dimension inconsistency here means the entry was
    /// tampered with after load, surfaced as `CacheCorrupt` rather than
    /// silently mis-ranked.
    pub fn build(entry: Arc<CacheEntry>) -> Result<Self> {
        let rows = entry.embeddings.len();
        let dim = entry.embedding_dim();

        let mut flat = Vec::with_capacity(rows * dim);
        for vector in &entry.embeddings {
            if vector.len() != dim {
                return Err(AppError::CacheCorrupt(format!(
                    "vector of dimension {} in an entry of dimension {dim}",
                    vector.len()
                )));
            }
            flat.extend_from_slice(vector);
        }

        let matrix = Array2::from_shape_vec((rows, dim), flat)
            .map_err(|e| AppError::CacheCorrupt(format!("failed to shape embeddings: {e}")))?;

        let norms = matrix
            .outer_iter()
            .map(|row| row.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect();

        Ok(Self {
            entry,
            matrix,
            norms,
        })
    }

    /// Rank all endpoints against `query`, descending by cosine similarity,
    /// and return the first `min(k, M)`.
    ///
    /// Ties keep the entry's descriptor order (stable sort), so identical
    /// inputs always produce byte-identical results.
    pub fn rank(&self, query: &[f32], k: usize) -> Result<Vec<RankedEndpoint>> {
        if self.matrix.nrows() == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.matrix.ncols() {
            return Err(AppError::Embedding(format!(
                "query vector dimension {} does not match cached dimension {}",
                query.len(),
                self.matrix.ncols()
            )));
        }

        let query = Array1::from_vec(query.to_vec());
        let query_norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();

        let mut scored: Vec<(usize, f32)> = self
            .matrix
            .outer_iter()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(i, (row, &norm))| (i, cosine(query.dot(&row), query_norm, norm)))
            .collect();

        // sort_by is stable: equal scores keep descriptor order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(index, score)| {
                let ep = &self.entry.endpoints[index];
                RankedEndpoint {
                    index,
                    method: ep.method.clone(),
                    path: ep.path.clone(),
                    summary: ep.summary.clone(),
                    description: ep.description.clone(),
                    score,
                }
            })
            .collect())
    }

    /// Number of endpoints in the index.
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }
}

/// Cosine similarity from a precomputed dot product and the two norms.
/// A zero-magnitude vector on either side is maximally dissimilar by
/// convention: -1.0, never a division by zero.
fn cosine(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return -1.0;
    }
    dot / (norm_a * norm_b)
}
