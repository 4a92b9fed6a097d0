//! Flat in-memory vector index for similarity search.
//!
//! Stores fixed-dimension float vectors and answers k-nearest-neighbor
//! queries by inner product. Callers are responsible for normalizing
//! vectors to unit length before insertion and before querying, so the
//! inner product behaves as cosine similarity. A zero vector cannot be
//! normalized and should be stored or queried unchanged; it scores 0
//! against everything.

use std::cmp::Ordering;
use thiserror::Error;

/// Errors from vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-dim vectors, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// A flat inner-product index over unit-length vectors.
///
/// Ids are assigned sequentially from 0 in insertion order. The index has
/// no native delete; bounded stores reset and re-add from their retained
/// window instead (see [`VectorIndex::clear`]).
#[derive(Debug, Default)]
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    dimension: Option<usize>,
}

impl VectorIndex {
    /// Create a new empty index. Dimension is pinned by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The pinned vector dimension, if any vector has been inserted.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Add a vector, returning its assigned sequential id.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize, IndexError> {
        match self.dimension {
            Some(expected) if expected != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    found: vector.len(),
                });
            }
            None => self.dimension = Some(vector.len()),
            _ => {}
        }

        let id = self.vectors.len();
        self.vectors.push(vector);
        Ok(id)
    }

    /// Return up to `k` `(id, score)` pairs ranked by descending inner
    /// product. An empty index yields an empty result, never an error; a
    /// query of the wrong dimension likewise yields nothing.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.vectors.is_empty() || k == 0 {
            return Vec::new();
        }
        if self.dimension != Some(query.len()) {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (id, dot(query, v)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Drop all vectors, keeping the pinned dimension. Used by bounded
    /// stores that rebuild the index from their retained window.
    pub fn clear(&mut self) {
        self.vectors.clear();
    }
}

/// Inner product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Normalize a vector to unit length in place.
///
/// Returns false and leaves the vector unchanged if its norm is zero.
pub fn normalize(vector: &mut [f32]) -> bool {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return false;
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    true
}
