//! Embedding vector and similarity math.
//!
//! All similarity in the engine is cosine similarity over `f32` vectors.
//! The same provider must produce corpus embeddings, query embeddings, and
//! domain centroids — a dimension mismatch anywhere makes every score
//! meaningless, so mismatches fail fast instead of degrading silently.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// A fixed-length embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn magnitude(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// True when every component is (near) zero — an invalid centroid.
    pub fn is_zero(&self) -> bool {
        self.magnitude() < f32::EPSILON
    }

    /// Cosine similarity in [-1, 1].
    ///
    /// Zero-magnitude operands score 0.0; a dimension mismatch is an
    /// integrity error, never a wrong number.
    pub fn cosine(&self, other: &Embedding) -> Result<f32> {
        if self.dimension() != other.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                got: other.dimension(),
                context: "cosine similarity".into(),
            });
        }
        let dot: f32 = self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum();
        let norm = self.magnitude() * other.magnitude();
        if norm < f32::EPSILON {
            return Ok(0.0);
        }
        Ok(dot / norm)
    }

    /// Cosine distance in [0, 2], used by the clustering pass.
    pub fn cosine_distance(&self, other: &Embedding) -> Result<f32> {
        Ok(1.0 - self.cosine(other)?)
    }

    /// Component-wise mean of a set of same-dimension vectors.
    ///
    /// Returns `None` for an empty set; errors on mixed dimensions.
    pub fn mean<'a, I>(vectors: I) -> Result<Option<Embedding>>
    where
        I: IntoIterator<Item = &'a Embedding>,
    {
        let mut iter = vectors.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let dim = first.dimension();
        let mut sum = first.0.clone();
        let mut count = 1usize;
        for v in iter {
            if v.dimension() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    got: v.dimension(),
                    context: "embedding mean".into(),
                });
            }
            for (s, x) in sum.iter_mut().zip(&v.0) {
                *s += x;
            }
            count += 1;
        }
        for s in sum.iter_mut() {
            *s /= count as f32;
        }
        Ok(Some(Embedding(sum)))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(v: Vec<f32>) -> Self {
        Embedding(v)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
