use std::cmp::Ordering;

use tracing::debug;

use docrag_core::types::ChunkId;
use docrag_core::{Error, Result};

/// One search hit. `position` is the insertion index of the vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub id: ChunkId,
    pub distance: f32,
}

/// Append-only, exact L2 index. Vectors are stored row-major in one buffer.
///
/// The dimensionality is fixed either up front (`with_dim`) or by the first
/// vector added; every later vector and every query must match it.
#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    dim: Option<usize>,
    ids: Vec<ChunkId>,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new() -> Self { Self::default() }

    pub fn with_dim(dim: usize) -> Self { Self { dim: Some(dim), ..Self::default() } }

    pub fn dim(&self) -> Option<usize> { self.dim }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn ids(&self) -> &[ChunkId] { &self.ids }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let dim = self.dim?;
        self.data.get(position * dim..(position + 1) * dim)
    }

    /// Append `vectors` under `ids`. The whole batch is validated before
    /// anything is stored, so a failed call leaves the index unchanged.
    pub fn add(&mut self, vectors: &[Vec<f32>], ids: &[ChunkId]) -> Result<()> {
        if vectors.len() != ids.len() {
            return Err(Error::InvalidInput(format!("{} vectors for {} ids", vectors.len(), ids.len())));
        }
        let Some(first) = vectors.first() else { return Ok(()) };
        let expected = self.dim.unwrap_or(first.len());
        if expected == 0 {
            return Err(Error::InvalidInput("zero-length embedding".into()));
        }
        for v in vectors {
            if v.len() != expected {
                return Err(Error::DimensionMismatch { expected, actual: v.len() });
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(Error::InvalidInput("embedding contains non-finite values".into()));
            }
        }
        self.dim = Some(expected);
        self.data.reserve(vectors.len() * expected);
        for v in vectors { self.data.extend_from_slice(v); }
        self.ids.extend_from_slice(ids);
        debug!(added = vectors.len(), total = self.ids.len(), dim = expected, "vectors added");
        Ok(())
    }

    /// The `k` nearest vectors by Euclidean distance, ascending. Equal
    /// distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let dim = match self.dim {
            Some(dim) if !self.is_empty() => dim,
            _ => return Err(Error::IndexNotBuilt("vector index")),
        };
        if query.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: query.len() });
        }
        let mut scored: Vec<(usize, f32)> =
            self.data.chunks_exact(dim).map(|row| l2_distance(row, query)).enumerate().collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(position, distance)| Neighbor { position, id: self.ids[position].clone(), distance })
            .collect())
    }
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}
