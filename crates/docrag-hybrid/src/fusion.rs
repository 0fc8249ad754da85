//! Result fusion strategies
//!
//! Combines a lexical and a dense ranking into one candidate list, either as
//! an order-preserving union or as a max-normalized weighted sum.

use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;

/// Guards max-normalization against an all-zero batch.
pub const EPSILON: f32 = 1e-6;

/// Weights of the dense and lexical components in weighted fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub dense: f32,
    pub lexical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { dense: 0.6, lexical: 0.4 }
    }
}

/// Lexical ids first, then dense ids, keeping the first occurrence of each.
pub fn set_union<T: Clone + Eq + Hash>(lexical: &[T], dense: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(lexical.len() + dense.len());
    lexical.iter().chain(dense).filter(|id| seen.insert((*id).clone())).cloned().collect()
}

/// Divide every score by the batch maximum (plus `EPSILON`). Non-negative
/// input lands in `[0, 1)`.
pub fn normalize_by_max(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(0.0f32, f32::max);
    scores.iter().map(|s| (s / (max + EPSILON)).max(0.0)).collect()
}

/// Dense similarity derived from an L2 distance, in `(0, 1]`.
pub fn distance_to_similarity(distance: f32) -> f32 { 1.0 / (1.0 + distance.max(0.0)) }

/// One entry of a weighted fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore<T> {
    pub id: T,
    pub score: f32,
    pub dense_norm: Option<f32>,
    pub lexical_norm: Option<f32>,
}

/// Weighted-score fusion of two `(id, raw score)` batches, higher is better
/// on both sides. Each batch is max-normalized on its own; a candidate
/// missing from one side gets nothing from it. Sorted descending, equal
/// scores keep first-seen order (dense before lexical), truncated to `k`.
pub fn weighted<T: Clone + Eq + Hash>(
    dense: &[(T, f32)],
    lexical: &[(T, f32)],
    weights: FusionWeights,
    k: usize,
) -> Vec<FusedScore<T>> {
    let dense_norm = normalize_by_max(&dense.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    let lexical_norm = normalize_by_max(&lexical.iter().map(|(_, s)| *s).collect::<Vec<_>>());

    let mut order: Vec<T> = Vec::new();
    let mut parts: HashMap<T, (Option<f32>, Option<f32>)> = HashMap::new();
    for ((id, _), norm) in dense.iter().zip(dense_norm) {
        let entry = parts.entry(id.clone()).or_insert_with(|| {
            order.push(id.clone());
            (None, None)
        });
        entry.0.get_or_insert(norm);
    }
    for ((id, _), norm) in lexical.iter().zip(lexical_norm) {
        let entry = parts.entry(id.clone()).or_insert_with(|| {
            order.push(id.clone());
            (None, None)
        });
        entry.1.get_or_insert(norm);
    }

    let mut fused: Vec<FusedScore<T>> = order
        .into_iter()
        .map(|id| {
            let (d, l) = parts.get(&id).copied().unwrap_or((None, None));
            let score = weights.dense * d.unwrap_or(0.0) + weights.lexical * l.unwrap_or(0.0);
            FusedScore { id, score, dense_norm: d, lexical_norm: l }
        })
        .collect();
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(k);
    fused
}
