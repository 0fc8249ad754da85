use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use docrag_core::config::RagSettings;
use docrag_core::traits::Embedder;
use docrag_core::types::{DocumentChunk, FusionPolicy, SourceKind};
use docrag_core::{Error, Result};
use docrag_text::tokenize;

use crate::fusion::{distance_to_similarity, set_union, weighted, FusionWeights};
use crate::generation::IndexGeneration;

/// A chunk proposed for reranking. `fused_score` is only present under
/// weighted fusion; set-union candidates carry no combined score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalCandidate {
    pub chunk: DocumentChunk,
    pub fused_score: Option<f32>,
    pub matched_by: Vec<SourceKind>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrieverConfig {
    pub policy: FusionPolicy,
    pub k_lexical: usize,
    pub k_dense: usize,
    /// Length of the weighted list.
    pub k_fused: usize,
    pub weights: FusionWeights,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { policy: FusionPolicy::SetUnion, k_lexical: 5, k_dense: 5, k_fused: 5, weights: FusionWeights::default() }
    }
}

impl RetrieverConfig {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            policy: settings.fusion,
            k_lexical: settings.top_k_lexical,
            k_dense: settings.top_k_dense,
            k_fused: settings.top_k_retrieval,
            weights: FusionWeights { dense: settings.dense_weight, lexical: settings.lexical_weight },
        }
    }
}

/// Queries both indices of a generation and fuses the two rankings.
pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    config: RetrieverConfig,
}

impl HybridRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, config: RetrieverConfig) -> Self { Self { embedder, config } }

    pub fn config(&self) -> &RetrieverConfig { &self.config }

    /// Candidates for `query`. An empty or unbuilt generation yields an empty
    /// list; a query embedding of the wrong width is a hard error.
    pub fn retrieve(&self, generation: &IndexGeneration, query: &str) -> Result<Vec<RetrievalCandidate>> {
        if generation.is_empty() {
            debug!(generation = generation.id(), "retrieve on empty generation");
            return Ok(Vec::new());
        }
        let tokens = tokenize(query);
        let lexical = match generation.lexical().top_k(&tokens, self.config.k_lexical) {
            Ok(hits) => hits,
            Err(Error::IndexNotBuilt(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let query_vec = self.embedder.embed_one(query)?;
        let dense: Vec<(usize, f32)> = match generation.dense().search(&query_vec, self.config.k_dense) {
            Ok(hits) => hits.into_iter().map(|n| (n.position, distance_to_similarity(n.distance))).collect(),
            Err(Error::IndexNotBuilt(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let candidates: Vec<RetrievalCandidate> = match self.config.policy {
            FusionPolicy::SetUnion => {
                let lexical_ids: Vec<usize> = lexical.iter().map(|(i, _)| *i).collect();
                let dense_ids: Vec<usize> = dense.iter().map(|(i, _)| *i).collect();
                set_union(&lexical_ids, &dense_ids)
                    .into_iter()
                    .filter_map(|pos| {
                        let mut matched_by = Vec::with_capacity(2);
                        if lexical_ids.contains(&pos) { matched_by.push(SourceKind::Lexical); }
                        if dense_ids.contains(&pos) { matched_by.push(SourceKind::Dense); }
                        generation.chunk(pos).map(|c| RetrievalCandidate { chunk: c.clone(), fused_score: None, matched_by })
                    })
                    .collect()
            }
            FusionPolicy::Weighted => weighted(&dense, &lexical, self.config.weights, self.config.k_fused)
                .into_iter()
                .filter_map(|f| {
                    let mut matched_by = Vec::with_capacity(2);
                    if f.lexical_norm.is_some() { matched_by.push(SourceKind::Lexical); }
                    if f.dense_norm.is_some() { matched_by.push(SourceKind::Dense); }
                    generation.chunk(f.id).map(|c| RetrievalCandidate { chunk: c.clone(), fused_score: Some(f.score), matched_by })
                })
                .collect(),
        };
        debug!(
            query,
            lexical = lexical.len(),
            dense = dense.len(),
            candidates = candidates.len(),
            policy = ?self.config.policy,
            "retrieved"
        );
        Ok(candidates)
    }
}
