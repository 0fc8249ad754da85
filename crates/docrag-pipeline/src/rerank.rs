use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use docrag_core::traits::CrossEncoder;
use docrag_core::types::DocumentChunk;
use docrag_core::{Error, Result};

/// Logits are clamped to this magnitude so the sigmoid never rounds to 0 or 1.
const LOGIT_CLAMP: f64 = 30.0;

/// A chunk with its relevance score in (0, 1), highest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankedResult {
    pub chunk: DocumentChunk,
    pub score: f64,
}

/// Logistic normalization of a raw relevance logit. NaN maps to the lowest score.
pub fn sigmoid(logit: f64) -> f64 {
    let x = if logit.is_nan() { -LOGIT_CLAMP } else { logit.clamp(-LOGIT_CLAMP, LOGIT_CLAMP) };
    1.0 / (1.0 + (-x).exp())
}

/// Scores `(query, chunk)` pairs with a cross-encoder and orders by the result.
pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>) -> Self { Self { encoder } }

    pub fn model_id(&self) -> &str { self.encoder.model_id() }

    /// Sorted descending by normalized score; equal scores keep input order.
    /// `top_k` truncates after sorting. An empty input never reaches the model.
    pub fn rerank(&self, query: &str, chunks: Vec<DocumentChunk>, top_k: Option<usize>) -> Result<Vec<RerankedResult>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        let pairs: Vec<(&str, &str)> = chunks.iter().map(|c| (query, c.text.as_str())).collect();
        let logits = self.encoder.predict(&pairs)?;
        if logits.len() != chunks.len() {
            return Err(Error::Scoring(format!(
                "{} returned {} scores for {} pairs",
                self.encoder.model_id(),
                logits.len(),
                chunks.len()
            )));
        }
        let mut results: Vec<RerankedResult> = chunks
            .into_iter()
            .zip(logits)
            .map(|(chunk, logit)| RerankedResult { chunk, score: sigmoid(f64::from(logit)) })
            .collect();
        // sort_by is stable
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(k) = top_k {
            results.truncate(k);
        }
        debug!(
            model = self.encoder.model_id(),
            results = results.len(),
            top = results.first().map(|r| r.score),
            "reranked"
        );
        Ok(results)
    }
}
