//! Embedding and cross-encoder providers.
//!
//! The model-backed providers live outside this workspace; what ships here
//! is deterministic and offline: a feature-hashing embedder, a term-overlap
//! cross-encoder and a content-hash cache that wraps any embedder.
use std::sync::Arc;

use docrag_core::config::RagSettings;
use docrag_core::traits::{CrossEncoder, Embedder};
use docrag_core::{Error, Result};

pub mod cache;
pub mod cross_encoder;
pub mod hashing;

pub use cache::{CacheStats, CachedEmbedder};
pub use cross_encoder::TermOverlapCrossEncoder;
pub use hashing::HashingEmbedder;

pub fn get_default_embedder(settings: &RagSettings) -> Result<Arc<dyn Embedder>> {
    if settings.embedding_model.starts_with("hashing") {
        tracing::info!(model = %settings.embedding_model, dim = settings.embedding_dim, "using hashing embedder");
        let inner = HashingEmbedder::with_id(settings.embedding_model.clone(), settings.embedding_dim);
        return Ok(Arc::new(CachedEmbedder::new(inner)));
    }
    Err(Error::InvalidConfig(format!("no embedding provider registered for '{}'", settings.embedding_model)))
}

pub fn get_default_cross_encoder(settings: &RagSettings) -> Result<Arc<dyn CrossEncoder>> {
    match settings.reranker_model.as_str() {
        TermOverlapCrossEncoder::MODEL_ID => Ok(Arc::new(TermOverlapCrossEncoder::default())),
        other => Err(Error::InvalidConfig(format!("no cross-encoder registered for '{}'", other))),
    }
}

/// Scale `v` to unit length in place. All-zero vectors are left as they are.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 { for x in v.iter_mut() { *x /= norm; } }
}

/// Lowercased alphanumeric words.
pub(crate) fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).map(str::to_lowercase)
}
