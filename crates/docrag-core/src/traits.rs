use crate::Result;

/// Dense text encoder. Must return the same vector for the same input and model.
pub trait Embedder: Send + Sync {
    /// Identifies the model; part of the embedding cache key and the snapshot manifest.
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::Error::Operation("embedder returned no vector".into()))
    }
}

/// Pairwise relevance model. Returns one raw logit per `(query, text)` pair, in input order.
pub trait CrossEncoder: Send + Sync {
    fn model_id(&self) -> &str;
    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>>;
}
