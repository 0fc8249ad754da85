use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use docrag_core::traits::Embedder;
use docrag_core::Result;

use crate::{l2_normalize, words};

/// Signed feature hashing over words and adjacent word pairs, L2-normalized.
///
/// Texts sharing vocabulary land close together. Not a semantic model.
pub struct HashingEmbedder {
    id: String,
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self::with_id(format!("hashing-{}", dim), dim) }

    pub fn with_id(id: impl Into<String>, dim: usize) -> Self { Self { id: id.into(), dim: dim.max(1) } }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let tokens: Vec<String> = words(text).collect();
        for token in &tokens {
            let (idx, sign) = self.bucket(token);
            v[idx] += sign;
        }
        for pair in tokens.windows(2) {
            let (idx, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            v[idx] += 0.5 * sign;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashingEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

    #[test]
    fn unit_length_and_deterministic() {
        let e = HashingEmbedder::new(64);
        let v = e.embed_batch(&["hello world".into(), "hello world".into()]).unwrap();
        let norm: f32 = v[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert_eq!(v[0], v[1]);
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let e = HashingEmbedder::new(256);
        let q = e.embed_one("termination notice period").unwrap();
        let near = e.embed_one("the notice period before termination").unwrap();
        let far = e.embed_one("citizenship by descent").unwrap();
        assert!(cosine(&q, &near) > cosine(&q, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(8).embed_one("  ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
