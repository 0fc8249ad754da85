//! In-process embedding cache keyed by `(embedder_id, blake3(text))`.
//!
//! Consulted before calling the wrapped provider and written through on
//! misses, so a full index rebuild only encodes chunks it has not seen.
//! The map holds at most `capacity` vectors; the oldest insertions are
//! evicted first, so per-query embeddings cannot grow it without bound.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use docrag_core::traits::Embedder;
use docrag_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

pub const DEFAULT_CAPACITY: usize = 50_000;

#[derive(Default)]
struct Entries {
    vectors: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
}

impl Entries {
    fn insert(&mut self, key: String, vector: Vec<f32>, capacity: usize) {
        if self.vectors.insert(key.clone(), vector).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.vectors.remove(&oldest);
            }
        }
    }
}

pub struct CachedEmbedder<E> {
    inner: E,
    capacity: usize,
    entries: Mutex<Entries>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E) -> Self { Self::with_capacity(inner, DEFAULT_CAPACITY) }

    pub fn with_capacity(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize { self.entries.lock().vectors.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn stats(&self) -> CacheStats {
        CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed) }
    }

    fn key(&self, text: &str) -> String { format!("{}:{}", self.inner.embedder_id(), content_hash(text)) }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }

    fn dim(&self) -> usize { self.inner.dim() }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| self.key(t)).collect();
        let mut out: Vec<Option<Vec<f32>>> = {
            let entries = self.entries.lock();
            keys.iter().map(|k| entries.vectors.get(k).cloned()).collect()
        };
        let missing: Vec<usize> = (0..texts.len()).filter(|&i| out[i].is_none()).collect();
        self.hits.fetch_add(texts.len() - missing.len(), Ordering::Relaxed);
        self.misses.fetch_add(missing.len(), Ordering::Relaxed);

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed_batch(&batch)?;
            if vectors.len() != batch.len() {
                return Err(Error::Operation(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            let mut entries = self.entries.lock();
            for (&i, v) in missing.iter().zip(vectors) {
                entries.insert(keys[i].clone(), v.clone(), self.capacity);
                out[i] = Some(v);
            }
            debug!(encoded = batch.len(), cached = texts.len() - batch.len(), "embedding batch");
        }
        out.into_iter()
            .map(|v| v.ok_or_else(|| Error::Operation("embedding cache slot left empty".into())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashingEmbedder;

    #[test]
    fn second_pass_is_served_from_cache() {
        let cached = CachedEmbedder::new(HashingEmbedder::new(32));
        let texts = vec!["a b".to_string(), "c d".to_string()];
        let first = cached.embed_batch(&texts).unwrap();
        assert_eq!(cached.stats(), CacheStats { hits: 0, misses: 2 });

        let mixed = vec!["c d".to_string(), "e f".to_string(), "a b".to_string()];
        let second = cached.embed_batch(&mixed).unwrap();
        assert_eq!(cached.stats(), CacheStats { hits: 2, misses: 3 });
        assert_eq!(second[0], first[1]);
        assert_eq!(second[2], first[0]);
    }

    #[test]
    fn entry_count_stays_within_capacity() {
        let cached = CachedEmbedder::with_capacity(HashingEmbedder::new(16), 100);
        for i in 0..5000 {
            cached.embed_one(&format!("query number {i} legal precedent")).unwrap();
        }
        assert_eq!(cached.len(), 100);

        // the newest entries survive, the oldest were evicted
        cached.embed_one("query number 4999 legal precedent").unwrap();
        cached.embed_one("query number 0 legal precedent").unwrap();
        assert_eq!(cached.stats(), CacheStats { hits: 1, misses: 5001 });
        assert_eq!(cached.len(), 100);
    }
}
