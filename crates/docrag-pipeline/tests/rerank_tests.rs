use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docrag_core::traits::CrossEncoder;
use docrag_core::types::{ChunkMetadata, DocumentChunk};
use docrag_core::Error;
use docrag_pipeline::{sigmoid, Reranker};
use proptest::prelude::*;

/// Returns preset logits and counts calls.
struct ScriptedEncoder {
    logits: Vec<f32>,
    calls: AtomicUsize,
}

impl ScriptedEncoder {
    fn new(logits: Vec<f32>) -> Arc<Self> { Arc::new(Self { logits, calls: AtomicUsize::new(0) }) }
}

impl CrossEncoder for ScriptedEncoder {
    fn model_id(&self) -> &str { "scripted" }

    fn predict(&self, pairs: &[(&str, &str)]) -> docrag_core::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.logits.iter().copied().take(pairs.len()).collect())
    }
}

fn chunks(n: usize) -> Vec<DocumentChunk> {
    (0..n)
        .map(|i| {
            DocumentChunk::new(
                format!("c{i}"),
                format!("text {i}"),
                ChunkMetadata { doc_id: "d".into(), filename: "d.txt".into(), page_number: 1, chunk_index: i, total_chunks: n },
            )
        })
        .collect()
}

fn ids(results: &[docrag_pipeline::RerankedResult]) -> Vec<&str> {
    results.iter().map(|r| r.chunk.id.as_str()).collect()
}

#[test]
fn orders_by_score_and_keeps_input_order_on_ties() {
    let encoder = ScriptedEncoder::new(vec![0.0, 2.0, 0.0, -1.0, 2.0]);
    let reranker = Reranker::new(encoder);
    let results = reranker.rerank("q", chunks(5), None).expect("rerank");
    assert_eq!(ids(&results), vec!["c1", "c4", "c0", "c2", "c3"]);
    assert!((results[2].score - 0.5).abs() < 1e-12);
}

#[test]
fn top_k_truncates_after_sorting() {
    let reranker = Reranker::new(ScriptedEncoder::new(vec![-3.0, 1.0, 3.0]));
    let results = reranker.rerank("q", chunks(3), Some(2)).expect("rerank");
    assert_eq!(ids(&results), vec!["c2", "c1"]);
}

#[test]
fn empty_input_never_calls_the_model() {
    let encoder = ScriptedEncoder::new(vec![1.0]);
    let reranker = Reranker::new(encoder.clone());
    assert!(reranker.rerank("q", Vec::new(), Some(3)).expect("rerank").is_empty());
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn short_score_list_is_a_scoring_error() {
    let reranker = Reranker::new(ScriptedEncoder::new(vec![1.0]));
    let err = reranker.rerank("q", chunks(2), None).unwrap_err();
    assert!(matches!(err, Error::Scoring(_)));
}

#[test]
fn reranking_is_deterministic() {
    let reranker = Reranker::new(Arc::new(docrag_embed::TermOverlapCrossEncoder));
    let docs = vec![
        DocumentChunk::new("a", "notice period of thirty days", chunks(1)[0].metadata.clone()),
        DocumentChunk::new("b", "notice must be written", chunks(1)[0].metadata.clone()),
        DocumentChunk::new("c", "parliament has two houses", chunks(1)[0].metadata.clone()),
    ];
    let first = reranker.rerank("notice period", docs.clone(), None).expect("rerank");
    for _ in 0..5 {
        assert_eq!(reranker.rerank("notice period", docs.clone(), None).expect("rerank"), first);
    }
    assert_eq!(ids(&first), vec!["a", "b", "c"]);
}

proptest! {
    #[test]
    fn sigmoid_stays_strictly_inside_unit_interval(x in prop::num::f32::ANY) {
        let s = sigmoid(f64::from(x));
        prop_assert!(s > 0.0 && s < 1.0, "sigmoid({x}) = {s}");
    }

    #[test]
    fn sigmoid_preserves_logit_order(a in -50.0f32..50.0, b in -50.0f32..50.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(sigmoid(f64::from(lo)) <= sigmoid(f64::from(hi)));
    }

    #[test]
    fn reranked_scores_are_sorted(logits in prop::collection::vec(-20.0f32..20.0, 0..16)) {
        let n = logits.len();
        let reranker = Reranker::new(ScriptedEncoder::new(logits));
        let results = reranker.rerank("q", chunks(n), None).unwrap();
        prop_assert_eq!(results.len(), n);
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
