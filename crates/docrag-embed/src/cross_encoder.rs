use std::collections::BTreeSet;

use docrag_core::traits::CrossEncoder;
use docrag_core::Result;

use crate::words;

const STOP_WORDS: &[&str] = &[
    "a","an","and","are","as","at","be","by","for","from","has","in","is","it","its","of","on","or","that","the","to","was","what","which","who","with",
];

/// Logit from the share of distinct query content words found in the text,
/// mapped linearly onto `[-4, 4]`: full coverage ≈ 0.98 after the sigmoid,
/// no coverage ≈ 0.02.
#[derive(Debug, Default, Clone)]
pub struct TermOverlapCrossEncoder;

impl TermOverlapCrossEncoder {
    pub const MODEL_ID: &'static str = "term-overlap";

    fn logit(query: &str, text: &str) -> f32 {
        let terms: BTreeSet<String> = words(query).filter(|w| !STOP_WORDS.contains(&w.as_str())).collect();
        if terms.is_empty() { return -4.0; }
        let present: BTreeSet<String> = words(text).collect();
        let matched = terms.iter().filter(|t| present.contains(*t)).count();
        8.0 * (matched as f32 / terms.len() as f32) - 4.0
    }
}

impl CrossEncoder for TermOverlapCrossEncoder {
    fn model_id(&self) -> &str { Self::MODEL_ID }

    fn predict(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        Ok(pairs.iter().map(|(q, t)| Self::logit(q, t)).collect())
    }
}
