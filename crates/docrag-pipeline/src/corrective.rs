use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

const MIN_ANSWER_CHARS: usize = 20;
const MIN_SHARED_WORDS: usize = 5;
const HALLUCINATION_PHRASES: [&str; 4] =
    ["based on my knowledge", "as far as i know", "generally speaking", "in my experience"];

/// Result of the post-generation consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub is_consistent: bool,
    pub issues: Vec<String>,
    pub reasoning: String,
}

impl QualityCheck {
    /// A passing check with a fixed explanation, for answers that were not generated from context.
    pub fn skipped(reasoning: impl Into<String>) -> Self {
        Self { is_consistent: true, issues: Vec::new(), reasoning: reasoning.into() }
    }
}

/// Heuristic grounding check over a generated answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectiveLayer;

impl CorrectiveLayer {
    pub fn check(&self, answer: &str, context: &str) -> QualityCheck {
        let mut issues = Vec::new();
        let lower = answer.to_lowercase();

        if answer.trim().chars().count() < MIN_ANSWER_CHARS {
            issues.push("Response is too short".to_string());
        }
        for phrase in HALLUCINATION_PHRASES {
            if lower.contains(phrase) {
                issues.push(format!("Potential hallucination indicator: '{}'", phrase));
            }
        }
        if !context.is_empty() && !lower.contains("cannot answer") {
            let context_lower = context.to_lowercase();
            let context_words: HashSet<&str> = context_lower.split_whitespace().collect();
            let shared = lower.split_whitespace().collect::<HashSet<_>>().intersection(&context_words).count();
            if shared < MIN_SHARED_WORDS {
                issues.push("Response may not be grounded in context".to_string());
            }
        }

        let is_consistent = issues.is_empty();
        debug!(is_consistent, issues = issues.len(), "quality check");
        QualityCheck {
            is_consistent,
            issues,
            reasoning: if is_consistent { "Passed basic quality checks" } else { "Quality issues detected" }.to_string(),
        }
    }
}
