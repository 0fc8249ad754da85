//! Bounded retrieve → rerank → evaluate loop with a confidence gate.
//!
//! Each cycle retrieves candidates for the current query, scores them against
//! the question, and checks the top score against the threshold. Below the
//! threshold the query is reformulated and the cycle repeats, at most
//! `max_loops` times. A cycle that retrieves nothing ends the loop at once.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use docrag_core::Result;
use docrag_hybrid::{HybridRetriever, IndexGeneration, RetrievalCandidate};

use crate::audit::{AuditEvent, AuditTrail};
use crate::generator::ChatMessage;
use crate::reformulate::Reformulator;
use crate::rerank::{RerankedResult, Reranker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Retrieving,
    Reranking,
    Evaluating,
    Sufficient,
    Reformulate,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedReason {
    /// Retrieval returned nothing.
    NoCandidates,
    /// Every cycle stayed below the threshold.
    BelowThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoopOutcome {
    Sufficient { results: Vec<RerankedResult>, iterations: u32, query: String },
    /// `best` is the highest-scoring list seen, kept for inspection only.
    Exhausted { reason: ExhaustedReason, best: Vec<RerankedResult>, iterations: u32 },
}

impl LoopOutcome {
    pub fn iterations(&self) -> u32 {
        match self {
            LoopOutcome::Sufficient { iterations, .. } | LoopOutcome::Exhausted { iterations, .. } => *iterations,
        }
    }

    pub fn is_sufficient(&self) -> bool { matches!(self, LoopOutcome::Sufficient { .. }) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    pub threshold: f64,
    pub max_loops: u32,
}

impl ConfidenceGate {
    /// An empty list is never sufficient.
    pub fn is_sufficient(&self, results: &[RerankedResult]) -> bool {
        results.first().is_some_and(|r| r.score >= self.threshold)
    }
}

fn top_score(results: &[RerankedResult]) -> Option<f64> { results.first().map(|r| r.score) }

pub struct RetrievalLoop {
    retriever: HybridRetriever,
    /// `None` scores candidates by their fused score.
    reranker: Option<Reranker>,
    reformulator: Arc<dyn Reformulator>,
    gate: ConfidenceGate,
}

impl RetrievalLoop {
    pub fn new(
        retriever: HybridRetriever,
        reranker: Option<Reranker>,
        reformulator: Arc<dyn Reformulator>,
        gate: ConfidenceGate,
    ) -> Self {
        Self { retriever, reranker, reformulator, gate }
    }

    pub fn gate(&self) -> ConfidenceGate { self.gate }

    pub fn retriever(&self) -> &HybridRetriever { &self.retriever }

    pub fn reranker(&self) -> Option<&Reranker> { self.reranker.as_ref() }

    /// Score candidates for `question`: cross-encoder when reranking is on,
    /// otherwise the fused score (candidates without one score 0).
    pub fn score(&self, question: &str, candidates: Vec<RetrievalCandidate>) -> Result<Vec<RerankedResult>> {
        match &self.reranker {
            Some(reranker) => reranker.rerank(question, candidates.into_iter().map(|c| c.chunk).collect(), None),
            None => {
                let mut results: Vec<RerankedResult> = candidates
                    .into_iter()
                    .map(|c| RerankedResult { score: f64::from(c.fused_score.unwrap_or(0.0)), chunk: c.chunk })
                    .collect();
                results.sort_by(|a, b| b.score.total_cmp(&a.score));
                Ok(results)
            }
        }
    }

    /// Run the loop against one generation. `query` is what gets retrieved
    /// (possibly expanded); `question` is what candidates are scored against.
    /// Retrieval and scoring errors end the query; insufficiency does not.
    pub async fn run(
        &self,
        generation: &IndexGeneration,
        query: &str,
        question: &str,
        history: &[ChatMessage],
        audit: &mut AuditTrail,
    ) -> Result<LoopOutcome> {
        let mut query = query.to_string();
        let mut best: Vec<RerankedResult> = Vec::new();
        let mut iteration: u32 = 0;
        loop {
            iteration += 1;
            audit.record(AuditEvent::State { iteration, state: LoopState::Retrieving });
            audit.record(AuditEvent::LoopQuery { iteration, query: query.clone() });
            let candidates = self.retriever.retrieve(generation, &query)?;
            audit.record(AuditEvent::Candidates { iteration, ids: candidates.iter().map(|c| c.chunk.id.clone()).collect() });
            if candidates.is_empty() {
                info!(iteration, "no candidates retrieved");
                audit.record(AuditEvent::State { iteration, state: LoopState::Exhausted });
                return Ok(LoopOutcome::Exhausted { reason: ExhaustedReason::NoCandidates, best, iterations: iteration });
            }

            audit.record(AuditEvent::State { iteration, state: LoopState::Reranking });
            let results = self.score(question, candidates)?;
            audit.record(AuditEvent::Reranked {
                iteration,
                ids: results.iter().map(|r| r.chunk.id.clone()).collect(),
                top_score: top_score(&results),
            });

            audit.record(AuditEvent::State { iteration, state: LoopState::Evaluating });
            debug!(iteration, top = ?top_score(&results), threshold = self.gate.threshold, "evaluating");
            if self.gate.is_sufficient(&results) {
                audit.record(AuditEvent::State { iteration, state: LoopState::Sufficient });
                info!(iteration, top = ?top_score(&results), "context sufficient");
                return Ok(LoopOutcome::Sufficient { results, iterations: iteration, query });
            }
            let improved = match (top_score(&results), top_score(&best)) {
                (Some(new), Some(old)) => new > old,
                (Some(_), None) => true,
                _ => false,
            };
            if improved {
                best = results;
            }

            if iteration >= self.gate.max_loops {
                audit.record(AuditEvent::State { iteration, state: LoopState::Exhausted });
                info!(iterations = iteration, best = ?top_score(&best), "confidence threshold never met");
                return Ok(LoopOutcome::Exhausted { reason: ExhaustedReason::BelowThreshold, best, iterations: iteration });
            }

            audit.record(AuditEvent::State { iteration, state: LoopState::Reformulate });
            query = self.reformulator.reformulate(&query, history).await;
            debug!(iteration, query = %query, "reformulated");
            audit.record(AuditEvent::Reformulated { iteration, query: query.clone() });
        }
    }
}
