use serde::Serialize;

use docrag_core::types::ChunkId;

use crate::retrieval_loop::LoopState;

/// One recorded stage output of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    InitialQuery { query: String },
    EnhancedQuery { query: String },
    ExpandedQuery { query: String },
    State { iteration: u32, state: LoopState },
    LoopQuery { iteration: u32, query: String },
    Candidates { iteration: u32, ids: Vec<ChunkId> },
    Reranked { iteration: u32, ids: Vec<ChunkId>, top_score: Option<f64> },
    Reformulated { iteration: u32, query: String },
}

/// Append-only record of one `answer_query` call. Control flow never reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, event: AuditEvent) { self.events.push(event); }

    pub fn events(&self) -> &[AuditEvent] { &self.events }

    pub fn len(&self) -> usize { self.events.len() }

    pub fn is_empty(&self) -> bool { self.events.is_empty() }

    /// Loop states in the order they were entered.
    pub fn states(&self) -> Vec<LoopState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AuditEvent::State { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }
}
