//! Question answering on top of hybrid retrieval.
//!
//! A query is optionally rewritten (`enhance`) and expanded (`expansion`),
//! then run through the confidence-gated `retrieval_loop`. Sufficient context
//! goes to the `generator`; the answer is checked (`corrective`) and its
//! citations linked (`citations`). Everything else ends in an explicit
//! cannot-answer response.
pub mod audit;
pub mod citations;
pub mod corrective;
pub mod enhance;
pub mod expansion;
pub mod extractive;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod reformulate;
pub mod rerank;
pub mod retrieval_loop;

pub use audit::{AuditEvent, AuditTrail};
pub use corrective::{CorrectiveLayer, QualityCheck};
pub use enhance::{Enhancement, QueryEnhancer};
pub use expansion::KnowledgeExpander;
pub use extractive::ExtractiveGenerator;
pub use generator::{generate_with_timeout, ChatMessage, Generator, Role};
pub use pipeline::{AnswerOutcome, IngestReport, QueryResponse, RagPipeline, Source};
pub use reformulate::{ConversationalReformulator, Reformulator, SuffixReformulator};
pub use rerank::{sigmoid, RerankedResult, Reranker};
pub use retrieval_loop::{ConfidenceGate, ExhaustedReason, LoopOutcome, LoopState, RetrievalLoop};
