use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use docrag_core::chunking::Chunker;
use docrag_core::config::RagSettings;
use docrag_core::traits::CrossEncoder;
use docrag_core::types::{ChunkMetadata, DocumentChunk, IndexedDocument, PipelineVariant};
use docrag_core::Result;
use docrag_hybrid::{HybridRetriever, IndexStore, RetrieverConfig};

use crate::audit::{AuditEvent, AuditTrail};
use crate::citations::link_citations;
use crate::corrective::{CorrectiveLayer, QualityCheck};
use crate::enhance::{Enhancement, QueryEnhancer};
use crate::expansion::KnowledgeExpander;
use crate::generator::{generate_with_timeout, ChatMessage, Generator};
use crate::prompt::{build_context, grounded_user_prompt, is_context_based, GROUNDED_SYSTEM_PROMPT, HISTORY_SYSTEM_PROMPT, NO_CONTEXT_ANSWER};
use crate::reformulate::{ConversationalReformulator, Reformulator, SuffixReformulator};
use crate::rerank::{RerankedResult, Reranker};
use crate::retrieval_loop::{ConfidenceGate, ExhaustedReason, LoopOutcome, RetrievalLoop};

/// How an answer came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Generated from context that passed the confidence gate.
    Grounded,
    /// The gate was never satisfied; the fixed no-context answer was returned.
    InsufficientContext,
    /// The gate was never satisfied; answered from earlier conversation turns.
    FromHistory,
}

/// A context chunk as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Rounded to 3 decimals.
    pub score: f64,
    pub page_number: u32,
}

impl Source {
    fn from_result(result: &RerankedResult) -> Self {
        Self {
            text: result.chunk.text.clone(),
            metadata: result.chunk.metadata.clone(),
            score: (result.score * 1000.0).round() / 1000.0,
            page_number: result.chunk.metadata.page_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub outcome: AnswerOutcome,
    pub sources: Vec<Source>,
    pub is_context_based: bool,
    pub quality_check: QualityCheck,
    /// Retrieval cycles run by the confidence loop.
    pub iterations: u32,
    pub audit: AuditTrail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub generation: u64,
}

/// Question answering over the documents held by an [`IndexStore`].
///
/// Queries read whatever generation is current when they start and keep
/// it for their whole run; ingestion swaps in a new one.
pub struct RagPipeline {
    settings: RagSettings,
    store: Arc<IndexStore>,
    retrieval: RetrievalLoop,
    enhancer: Option<QueryEnhancer>,
    expander: KnowledgeExpander,
    generator: Arc<dyn Generator>,
    corrective: CorrectiveLayer,
}

impl RagPipeline {
    pub fn new(
        settings: RagSettings,
        store: Arc<IndexStore>,
        cross_encoder: Arc<dyn CrossEncoder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        settings.validate()?;
        let timeout = settings.generation_timeout();
        let retriever = HybridRetriever::new(Arc::clone(store.embedder()), RetrieverConfig::from_settings(&settings));
        let reranker = settings.rerank.then(|| Reranker::new(cross_encoder));
        let suffix = SuffixReformulator::new(settings.reformulation_suffix.clone());
        let (reformulator, enhancer): (Arc<dyn Reformulator>, Option<QueryEnhancer>) = match settings.variant {
            PipelineVariant::Classic => (Arc::new(suffix), None),
            PipelineVariant::Conversational => (
                Arc::new(ConversationalReformulator::new(Arc::clone(&generator), timeout, settings.history_turns, suffix)),
                Some(QueryEnhancer::new(Arc::clone(&generator), timeout, settings.history_turns, settings.vague_word_limit)),
            ),
        };
        let gate = ConfidenceGate { threshold: settings.confidence_threshold, max_loops: settings.max_retrieval_loops };
        info!(
            variant = ?settings.variant,
            fusion = ?settings.fusion,
            rerank = settings.rerank,
            generator = generator.model_id(),
            "pipeline ready"
        );
        Ok(Self {
            expander: KnowledgeExpander::new(&settings.expansion),
            retrieval: RetrievalLoop::new(retriever, reranker, reformulator, gate),
            enhancer,
            generator,
            corrective: CorrectiveLayer,
            store,
            settings,
        })
    }

    /// Pipeline over a fresh store using the embedder and cross-encoder named in `settings`.
    pub fn from_settings(settings: RagSettings, generator: Arc<dyn Generator>) -> Result<Self> {
        let embedder = docrag_embed::get_default_embedder(&settings)?;
        let cross_encoder = docrag_embed::get_default_cross_encoder(&settings)?;
        Self::new(settings, Arc::new(IndexStore::new(embedder)), cross_encoder, generator)
    }

    pub fn settings(&self) -> &RagSettings { &self.settings }

    pub fn store(&self) -> &Arc<IndexStore> { &self.store }

    pub fn retrieval(&self) -> &RetrievalLoop { &self.retrieval }

    pub fn ingest(&self, chunks: Vec<DocumentChunk>) -> Result<IngestReport> {
        let chunk_count = chunks.len();
        let mut doc_ids: Vec<&str> = chunks.iter().map(|c| c.metadata.doc_id.as_str()).collect();
        doc_ids.sort_unstable();
        doc_ids.dedup();
        let documents = doc_ids.len();
        let generation = self.store.add_documents(chunks)?;
        info!(documents, chunks = chunk_count, generation = generation.id(), "ingested");
        Ok(IngestReport { documents, chunks: chunk_count, generation: generation.id() })
    }

    /// Chunk and ingest every `.txt` file under `dir`.
    pub fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        let chunks = Chunker::from_settings(&self.settings)?.process_directory(dir)?;
        self.ingest(chunks)
    }

    pub fn documents(&self) -> Vec<IndexedDocument> { self.store.current().documents() }

    fn timeout(&self) -> Duration { self.settings.generation_timeout() }

    /// Answer `question`, with `history` holding earlier turns (oldest first).
    ///
    /// Insufficient context is a normal response, not an error. Generation
    /// failures on the grounded path are returned to the caller.
    pub async fn answer_query(&self, question: &str, history: &[ChatMessage]) -> Result<QueryResponse> {
        let mut audit = AuditTrail::new();
        audit.record(AuditEvent::InitialQuery { query: question.to_string() });

        let standalone = match &self.enhancer {
            Some(enhancer) => enhancer.enhance(question, history).await,
            None => Enhancement::Unchanged(question.to_string()),
        };
        if !matches!(standalone, Enhancement::Unchanged(_)) {
            audit.record(AuditEvent::EnhancedQuery { query: standalone.query().to_string() });
        }
        let standalone = standalone.into_query();
        let expanded = self.expander.expand(&standalone);
        if expanded != standalone {
            audit.record(AuditEvent::ExpandedQuery { query: expanded.clone() });
        }

        let generation = self.store.current();
        let outcome = self.retrieval.run(&generation, &expanded, &standalone, history, &mut audit).await?;
        let iterations = outcome.iterations();

        match outcome {
            LoopOutcome::Sufficient { results, .. } => {
                self.grounded_answer(question, &standalone, history, results, iterations, audit).await
            }
            LoopOutcome::Exhausted { reason, .. } => {
                if self.settings.variant == PipelineVariant::Conversational && !history.is_empty() {
                    if let Some(answer) = self.answer_from_history(question, history).await {
                        return Ok(QueryResponse {
                            query: question.to_string(),
                            answer,
                            outcome: AnswerOutcome::FromHistory,
                            sources: Vec::new(),
                            is_context_based: false,
                            quality_check: QualityCheck::skipped("Answered from conversation history"),
                            iterations,
                            audit,
                        });
                    }
                }
                if reason == ExhaustedReason::NoCandidates {
                    info!("no documents retrieved");
                }
                Ok(no_context_response(question, iterations, audit))
            }
        }
    }

    async fn grounded_answer(
        &self,
        question: &str,
        standalone: &str,
        history: &[ChatMessage],
        results: Vec<RerankedResult>,
        iterations: u32,
        audit: AuditTrail,
    ) -> Result<QueryResponse> {
        let threshold = self.settings.confidence_threshold;
        let context_results: Vec<RerankedResult> = results
            .into_iter()
            .filter(|r| self.settings.variant == PipelineVariant::Classic || r.score >= threshold)
            .take(self.settings.top_k_reranked)
            .collect();
        let chunks: Vec<&DocumentChunk> = context_results.iter().map(|r| &r.chunk).collect();
        let context = build_context(&chunks);

        let mut messages: Vec<ChatMessage> = match self.settings.variant {
            PipelineVariant::Classic => Vec::new(),
            PipelineVariant::Conversational => history.to_vec(),
        };
        messages.push(ChatMessage::user(grounded_user_prompt(&context, standalone)));
        let raw = generate_with_timeout(self.generator.as_ref(), self.timeout(), GROUNDED_SYSTEM_PROMPT, &messages).await?;

        let context_text = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n");
        let quality_check = self.corrective.check(&raw, &context_text);
        if !quality_check.is_consistent {
            warn!(issues = ?quality_check.issues, "answer failed quality check");
        }
        let answer = link_citations(&raw, &chunks);
        Ok(QueryResponse {
            query: question.to_string(),
            is_context_based: is_context_based(&answer),
            answer,
            outcome: AnswerOutcome::Grounded,
            sources: context_results.iter().map(Source::from_result).collect(),
            quality_check,
            iterations,
            audit,
        })
    }

    /// One attempt at answering from the conversation alone. `None` sends
    /// the caller to the no-context answer.
    async fn answer_from_history(&self, question: &str, history: &[ChatMessage]) -> Option<String> {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(question));
        match generate_with_timeout(self.generator.as_ref(), self.timeout(), HISTORY_SYSTEM_PROMPT, &messages).await {
            Ok(answer) => {
                info!("answered from conversation history");
                Some(answer)
            }
            Err(e) => {
                warn!(error = %e, "history fallback failed");
                None
            }
        }
    }
}

fn no_context_response(question: &str, iterations: u32, audit: AuditTrail) -> QueryResponse {
    QueryResponse {
        query: question.to_string(),
        answer: NO_CONTEXT_ANSWER.to_string(),
        outcome: AnswerOutcome::InsufficientContext,
        sources: Vec::new(),
        is_context_based: false,
        quality_check: QualityCheck::skipped("No context available"),
        iterations,
        audit,
    }
}
