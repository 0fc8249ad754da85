//! Domain types shared by the lexical, dense and hybrid layers.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Where a chunk came from inside its source document.
///
/// - `doc_id`: stable document identity (hash of the file name)
/// - `filename`: original file name, used for citations
/// - `page_number`: 1-based page the text was taken from
/// - `chunk_index`/`total_chunks`: dense position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub filename: String,
    pub page_number: u32,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A chunk of a source document that is independently indexed.
///
/// `id` must be unique within one index generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { id: id.into(), text: text.into(), metadata }
    }
}

/// Indicates which index surfaced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Dense,
    Lexical,
}

/// How lexical and dense result lists are merged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Lexical ids then dense ids, deduplicated; ordering is left to the reranker.
    #[default]
    SetUnion,
    /// Max-normalized, weighted sum of both scores.
    Weighted,
}

/// Which reformulation / fallback behaviour the pipeline runs with.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    /// Fixed-suffix reformulation, no conversation awareness.
    #[default]
    Classic,
    /// Generator-driven rewrites, vague-question enhancement and a history fallback.
    Conversational,
}

/// One entry of the indexed-documents listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub doc_id: String,
    pub filename: String,
    pub total_chunks: usize,
}
