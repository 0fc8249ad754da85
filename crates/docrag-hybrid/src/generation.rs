use std::collections::HashSet;

use tracing::info;

use docrag_core::traits::Embedder;
use docrag_core::types::{DocumentChunk, IndexedDocument};
use docrag_core::{Error, Result};
use docrag_text::{tokenize, LexicalIndex};
use docrag_vector::FlatL2Index;

/// One immutable, internally consistent build of the chunk list and both
/// indices. Position `i` means the same chunk in `chunks`, `dense` and
/// `lexical`.
#[derive(Debug)]
pub struct IndexGeneration {
    id: u64,
    embedder_id: String,
    chunks: Vec<DocumentChunk>,
    tokens: Vec<Vec<String>>,
    dense: FlatL2Index,
    lexical: LexicalIndex,
}

impl IndexGeneration {
    /// A generation with nothing indexed. Both indices are unbuilt.
    pub fn empty(id: u64, embedder_id: impl Into<String>) -> Self {
        Self {
            id,
            embedder_id: embedder_id.into(),
            chunks: Vec::new(),
            tokens: Vec::new(),
            dense: FlatL2Index::new(),
            lexical: LexicalIndex::new(),
        }
    }

    /// Embed and index `chunks` from scratch.
    pub fn build(id: u64, chunks: Vec<DocumentChunk>, embedder: &dyn Embedder) -> Result<Self> {
        check_unique(&chunks)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() { Vec::new() } else { embedder.embed_batch(&texts)? };
        let generation = Self::from_parts(id, embedder.embedder_id(), Some(embedder.dim()), chunks, vectors)?;
        info!(generation = id, chunks = generation.len(), embedder = %generation.embedder_id, "index generation built");
        Ok(generation)
    }

    /// Assemble a generation from precomputed vectors, e.g. a snapshot.
    /// `dim`, when given, is enforced on every vector.
    pub fn from_parts(
        id: u64,
        embedder_id: impl Into<String>,
        dim: Option<usize>,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        check_unique(&chunks)?;
        if vectors.len() != chunks.len() {
            return Err(Error::InvalidInput(format!("{} vectors for {} chunks", vectors.len(), chunks.len())));
        }
        let tokens: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();
        let mut dense = dim.map_or_else(FlatL2Index::new, FlatL2Index::with_dim);
        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        dense.add(&vectors, &ids)?;
        let lexical = LexicalIndex::build(&tokens)?;
        Ok(Self { id, embedder_id: embedder_id.into(), chunks, tokens, dense, lexical })
    }

    pub fn id(&self) -> u64 { self.id }

    pub fn embedder_id(&self) -> &str { &self.embedder_id }

    pub fn chunks(&self) -> &[DocumentChunk] { &self.chunks }

    pub fn chunk(&self, position: usize) -> Option<&DocumentChunk> { self.chunks.get(position) }

    pub fn tokens(&self) -> &[Vec<String>] { &self.tokens }

    pub fn dense(&self) -> &FlatL2Index { &self.dense }

    pub fn lexical(&self) -> &LexicalIndex { &self.lexical }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    /// Stored vectors in chunk order.
    pub fn vectors(&self) -> Vec<Vec<f32>> {
        (0..self.len()).filter_map(|i| self.dense.vector(i).map(<[f32]>::to_vec)).collect()
    }

    /// Distinct source documents, in the order they were first indexed.
    pub fn documents(&self) -> Vec<IndexedDocument> {
        let mut seen = HashSet::new();
        self.chunks
            .iter()
            .filter(|c| seen.insert(c.metadata.doc_id.as_str()))
            .map(|c| IndexedDocument {
                doc_id: c.metadata.doc_id.clone(),
                filename: c.metadata.filename.clone(),
                total_chunks: c.metadata.total_chunks,
            })
            .collect()
    }
}

fn check_unique(chunks: &[DocumentChunk]) -> Result<()> {
    let mut seen = HashSet::with_capacity(chunks.len());
    for c in chunks {
        if !seen.insert(c.id.as_str()) { return Err(Error::DuplicateChunk(c.id.clone())); }
    }
    Ok(())
}
