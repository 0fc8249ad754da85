use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use docrag_core::traits::Embedder;
use docrag_core::types::DocumentChunk;
use docrag_core::{Error, Result};

use crate::generation::IndexGeneration;
use crate::snapshot::{SnapshotManifest, SnapshotStore};

/// Holds the active index generation.
///
/// Readers clone the `Arc` and keep querying that generation for as long as
/// they like. Writers are serialized by `rebuild`, build the next generation
/// without holding the read/write lock, and swap it in at the end.
pub struct IndexStore {
    active: RwLock<Arc<IndexGeneration>>,
    rebuild: Mutex<()>,
    embedder: Arc<dyn Embedder>,
    next_id: AtomicU64,
}

impl IndexStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let empty = IndexGeneration::empty(0, embedder.embedder_id());
        Self { active: RwLock::new(Arc::new(empty)), rebuild: Mutex::new(()), embedder, next_id: AtomicU64::new(1) }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    pub fn current(&self) -> Arc<IndexGeneration> { Arc::clone(&self.active.read()) }

    /// Ids come partly from snapshot manifests, so they saturate instead of wrapping.
    fn allocate_id(&self) -> u64 {
        match self.next_id.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| Some(id.saturating_add(1))) {
            Ok(id) | Err(id) => id,
        }
    }

    fn install(&self, generation: IndexGeneration) -> Arc<IndexGeneration> {
        let generation = Arc::new(generation);
        *self.active.write() = Arc::clone(&generation);
        generation
    }

    /// Index `chunks` alongside what is already there. Chunks of documents
    /// that are already indexed replace the old ones. The whole index is
    /// rebuilt; cached embeddings keep that cheap.
    pub fn add_documents(&self, chunks: Vec<DocumentChunk>) -> Result<Arc<IndexGeneration>> {
        let _guard = self.rebuild.lock();
        let base = self.current();
        let incoming: HashSet<&str> = chunks.iter().map(|c| c.metadata.doc_id.as_str()).collect();
        let mut all: Vec<DocumentChunk> =
            base.chunks().iter().filter(|c| !incoming.contains(c.metadata.doc_id.as_str())).cloned().collect();
        let replaced = base.len() - all.len();
        all.extend(chunks);
        let id = self.allocate_id();
        let generation = IndexGeneration::build(id, all, self.embedder.as_ref())?;
        if replaced > 0 { info!(replaced, "re-ingested documents replaced their previous chunks"); }
        Ok(self.install(generation))
    }

    /// Rebuild from exactly `chunks`, dropping everything indexed before.
    pub fn replace_all(&self, chunks: Vec<DocumentChunk>) -> Result<Arc<IndexGeneration>> {
        let _guard = self.rebuild.lock();
        let id = self.allocate_id();
        let generation = IndexGeneration::build(id, chunks, self.embedder.as_ref())?;
        Ok(self.install(generation))
    }

    pub fn save(&self, snapshots: &SnapshotStore, name: &str) -> Result<SnapshotManifest> {
        snapshots.save(name, &self.current())
    }

    /// Install a saved generation. `Ok(false)` when the snapshot is missing
    /// or unreadable, so the caller can rebuild from source documents.
    /// A snapshot built with a different embedding width is an error.
    pub fn load(&self, snapshots: &SnapshotStore, name: &str) -> Result<bool> {
        let _guard = self.rebuild.lock();
        let generation = match snapshots.load(name) {
            Ok(generation) => generation,
            Err(Error::NotFound(what)) => {
                info!(%what, "no snapshot to load");
                return Ok(false);
            }
            Err(Error::MalformedSnapshot(why)) => {
                warn!(%why, snapshot = name, "snapshot not loaded");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if let Some(dim) = generation.dense().dim() {
            if dim != self.embedder.dim() {
                return Err(Error::DimensionMismatch { expected: self.embedder.dim(), actual: dim });
            }
        }
        if generation.embedder_id() != self.embedder.embedder_id() {
            warn!(
                snapshot = generation.embedder_id(),
                active = self.embedder.embedder_id(),
                "snapshot was built with a different embedder"
            );
        }
        self.next_id.fetch_max(generation.id().saturating_add(1), Ordering::SeqCst);
        self.install(generation);
        Ok(true)
    }
}
