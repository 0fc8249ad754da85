//! Hybrid retrieval over one consistent index generation.
//!
//! `IndexGeneration` ties the chunk list, the dense index and the lexical
//! index together; `HybridRetriever` queries both and fuses the results;
//! `IndexStore` swaps generations under concurrent readers; `SnapshotStore`
//! persists them.
pub mod fusion;
pub mod generation;
pub mod retriever;
pub mod snapshot;
pub mod store;

pub use fusion::{FusedScore, FusionWeights};
pub use generation::IndexGeneration;
pub use retriever::{HybridRetriever, RetrievalCandidate, RetrieverConfig};
pub use snapshot::{SnapshotManifest, SnapshotStore, SNAPSHOT_FORMAT_VERSION};
pub use store::IndexStore;
