//! Dense nearest-neighbour search over embeddings.
//!
//! Exact brute-force L2; no approximate structures, no deletion.
pub mod flat;

pub use flat::{l2_distance, FlatL2Index, Neighbor};
