//! docrag-text
//!
//! BM25 lexical scoring over an in-RAM Tantivy index. Documents are addressed
//! by their insertion position so scores line up with the chunk list they
//! were built from.
pub mod tantivy_utils;
pub mod index;

pub use index::{tokenize, LexicalIndex};
