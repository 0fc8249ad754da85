use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Query issued against an index that has not been built yet.
    #[error("Index not built: {0}")]
    IndexNotBuilt(&'static str),

    /// Embedding width differs from the one the index was built with.
    /// Never recovered from: nearest-neighbour results would be garbage.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate chunk id: {0}")]
    DuplicateChunk(String),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Generation provider error: {0}")]
    GenerationProvider(String),

    #[error("Generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Whether the caller can recover by rebuilding the index and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::IndexNotBuilt(_) | Error::MalformedSnapshot(_) | Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
