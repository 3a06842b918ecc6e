//! Retrieval error types.

use thiserror::Error;

/// Per-call query errors. These never affect other callers or the index.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Query vector dimension disagrees with the index
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The index holds no traversable clusters
    #[error("Index contains no clusters")]
    EmptyIndex,
}
