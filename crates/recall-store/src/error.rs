//! Snapshot persistence error types.

use thiserror::Error;

/// Errors raised while loading or saving persisted snapshots.
///
/// All variants are fatal to the load: a snapshot is accepted whole or not
/// at all.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Malformed or internally inconsistent snapshot
    #[error("Snapshot schema error: {0}")]
    Schema(String),

    /// Two leaves share an id
    #[error("Duplicate leaf id: {0}")]
    DuplicateId(u64),

    /// An emotion label outside the recognized set
    #[error("Unknown emotion label: {0:?}")]
    UnknownLabel(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata table / manifest error
    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedding or centroid matrix codec error
    #[error("Matrix codec error: {0}")]
    Matrix(#[from] bincode::Error),
}
