//! Build error types.

use thiserror::Error;

use recall_store::SnapshotError;

/// Errors raised during an offline build run.
///
/// A failed build promotes nothing; the previous index stays current.
/// Hitting the iteration cap is NOT an error: the build returns the last
/// assignment with the index flagged approximate.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid cluster targets or iteration settings
    #[error("Invalid build config: {0}")]
    InvalidConfig(String),

    /// Corpus has no leaves to cluster
    #[error("Corpus has no leaves")]
    EmptyCorpus,

    /// Corpus snapshot failed to load or validate
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
