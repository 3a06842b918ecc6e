//! # recall-store
//!
//! Columnar snapshot persistence for the emotion-recall core.
//!
//! Two persisted artifacts share one layout discipline: row-aligned files
//! that are cross-checked at load time.
//!
//! - **Corpus snapshot**: the leaf metadata table plus the embedding
//!   matrix, produced by the external ingestion/embedding step and consumed
//!   once by the cluster builder.
//! - **Index snapshot**: the corpus files plus per-level centroid matrices
//!   and membership tables, produced by the builder and consumed by the
//!   retriever at startup.
//!
//! Loading validates everything the retrieval contract depends on:
//! aligned row counts, a single embedding dimension, unique leaf ids, and
//! recognized emotion labels. A snapshot that fails any check is rejected
//! wholesale; no partial state escapes.

pub mod corpus;
pub mod error;
pub mod persist;

pub use corpus::CorpusStore;
pub use error::SnapshotError;
pub use persist::{load_index, save_index};
