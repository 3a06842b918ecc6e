//! # recall-retrieval
//!
//! Query-time traversal for the emotion-recall core.
//!
//! Given an immutable cluster index, a query vector, and an optional
//! target emotion, the retriever descends coarse-to-fine (level-2
//! centroids, then level-1 centroids, then leaves) and ranks the reachable
//! leaves by a blended semantic/emotion score. The beam search trades a
//! bounded recall loss for scans that stay near-linear in the selected
//! subtree instead of the whole corpus.
//!
//! ## Core pieces
//!
//! - [`ScorerConfig`]: pure blended scoring (cosine similarity + label
//!   affinity)
//! - [`Retriever`]: the L2 -> L1 -> leaf descent
//! - [`CurrentIndex`]: atomically swappable handle to the live index
//!   version
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recall_retrieval::{CurrentIndex, Retriever, RetrieverConfig};
//!
//! let current = CurrentIndex::new(index);
//! let retriever = Retriever::new(RetrieverConfig::default());
//!
//! let snapshot = current.snapshot();
//! let hits = retriever.retrieve(&snapshot, &query, Some(Emotion::Sadness), 5)?;
//! ```

pub mod error;
pub mod handle;
pub mod retriever;
pub mod scorer;

pub use error::RetrievalError;
pub use handle::CurrentIndex;
pub use retriever::{RetrievedChunk, Retriever, RetrieverConfig};
pub use scorer::ScorerConfig;
