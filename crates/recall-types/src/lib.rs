//! # recall-types
//!
//! Shared domain types for the emotion-recall retrieval core.
//!
//! This crate defines the data model every other crate consumes:
//! - Emotions: the closed label set chunks are tagged with
//! - Leaf chunks: one indexed unit of source text with its embedding
//! - Cluster nodes: level-1 and level-2 groupings with centroids
//! - Cluster index: the immutable two-level snapshot retrieval runs on
//!
//! ## Usage
//!
//! ```rust
//! use recall_types::{Emotion, LeafChunk};
//!
//! let chunk = LeafChunk::new(1, vec![0.1, 0.2], Emotion::Joy, "row-1");
//! assert_eq!(chunk.dimension(), 2);
//! ```

pub mod chunk;
pub mod cluster;
pub mod emotion;
pub mod index;
pub mod similarity;

pub use chunk::LeafChunk;
pub use cluster::{ClusterLevel, ClusterNode};
pub use emotion::{Emotion, EmotionProfile};
pub use index::{ClusterIndex, IndexStats, ValidationError};
pub use similarity::{cosine_similarity, mean_centroid};
