//! # recall-cluster
//!
//! Offline cluster tree builder for the emotion-recall core.
//!
//! Partitions leaf embeddings into level-1 clusters, then level-1
//! centroids into level-2 clusters, with seeded k-means++ initialization
//! and Lloyd-style iteration under cosine similarity. Identical corpus,
//! cluster targets, and seed always produce identical partitions and
//! centroids.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recall_cluster::{BuildConfig, ClusterTreeBuilder};
//!
//! let builder = ClusterTreeBuilder::new(BuildConfig::new(10, 3).with_seed(42));
//! let index = builder.build(&store)?;
//! ```

pub mod builder;
pub mod error;
mod kmeans;

pub use builder::{BuildConfig, ClusterTreeBuilder};
pub use error::BuildError;
