//! Two-level cluster tree builder.
//!
//! Runs the seeded clustering pass over leaf embeddings (level 1), then
//! again over the level-1 centroids (level 2), and assembles the immutable
//! [`ClusterIndex`] the retriever consumes.

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, warn};
use ulid::Ulid;

use recall_store::CorpusStore;
use recall_types::{ClusterIndex, ClusterLevel, ClusterNode, EmotionProfile, LeafChunk};

use crate::error::BuildError;
use crate::kmeans;

/// Targets and knobs for one build run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Target number of level-1 clusters; capped at the leaf count.
    pub l1_clusters: usize,
    /// Target number of level-2 clusters; at most `l1_clusters`.
    pub l2_clusters: usize,
    /// Seed for reproducible initialization.
    pub seed: u64,
    /// Lloyd iteration cap per level. Exhausting it flags the index
    /// approximate instead of failing.
    pub max_iterations: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            l1_clusters: 16,
            l2_clusters: 4,
            seed: 42,
            max_iterations: 50,
        }
    }
}

impl BuildConfig {
    /// Create a config with the given cluster targets.
    pub fn new(l1_clusters: usize, l2_clusters: usize) -> Self {
        Self {
            l1_clusters,
            l2_clusters,
            ..Default::default()
        }
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the per-level iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.l1_clusters == 0 || self.l2_clusters == 0 {
            return Err("cluster targets must be >= 1".to_string());
        }
        if self.l2_clusters > self.l1_clusters {
            return Err(format!(
                "l2_clusters ({}) must not exceed l1_clusters ({})",
                self.l2_clusters, self.l1_clusters
            ));
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Offline batch builder producing one immutable index per run.
pub struct ClusterTreeBuilder {
    config: BuildConfig,
}

impl ClusterTreeBuilder {
    /// Create a builder with the given config.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build a cluster index from an already-loaded corpus.
    ///
    /// Deterministic: the same corpus, targets, and seed always yield the
    /// same partitions and centroids (the version and timestamp differ per
    /// run).
    pub fn build(&self, store: &CorpusStore) -> Result<ClusterIndex, BuildError> {
        self.config.validate().map_err(BuildError::InvalidConfig)?;
        if store.is_empty() {
            return Err(BuildError::EmptyCorpus);
        }

        let leaves = store.leaves();
        info!(
            leaves = leaves.len(),
            dim = store.dimension(),
            l1_target = self.config.l1_clusters,
            l2_target = self.config.l2_clusters,
            seed = self.config.seed,
            "Building cluster index"
        );

        // Level 1 over leaf embeddings
        let points: Vec<&[f32]> = leaves.iter().map(|l| l.embedding.as_slice()).collect();
        let l1_outcome = kmeans::cluster(
            &points,
            self.config.l1_clusters,
            self.config.seed,
            self.config.max_iterations,
        );
        let l1 = assemble_l1(leaves, &l1_outcome);

        // Level 2 over level-1 centroids, one point per cluster
        let l1_points: Vec<&[f32]> = l1.iter().map(|n| n.centroid.as_slice()).collect();
        let l2_outcome = kmeans::cluster(
            &l1_points,
            self.config.l2_clusters,
            self.config.seed.wrapping_add(1),
            self.config.max_iterations,
        );
        let l2 = assemble_l2(leaves, &l1, &l2_outcome);

        let approximate = !(l1_outcome.converged && l2_outcome.converged);
        if approximate {
            warn!(
                max_iterations = self.config.max_iterations,
                "Iteration cap exhausted before assignments stabilized; index flagged approximate"
            );
        }

        let index = ClusterIndex::new(
            Ulid::new().to_string(),
            Utc::now(),
            approximate,
            store.dimension(),
            leaves.to_vec(),
            l1,
            l2,
        );
        info!(
            version = index.version(),
            l1 = index.l1_nodes().len(),
            l2 = index.l2_nodes().len(),
            approximate,
            "Cluster index built"
        );
        Ok(index)
    }

    /// Load a corpus snapshot from `dir` and build from it.
    pub fn build_from_snapshot(&self, dir: &Path) -> Result<ClusterIndex, BuildError> {
        let store = CorpusStore::load(dir)?;
        self.build(&store)
    }
}

/// Turn a clustering outcome over leaves into level-1 nodes, dropping
/// clusters that ended the run empty (possible only when the corpus has
/// fewer distinct vectors than the target) and renumbering densely.
fn assemble_l1(leaves: &[LeafChunk], outcome: &kmeans::KmeansOutcome) -> Vec<ClusterNode> {
    let mut nodes = Vec::new();
    for (cluster, centroid) in outcome.centroids.iter().enumerate() {
        let member_rows: Vec<usize> = outcome
            .assignments
            .iter()
            .enumerate()
            .filter(|(_, &a)| a == cluster)
            .map(|(row, _)| row)
            .collect();
        if member_rows.is_empty() {
            debug!(cluster, level = %ClusterLevel::L1, "Dropping empty cluster");
            continue;
        }

        let profile = EmotionProfile::from_labels(member_rows.iter().map(|&r| leaves[r].emotion));
        nodes.push(ClusterNode::new(
            nodes.len() as u32,
            ClusterLevel::L1,
            centroid.clone(),
            member_rows.iter().map(|&r| leaves[r].id).collect(),
            profile,
        ));
    }
    nodes
}

/// Same compaction for level 2, with profiles over the leaves beneath.
fn assemble_l2(
    leaves: &[LeafChunk],
    l1: &[ClusterNode],
    outcome: &kmeans::KmeansOutcome,
) -> Vec<ClusterNode> {
    let mut nodes = Vec::new();
    for (cluster, centroid) in outcome.centroids.iter().enumerate() {
        let member_ids: Vec<u64> = outcome
            .assignments
            .iter()
            .enumerate()
            .filter(|(_, &a)| a == cluster)
            .map(|(row, _)| row as u64)
            .collect();
        if member_ids.is_empty() {
            debug!(cluster, level = %ClusterLevel::L2, "Dropping empty cluster");
            continue;
        }

        let profile = EmotionProfile::from_labels(
            member_ids
                .iter()
                .flat_map(|&l1_id| l1[l1_id as usize].members.iter())
                .map(|&leaf_id| {
                    leaves
                        .iter()
                        .find(|l| l.id == leaf_id)
                        .map(|l| l.emotion)
                        .unwrap_or(recall_types::Emotion::Neutral)
                }),
        );
        nodes.push(ClusterNode::new(
            nodes.len() as u32,
            ClusterLevel::L2,
            centroid.clone(),
            member_ids,
            profile,
        ));
    }
    nodes
}
