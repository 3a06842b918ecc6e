//! Immutable two-level cluster index snapshot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::chunk::LeafChunk;
use crate::cluster::{ClusterLevel, ClusterNode};
use crate::similarity::mean_centroid;

/// Tolerance for centroid-mean and profile-sum checks.
const FLOAT_TOLERANCE: f32 = 1e-4;

/// Structural violations detected by [`ClusterIndex::validate`].
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A vector's dimension disagrees with the index dimension
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A node has no members
    #[error("{level} cluster {id} is empty")]
    EmptyNode { level: ClusterLevel, id: u32 },

    /// A child id appears in more than one parent at the same level
    #[error("{level} cluster {id} re-claims child {child}")]
    DuplicateMembership {
        level: ClusterLevel,
        id: u32,
        child: u64,
    },

    /// A node references a child that does not exist
    #[error("{level} cluster {id} references unknown child {child}")]
    UnknownChild {
        level: ClusterLevel,
        id: u32,
        child: u64,
    },

    /// A leaf belongs to no level-1 cluster
    #[error("Leaf {0} does not appear in any level-1 cluster")]
    OrphanLeaf(u64),

    /// A level-1 cluster belongs to no level-2 cluster
    #[error("Level-1 cluster {0} does not appear in any level-2 cluster")]
    OrphanCluster(u32),

    /// A node id does not match its position in the level table
    #[error("{level} cluster at position {position} has id {id}")]
    MisnumberedNode {
        level: ClusterLevel,
        position: usize,
        id: u32,
    },

    /// A centroid is not the arithmetic mean of its members
    #[error("{level} cluster {id} centroid deviates from its member mean")]
    CentroidDrift { level: ClusterLevel, id: u32 },

    /// An emotion profile does not sum to 1
    #[error("{level} cluster {id} emotion profile sums to {sum}")]
    ProfileSum {
        level: ClusterLevel,
        id: u32,
        sum: f32,
    },
}

/// Summary counters for an index snapshot.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of leaf chunks
    pub leaf_count: usize,
    /// Number of level-1 clusters
    pub l1_count: usize,
    /// Number of level-2 clusters
    pub l2_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Whether the build stopped at the iteration cap
    pub approximate: bool,
}

/// The whole retrieval snapshot: leaves plus both cluster tiers.
///
/// Immutable after construction. A changed corpus produces a new index
/// under a new version; nothing is ever recomputed in place.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    version: String,
    built_at: DateTime<Utc>,
    approximate: bool,
    dimension: usize,
    leaves: Vec<LeafChunk>,
    l1: Vec<ClusterNode>,
    l2: Vec<ClusterNode>,
    /// Leaf id -> position in `leaves`.
    leaf_positions: BTreeMap<u64, usize>,
}

impl ClusterIndex {
    /// Assemble an index snapshot from its parts.
    ///
    /// Node ids must be dense (id == position within their level); call
    /// [`validate`](Self::validate) to verify the full structural contract.
    pub fn new(
        version: impl Into<String>,
        built_at: DateTime<Utc>,
        approximate: bool,
        dimension: usize,
        leaves: Vec<LeafChunk>,
        l1: Vec<ClusterNode>,
        l2: Vec<ClusterNode>,
    ) -> Self {
        let leaf_positions = leaves
            .iter()
            .enumerate()
            .map(|(pos, leaf)| (leaf.id, pos))
            .collect();
        Self {
            version: version.into(),
            built_at,
            approximate,
            dimension,
            leaves,
            l1,
            l2,
            leaf_positions,
        }
    }

    /// Build version identifier (ULID).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// When the build finished.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Whether the builder hit its iteration cap before assignments
    /// stabilized. Approximate results are flagged, never silent.
    pub fn is_approximate(&self) -> bool {
        self.approximate
    }

    /// Embedding dimension shared by every vector in the index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// All leaf chunks, in snapshot row order.
    pub fn leaves(&self) -> &[LeafChunk] {
        &self.leaves
    }

    /// All level-1 clusters, indexed by id.
    pub fn l1_nodes(&self) -> &[ClusterNode] {
        &self.l1
    }

    /// All level-2 clusters, indexed by id.
    pub fn l2_nodes(&self) -> &[ClusterNode] {
        &self.l2
    }

    /// Look up a leaf by id.
    pub fn leaf(&self, id: u64) -> Option<&LeafChunk> {
        self.leaf_positions.get(&id).map(|&pos| &self.leaves[pos])
    }

    /// Look up a level-1 cluster by id.
    pub fn l1(&self, id: u32) -> Option<&ClusterNode> {
        self.l1.get(id as usize)
    }

    /// Look up a level-2 cluster by id.
    pub fn l2(&self, id: u32) -> Option<&ClusterNode> {
        self.l2.get(id as usize)
    }

    /// Whether the index has no traversable clusters.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty() || self.l1.is_empty() || self.l2.is_empty()
    }

    /// Summary counters.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            leaf_count: self.leaves.len(),
            l1_count: self.l1.len(),
            l2_count: self.l2.len(),
            dimension: self.dimension,
            approximate: self.approximate,
        }
    }

    /// Check the full structural contract:
    /// - every vector has the index dimension
    /// - node ids are dense within their level
    /// - leaf->L1 and L1->L2 memberships are partitions (no orphans, no
    ///   duplicates, no unknown children, no empty nodes)
    /// - centroids equal their member means within float tolerance
    /// - emotion profiles sum to 1
    pub fn validate(&self) -> Result<(), ValidationError> {
        for leaf in &self.leaves {
            if leaf.dimension() != self.dimension {
                return Err(ValidationError::Dimension {
                    context: format!("leaf {}", leaf.id),
                    expected: self.dimension,
                    actual: leaf.dimension(),
                });
            }
        }

        self.validate_level(&self.l1, ClusterLevel::L1)?;
        self.validate_level(&self.l2, ClusterLevel::L2)?;

        // Leaf -> L1 partition
        let mut claimed_leaves: BTreeSet<u64> = BTreeSet::new();
        for node in &self.l1 {
            for &child in &node.members {
                if !self.leaf_positions.contains_key(&child) {
                    return Err(ValidationError::UnknownChild {
                        level: ClusterLevel::L1,
                        id: node.id,
                        child,
                    });
                }
                if !claimed_leaves.insert(child) {
                    return Err(ValidationError::DuplicateMembership {
                        level: ClusterLevel::L1,
                        id: node.id,
                        child,
                    });
                }
            }
        }
        for leaf in &self.leaves {
            if !claimed_leaves.contains(&leaf.id) {
                return Err(ValidationError::OrphanLeaf(leaf.id));
            }
        }

        // L1 -> L2 partition
        let mut claimed_clusters: BTreeSet<u64> = BTreeSet::new();
        for node in &self.l2 {
            for &child in &node.members {
                if child >= self.l1.len() as u64 {
                    return Err(ValidationError::UnknownChild {
                        level: ClusterLevel::L2,
                        id: node.id,
                        child,
                    });
                }
                if !claimed_clusters.insert(child) {
                    return Err(ValidationError::DuplicateMembership {
                        level: ClusterLevel::L2,
                        id: node.id,
                        child,
                    });
                }
            }
        }
        for node in &self.l1 {
            if !claimed_clusters.contains(&(node.id as u64)) {
                return Err(ValidationError::OrphanCluster(node.id));
            }
        }

        // Centroid means
        for node in &self.l1 {
            let mean = mean_centroid(
                node.members
                    .iter()
                    .filter_map(|&id| self.leaf(id))
                    .map(|leaf| leaf.embedding.as_slice()),
            );
            if !vectors_close(&node.centroid, &mean) {
                return Err(ValidationError::CentroidDrift {
                    level: ClusterLevel::L1,
                    id: node.id,
                });
            }
        }
        for node in &self.l2 {
            let mean = mean_centroid(
                node.members
                    .iter()
                    .filter_map(|&id| self.l1(id as u32))
                    .map(|child| child.centroid.as_slice()),
            );
            if !vectors_close(&node.centroid, &mean) {
                return Err(ValidationError::CentroidDrift {
                    level: ClusterLevel::L2,
                    id: node.id,
                });
            }
        }

        Ok(())
    }

    fn validate_level(
        &self,
        nodes: &[ClusterNode],
        level: ClusterLevel,
    ) -> Result<(), ValidationError> {
        for (position, node) in nodes.iter().enumerate() {
            if node.id as usize != position {
                return Err(ValidationError::MisnumberedNode {
                    level,
                    position,
                    id: node.id,
                });
            }
            if node.is_empty() {
                return Err(ValidationError::EmptyNode { level, id: node.id });
            }
            if node.centroid.len() != self.dimension {
                return Err(ValidationError::Dimension {
                    context: format!("{} cluster {}", level, node.id),
                    expected: self.dimension,
                    actual: node.centroid.len(),
                });
            }
            let sum = node.emotion_profile.total();
            if (sum - 1.0).abs() > FLOAT_TOLERANCE {
                return Err(ValidationError::ProfileSum {
                    level,
                    id: node.id,
                    sum,
                });
            }
        }
        Ok(())
    }
}

fn vectors_close(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= FLOAT_TOLERANCE)
}
