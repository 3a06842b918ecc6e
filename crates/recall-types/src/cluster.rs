//! Cluster tree nodes.

use serde::{Deserialize, Serialize};

use crate::emotion::EmotionProfile;

/// Position of a node in the two-level cluster tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClusterLevel {
    /// First tier: groups leaf chunks.
    L1,
    /// Second tier: groups level-1 clusters.
    L2,
}

impl std::fmt::Display for ClusterLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterLevel::L1 => write!(f, "l1"),
            ClusterLevel::L2 => write!(f, "l2"),
        }
    }
}

/// One node of the cluster tree, immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterNode {
    /// Identifier, dense within the node's level.
    pub id: u32,
    /// Which tier the node sits on.
    pub level: ClusterLevel,
    /// Arithmetic mean of member vectors (leaf embeddings at L1, member
    /// centroids at L2). Never re-normalized.
    pub centroid: Vec<f32>,
    /// Child identifiers, kept sorted: leaf ids at L1, L1 node ids at L2.
    pub members: Vec<u64>,
    /// Label distribution over the leaves beneath this node.
    pub emotion_profile: EmotionProfile,
}

impl ClusterNode {
    /// Create a node, sorting the member list for stable ordering.
    pub fn new(
        id: u32,
        level: ClusterLevel,
        centroid: Vec<f32>,
        mut members: Vec<u64>,
        emotion_profile: EmotionProfile,
    ) -> Self {
        members.sort_unstable();
        Self {
            id,
            level,
            centroid,
            members,
            emotion_profile,
        }
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the node has no children. Must not occur in a valid index.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the given child id belongs to this node.
    pub fn contains(&self, child: u64) -> bool {
        self.members.binary_search(&child).is_ok()
    }
}
