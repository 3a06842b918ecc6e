//! Cluster-index snapshot persistence.
//!
//! Layout: the corpus files ([`LEAVES_FILE`], [`EMBEDDINGS_FILE`]) plus a
//! manifest, one centroid matrix per level, and the membership tables.
//! Emotion profiles are not persisted; they are re-derived from membership
//! at load time.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use recall_types::{ClusterIndex, ClusterLevel, ClusterNode, EmotionProfile, LeafChunk};

use crate::corpus::{
    read_json, read_matrix, write_json, write_matrix, CorpusStore, EMBEDDINGS_FILE, LEAVES_FILE,
};
use crate::error::SnapshotError;

/// Build metadata and row counts for cross-file validation.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Dense `l1_count x D` centroid matrix.
pub const L1_CENTROIDS_FILE: &str = "l1_centroids.bin";
/// Dense `l2_count x D` centroid matrix.
pub const L2_CENTROIDS_FILE: &str = "l2_centroids.bin";
/// Membership tables: leaf row -> L1 id, L1 id -> L2 id.
pub const ASSIGNMENTS_FILE: &str = "assignments.json";

#[derive(Debug, Serialize, Deserialize)]
struct IndexManifest {
    version: String,
    built_at: DateTime<Utc>,
    approximate: bool,
    dimension: usize,
    leaf_count: usize,
    l1_count: usize,
    l2_count: usize,
}

/// Row-aligned membership tables.
#[derive(Debug, Serialize, Deserialize)]
struct AssignmentTables {
    /// Entry `i`: L1 cluster id of the leaf in embedding row `i`.
    leaf_to_l1: Vec<u32>,
    /// Entry `i`: L2 cluster id of L1 cluster `i`.
    l1_to_l2: Vec<u32>,
}

/// Persist a built index into `dir` (created if missing).
pub fn save_index(index: &ClusterIndex, dir: &Path) -> Result<(), SnapshotError> {
    std::fs::create_dir_all(dir)?;

    CorpusStore::from_leaves(index.leaves().to_vec())?.save(dir)?;

    let l1_matrix: Vec<&[f32]> = index.l1_nodes().iter().map(|n| n.centroid.as_slice()).collect();
    write_matrix(&dir.join(L1_CENTROIDS_FILE), &l1_matrix)?;
    let l2_matrix: Vec<&[f32]> = index.l2_nodes().iter().map(|n| n.centroid.as_slice()).collect();
    write_matrix(&dir.join(L2_CENTROIDS_FILE), &l2_matrix)?;

    write_json(
        &dir.join(ASSIGNMENTS_FILE),
        &AssignmentTables {
            leaf_to_l1: membership_column(index.leaves().iter().map(|l| l.id), index.l1_nodes())?,
            l1_to_l2: membership_column(
                index.l1_nodes().iter().map(|n| n.id as u64),
                index.l2_nodes(),
            )?,
        },
    )?;

    write_json(
        &dir.join(MANIFEST_FILE),
        &IndexManifest {
            version: index.version().to_string(),
            built_at: index.built_at(),
            approximate: index.is_approximate(),
            dimension: index.dimension(),
            leaf_count: index.leaves().len(),
            l1_count: index.l1_nodes().len(),
            l2_count: index.l2_nodes().len(),
        },
    )?;

    info!(
        path = ?dir,
        version = index.version(),
        leaves = index.leaves().len(),
        "Saved index snapshot"
    );
    Ok(())
}

/// Load and validate an index snapshot from `dir`.
///
/// Every load-time invariant is re-checked: aligned row counts against the
/// manifest, one dimension everywhere, assignment ids in range, and the
/// full structural contract via [`ClusterIndex::validate`].
pub fn load_index(dir: &Path) -> Result<ClusterIndex, SnapshotError> {
    let manifest: IndexManifest = read_json(&dir.join(MANIFEST_FILE))?;
    let store = CorpusStore::load(dir)?;
    let l1_centroids = read_matrix(&dir.join(L1_CENTROIDS_FILE))?;
    let l2_centroids = read_matrix(&dir.join(L2_CENTROIDS_FILE))?;
    let assignments: AssignmentTables = read_json(&dir.join(ASSIGNMENTS_FILE))?;

    check_count(LEAVES_FILE, store.len(), manifest.leaf_count)?;
    check_count(L1_CENTROIDS_FILE, l1_centroids.len(), manifest.l1_count)?;
    check_count(L2_CENTROIDS_FILE, l2_centroids.len(), manifest.l2_count)?;
    check_count(ASSIGNMENTS_FILE, assignments.leaf_to_l1.len(), manifest.leaf_count)?;
    check_count(ASSIGNMENTS_FILE, assignments.l1_to_l2.len(), manifest.l1_count)?;

    if manifest.leaf_count == 0 || manifest.l1_count == 0 || manifest.l2_count == 0 {
        return Err(SnapshotError::Schema(
            "index snapshot has no clusters".to_string(),
        ));
    }
    if store.dimension() != manifest.dimension {
        return Err(SnapshotError::Schema(format!(
            "{} has dimension {}, manifest says {}",
            EMBEDDINGS_FILE,
            store.dimension(),
            manifest.dimension
        )));
    }

    let leaves = store.leaves().to_vec();
    let l1 = assemble_l1(&leaves, l1_centroids, &assignments.leaf_to_l1, manifest.l1_count)?;
    let l2 = assemble_l2(&leaves, &l1, l2_centroids, &assignments.l1_to_l2, manifest.l2_count)?;

    let index = ClusterIndex::new(
        manifest.version,
        manifest.built_at,
        manifest.approximate,
        manifest.dimension,
        leaves,
        l1,
        l2,
    );
    index
        .validate()
        .map_err(|violation| SnapshotError::Schema(violation.to_string()))?;

    info!(
        path = ?dir,
        version = index.version(),
        leaves = index.leaves().len(),
        l1 = index.l1_nodes().len(),
        l2 = index.l2_nodes().len(),
        approximate = index.is_approximate(),
        "Loaded index snapshot"
    );
    Ok(index)
}

/// Invert a level's member lists into a row-aligned parent column.
fn membership_column<I: Iterator<Item = u64>>(
    children: I,
    parents: &[ClusterNode],
) -> Result<Vec<u32>, SnapshotError> {
    let mut column = Vec::new();
    for child in children {
        let parent = parents
            .iter()
            .find(|node| node.contains(child))
            .ok_or_else(|| {
                SnapshotError::Schema(format!("child {child} belongs to no parent cluster"))
            })?;
        column.push(parent.id);
    }
    Ok(column)
}

fn check_count(file: &str, actual: usize, expected: usize) -> Result<(), SnapshotError> {
    if actual != expected {
        return Err(SnapshotError::Schema(format!(
            "{file} has {actual} rows, manifest says {expected}"
        )));
    }
    Ok(())
}

fn assemble_l1(
    leaves: &[LeafChunk],
    centroids: Vec<Vec<f32>>,
    leaf_to_l1: &[u32],
    l1_count: usize,
) -> Result<Vec<ClusterNode>, SnapshotError> {
    let mut members: Vec<Vec<u64>> = vec![Vec::new(); l1_count];
    for (leaf, &parent) in leaves.iter().zip(leaf_to_l1) {
        if parent as usize >= l1_count {
            return Err(SnapshotError::Schema(format!(
                "leaf {} assigned to unknown l1 cluster {}",
                leaf.id, parent
            )));
        }
        members[parent as usize].push(leaf.id);
    }

    let mut nodes = Vec::with_capacity(l1_count);
    for (id, (centroid, member_ids)) in centroids.into_iter().zip(members).enumerate() {
        let profile = EmotionProfile::from_labels(
            member_ids
                .iter()
                .filter_map(|&leaf_id| leaves.iter().find(|l| l.id == leaf_id))
                .map(|l| l.emotion),
        );
        nodes.push(ClusterNode::new(
            id as u32,
            ClusterLevel::L1,
            centroid,
            member_ids,
            profile,
        ));
    }
    Ok(nodes)
}

fn assemble_l2(
    leaves: &[LeafChunk],
    l1: &[ClusterNode],
    centroids: Vec<Vec<f32>>,
    l1_to_l2: &[u32],
    l2_count: usize,
) -> Result<Vec<ClusterNode>, SnapshotError> {
    let mut members: Vec<Vec<u64>> = vec![Vec::new(); l2_count];
    for (node, &parent) in l1.iter().zip(l1_to_l2) {
        if parent as usize >= l2_count {
            return Err(SnapshotError::Schema(format!(
                "l1 cluster {} assigned to unknown l2 cluster {}",
                node.id, parent
            )));
        }
        members[parent as usize].push(node.id as u64);
    }

    let mut nodes = Vec::with_capacity(l2_count);
    for (id, (centroid, member_ids)) in centroids.into_iter().zip(members).enumerate() {
        // Profile over the leaves beneath, not over member profiles
        let profile = EmotionProfile::from_labels(
            member_ids
                .iter()
                .filter_map(|&l1_id| l1.get(l1_id as usize))
                .flat_map(|child| child.members.iter())
                .filter_map(|&leaf_id| leaves.iter().find(|l| l.id == leaf_id))
                .map(|l| l.emotion),
        );
        nodes.push(ClusterNode::new(
            id as u32,
            ClusterLevel::L2,
            centroid,
            member_ids,
            profile,
        ));
    }
    Ok(nodes)
}
