//! Corpus snapshot: the immutable leaf table the builder consumes.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use recall_types::{Emotion, LeafChunk};

use crate::error::SnapshotError;

/// Leaf metadata table, row-aligned with the embedding matrix.
pub const LEAVES_FILE: &str = "leaves.json";
/// Dense `num_leaves x D` f32 embedding matrix.
pub const EMBEDDINGS_FILE: &str = "leaf_embeddings.bin";

/// One row of the persisted metadata table.
///
/// The emotion stays a raw string until validation so an unrecognized
/// label is reported as such, not as a parse failure.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LeafRecord {
    pub id: u64,
    pub emotion: String,
    pub source_ref: String,
}

/// In-memory handle over a validated corpus snapshot.
///
/// Immutable once loaded. The builder reads it exactly once; after a build
/// only the resulting index needs to be retained.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    leaves: Vec<LeafChunk>,
    dimension: usize,
}

impl CorpusStore {
    /// Wrap already-embedded leaves, applying the same validation as
    /// [`load`](Self::load): one shared dimension, unique ids.
    pub fn from_leaves(leaves: Vec<LeafChunk>) -> Result<Self, SnapshotError> {
        let dimension = leaves.first().map(|leaf| leaf.dimension()).unwrap_or(0);

        let mut seen = BTreeSet::new();
        for leaf in &leaves {
            if leaf.dimension() != dimension {
                return Err(SnapshotError::Schema(format!(
                    "leaf {} has dimension {}, expected {}",
                    leaf.id,
                    leaf.dimension(),
                    dimension
                )));
            }
            if !seen.insert(leaf.id) {
                return Err(SnapshotError::DuplicateId(leaf.id));
            }
        }

        Ok(Self { leaves, dimension })
    }

    /// Load and validate a corpus snapshot directory.
    ///
    /// Rejects row-count disagreement between the metadata table and the
    /// embedding matrix, mixed dimensions, duplicate ids, and unknown
    /// emotion labels.
    pub fn load(dir: &Path) -> Result<Self, SnapshotError> {
        let records = read_leaf_records(dir)?;
        let embeddings = read_matrix(&dir.join(EMBEDDINGS_FILE))?;

        if records.len() != embeddings.len() {
            return Err(SnapshotError::Schema(format!(
                "{} has {} rows but {} has {}",
                LEAVES_FILE,
                records.len(),
                EMBEDDINGS_FILE,
                embeddings.len()
            )));
        }

        let mut leaves = Vec::with_capacity(records.len());
        for (record, embedding) in records.into_iter().zip(embeddings) {
            let emotion = Emotion::from_label(&record.emotion)
                .ok_or_else(|| SnapshotError::UnknownLabel(record.emotion.clone()))?;
            leaves.push(LeafChunk::new(record.id, embedding, emotion, record.source_ref));
        }

        let store = Self::from_leaves(leaves)?;
        info!(
            path = ?dir,
            leaves = store.len(),
            dim = store.dimension(),
            "Loaded corpus snapshot"
        );
        Ok(store)
    }

    /// Write the snapshot files into `dir` (created if missing).
    pub fn save(&self, dir: &Path) -> Result<(), SnapshotError> {
        std::fs::create_dir_all(dir)?;

        let records: Vec<LeafRecord> = self
            .leaves
            .iter()
            .map(|leaf| LeafRecord {
                id: leaf.id,
                emotion: leaf.emotion.as_str().to_string(),
                source_ref: leaf.source_ref.clone(),
            })
            .collect();
        write_json(&dir.join(LEAVES_FILE), &records)?;

        let matrix: Vec<&[f32]> = self.leaves.iter().map(|l| l.embedding.as_slice()).collect();
        write_matrix(&dir.join(EMBEDDINGS_FILE), &matrix)?;

        info!(path = ?dir, leaves = self.len(), "Saved corpus snapshot");
        Ok(())
    }

    /// All leaves in snapshot row order.
    pub fn leaves(&self) -> &[LeafChunk] {
        &self.leaves
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the corpus holds no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Embedding dimension (0 for an empty corpus).
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

pub(crate) fn read_leaf_records(dir: &Path) -> Result<Vec<LeafRecord>, SnapshotError> {
    let file = File::open(dir.join(LEAVES_FILE))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

pub(crate) fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SnapshotError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Read a dense f32 matrix and check it is rectangular.
pub(crate) fn read_matrix(path: &Path) -> Result<Vec<Vec<f32>>, SnapshotError> {
    let file = File::open(path)?;
    let matrix: Vec<Vec<f32>> = bincode::deserialize_from(BufReader::new(file))?;

    if let Some(first) = matrix.first() {
        let dim = first.len();
        for (row, vector) in matrix.iter().enumerate() {
            if vector.len() != dim {
                return Err(SnapshotError::Schema(format!(
                    "{:?} row {} has dimension {}, expected {}",
                    path,
                    row,
                    vector.len(),
                    dim
                )));
            }
        }
    }
    Ok(matrix)
}

pub(crate) fn write_matrix(path: &Path, matrix: &[&[f32]]) -> Result<(), SnapshotError> {
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), matrix)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_leaves() -> Vec<LeafChunk> {
        vec![
            LeafChunk::new(0, vec![1.0, 0.0], Emotion::Joy, "row:0"),
            LeafChunk::new(1, vec![0.0, 1.0], Emotion::Sadness, "row:1"),
            LeafChunk::new(2, vec![0.5, 0.5], Emotion::Anxiety, "row:2"),
        ]
    }

    #[test]
    fn test_from_leaves_valid() {
        let store = CorpusStore::from_leaves(sample_leaves()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.dimension(), 2);
    }

    #[test]
    fn test_from_leaves_duplicate_id() {
        let mut leaves = sample_leaves();
        leaves[2].id = 0;
        let err = CorpusStore::from_leaves(leaves).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateId(0)));
    }

    #[test]
    fn test_from_leaves_mixed_dimension() {
        let mut leaves = sample_leaves();
        leaves[1].embedding = vec![0.0, 1.0, 0.0];
        let err = CorpusStore::from_leaves(leaves).unwrap_err();
        assert!(matches!(err, SnapshotError::Schema(_)));
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = CorpusStore::from_leaves(sample_leaves()).unwrap();
        store.save(temp.path()).unwrap();

        let loaded = CorpusStore::load(temp.path()).unwrap();
        assert_eq!(loaded.leaves(), store.leaves());
        assert_eq!(loaded.dimension(), 2);
    }

    #[test]
    fn test_load_rejects_row_count_mismatch() {
        // 100 embedding rows against 99 metadata rows must fail the load
        let temp = TempDir::new().unwrap();
        let leaves: Vec<LeafChunk> = (0..100)
            .map(|i| LeafChunk::new(i, vec![i as f32, 1.0], Emotion::Neutral, format!("row:{i}")))
            .collect();
        CorpusStore::from_leaves(leaves).unwrap().save(temp.path()).unwrap();

        // Truncate the metadata table to 99 rows
        let mut records = read_leaf_records(temp.path()).unwrap();
        records.pop();
        write_json(&temp.path().join(LEAVES_FILE), &records).unwrap();

        let err = CorpusStore::load(temp.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::Schema(_)));
    }

    #[test]
    fn test_load_rejects_unknown_label() {
        let temp = TempDir::new().unwrap();
        CorpusStore::from_leaves(sample_leaves())
            .unwrap()
            .save(temp.path())
            .unwrap();

        let mut records = read_leaf_records(temp.path()).unwrap();
        records[1].emotion = "melancholy".to_string();
        write_json(&temp.path().join(LEAVES_FILE), &records).unwrap();

        let err = CorpusStore::load(temp.path()).unwrap_err();
        match err {
            SnapshotError::UnknownLabel(label) => assert_eq!(label, "melancholy"),
            other => panic!("expected UnknownLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = CorpusStore::load(temp.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }

    #[test]
    fn test_empty_corpus() {
        let store = CorpusStore::from_leaves(Vec::new()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 0);
    }
}
