//! Leaf chunk: one indexed unit of source text.

use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;

/// One embedded text chunk, read-only once ingested.
///
/// Chunks are produced by an external embedding/classification step; the
/// retrieval core never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeafChunk {
    /// Stable unique identifier.
    pub id: u64,
    /// Fixed-dimension embedding vector.
    pub embedding: Vec<f32>,
    /// Emotion label assigned upstream.
    pub emotion: Emotion,
    /// Reference back to the original text row.
    pub source_ref: String,
}

impl LeafChunk {
    /// Create a new leaf chunk.
    pub fn new(id: u64, embedding: Vec<f32>, emotion: Emotion, source_ref: impl Into<String>) -> Self {
        Self {
            id,
            embedding,
            emotion,
            source_ref: source_ref.into(),
        }
    }

    /// Embedding dimension.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_chunk_new() {
        let chunk = LeafChunk::new(7, vec![0.5, -0.5, 1.0], Emotion::Sadness, "diary:42");
        assert_eq!(chunk.id, 7);
        assert_eq!(chunk.dimension(), 3);
        assert_eq!(chunk.emotion, Emotion::Sadness);
        assert_eq!(chunk.source_ref, "diary:42");
    }
}
