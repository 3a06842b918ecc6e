//! Coarse-to-fine descent through the cluster tree.

use serde::{Deserialize, Serialize};
use tracing::debug;

use recall_types::{cosine_similarity, ClusterIndex, Emotion, LeafChunk};

use crate::error::RetrievalError;
use crate::scorer::ScorerConfig;

/// Beam widths and scoring weights for one retriever.
///
/// The fan-outs trade recall for scan width: each level keeps only the
/// best `l2_fan_out` (resp. `l1_fan_out`) clusters, so leaves outside the
/// selected subtree are never scored. Widen the beams to recover recall at
/// the cost of scanning more of the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Level-2 clusters kept in step 1.
    #[serde(default = "default_l2_fan_out")]
    pub l2_fan_out: usize,

    /// Level-1 clusters kept in step 2.
    #[serde(default = "default_l1_fan_out")]
    pub l1_fan_out: usize,

    /// Blending weights for the leaf scan.
    #[serde(default)]
    pub scorer: ScorerConfig,
}

fn default_l2_fan_out() -> usize {
    3
}

fn default_l1_fan_out() -> usize {
    4
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            l2_fan_out: default_l2_fan_out(),
            l1_fan_out: default_l1_fan_out(),
            scorer: ScorerConfig::default(),
        }
    }
}

impl RetrieverConfig {
    /// Set both fan-outs (minimum 1 each).
    pub fn with_fan_out(mut self, l2_fan_out: usize, l1_fan_out: usize) -> Self {
        self.l2_fan_out = l2_fan_out.max(1);
        self.l1_fan_out = l1_fan_out.max(1);
        self
    }

    /// Set the scorer weights.
    pub fn with_scorer(mut self, scorer: ScorerConfig) -> Self {
        self.scorer = scorer;
        self
    }
}

/// One retrieval hit: the leaf plus its blended score.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    /// The matched leaf.
    pub chunk: LeafChunk,
    /// Blended score the ranking used.
    pub score: f32,
}

/// Read-only query executor over an immutable index snapshot.
///
/// Carries no state besides its config; one retriever may serve any number
/// of concurrent calls against shared index snapshots.
#[derive(Debug, Clone, Default)]
pub struct Retriever {
    config: RetrieverConfig,
}

impl Retriever {
    /// Create a retriever with the given config.
    pub fn new(config: RetrieverConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Return the top-`k` leaves for `query`, ranked by blended score
    /// descending, ties broken by lower leaf id.
    ///
    /// The result length is `min(k, leaves reachable through the selected
    /// clusters)`; `k = 0` yields an empty Vec.
    pub fn retrieve(
        &self,
        index: &ClusterIndex,
        query: &[f32],
        target_emotion: Option<Emotion>,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        if query.len() != index.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dimension(),
                actual: query.len(),
            });
        }
        if index.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        // Step 1 (coarse): best level-2 clusters by centroid similarity
        let l2_selected = top_clusters(
            index.l2_nodes().iter().map(|n| (n.id, n.centroid.as_slice())),
            query,
            self.config.l2_fan_out,
        );

        // Step 2 (mid): best level-1 clusters among the selected subtrees
        let l1_candidates: Vec<u32> = l2_selected
            .iter()
            .filter_map(|&id| index.l2(id))
            .flat_map(|n| n.members.iter().map(|&m| m as u32))
            .collect();
        let l1_selected = top_clusters(
            l1_candidates
                .iter()
                .filter_map(|&id| index.l1(id))
                .map(|n| (n.id, n.centroid.as_slice())),
            query,
            self.config.l1_fan_out,
        );

        // Step 3 (fine): blended score over every reachable leaf
        let mut hits: Vec<RetrievedChunk> = l1_selected
            .iter()
            .filter_map(|&id| index.l1(id))
            .flat_map(|n| n.members.iter())
            .filter_map(|&leaf_id| index.leaf(leaf_id))
            .map(|leaf| RetrievedChunk {
                score: self.config.scorer.score(query, leaf, target_emotion),
                chunk: leaf.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(k);

        debug!(
            k,
            l2_selected = l2_selected.len(),
            l1_selected = l1_selected.len(),
            returned = hits.len(),
            target = ?target_emotion,
            "Retrieval complete"
        );
        Ok(hits)
    }
}

/// Rank clusters by centroid cosine similarity and keep the best `fan_out`
/// ids. Ties resolve to the lower cluster id.
fn top_clusters<'a, I>(clusters: I, query: &[f32], fan_out: usize) -> Vec<u32>
where
    I: Iterator<Item = (u32, &'a [f32])>,
{
    let mut ranked: Vec<(u32, f32)> = clusters
        .map(|(id, centroid)| (id, cosine_similarity(query, centroid)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(fan_out);
    ranked.into_iter().map(|(id, _)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recall_types::{ClusterLevel, ClusterNode, EmotionProfile};

    fn leaf(id: u64, embedding: Vec<f32>, emotion: Emotion) -> LeafChunk {
        LeafChunk::new(id, embedding, emotion, format!("row:{id}"))
    }

    /// Two well-separated L1 clusters under one L2 cluster.
    fn two_cluster_index() -> ClusterIndex {
        let leaves = vec![
            leaf(0, vec![1.0, 0.0], Emotion::Joy),
            leaf(1, vec![0.9, 0.1], Emotion::Joy),
            leaf(2, vec![0.0, 1.0], Emotion::Sadness),
            leaf(3, vec![0.1, 0.9], Emotion::Hurt),
        ];
        let l1 = vec![
            ClusterNode::new(
                0,
                ClusterLevel::L1,
                vec![0.95, 0.05],
                vec![0, 1],
                EmotionProfile::from_labels(vec![Emotion::Joy, Emotion::Joy]),
            ),
            ClusterNode::new(
                1,
                ClusterLevel::L1,
                vec![0.05, 0.95],
                vec![2, 3],
                EmotionProfile::from_labels(vec![Emotion::Sadness, Emotion::Hurt]),
            ),
        ];
        let l2 = vec![ClusterNode::new(
            0,
            ClusterLevel::L2,
            vec![0.5, 0.5],
            vec![0, 1],
            EmotionProfile::from_labels(vec![
                Emotion::Joy,
                Emotion::Joy,
                Emotion::Sadness,
                Emotion::Hurt,
            ]),
        )];
        ClusterIndex::new("01RETRIEVE", Utc::now(), false, 2, leaves, l1, l2)
    }

    #[test]
    fn test_results_sorted_descending() {
        let index = two_cluster_index();
        let retriever = Retriever::default();
        let hits = retriever.retrieve(&index, &[1.0, 0.0], None, 4).unwrap();

        assert_eq!(hits.len(), 4);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(hits[0].chunk.id, 0);
    }

    #[test]
    fn test_k_zero_returns_empty() {
        let index = two_cluster_index();
        let hits = Retriever::default()
            .retrieve(&index, &[1.0, 0.0], None, 0)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_k_larger_than_reachable() {
        let index = two_cluster_index();
        let hits = Retriever::default()
            .retrieve(&index, &[1.0, 0.0], None, 50)
            .unwrap();
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn test_dimension_guard() {
        let index = two_cluster_index();
        let err = Retriever::default()
            .retrieve(&index, &[1.0, 0.0, 0.0], None, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_empty_index_rejected() {
        let index = ClusterIndex::new("01EMPTY", Utc::now(), false, 2, vec![], vec![], vec![]);
        let err = Retriever::default()
            .retrieve(&index, &[1.0, 0.0], None, 3)
            .unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyIndex));
    }

    #[test]
    fn test_narrow_beam_prunes_far_cluster() {
        // Two L2 clusters; a beam of one never reaches the far subtree
        let leaves = vec![
            leaf(0, vec![1.0, 0.0], Emotion::Joy),
            leaf(1, vec![0.0, 1.0], Emotion::Sadness),
        ];
        let l1 = vec![
            ClusterNode::new(
                0,
                ClusterLevel::L1,
                vec![1.0, 0.0],
                vec![0],
                EmotionProfile::from_labels(vec![Emotion::Joy]),
            ),
            ClusterNode::new(
                1,
                ClusterLevel::L1,
                vec![0.0, 1.0],
                vec![1],
                EmotionProfile::from_labels(vec![Emotion::Sadness]),
            ),
        ];
        let l2 = vec![
            ClusterNode::new(
                0,
                ClusterLevel::L2,
                vec![1.0, 0.0],
                vec![0],
                EmotionProfile::from_labels(vec![Emotion::Joy]),
            ),
            ClusterNode::new(
                1,
                ClusterLevel::L2,
                vec![0.0, 1.0],
                vec![1],
                EmotionProfile::from_labels(vec![Emotion::Sadness]),
            ),
        ];
        let index = ClusterIndex::new("01BEAM", Utc::now(), false, 2, leaves, l1, l2);

        let narrow = Retriever::new(RetrieverConfig::default().with_fan_out(1, 1));
        let hits = narrow.retrieve(&index, &[1.0, 0.05], None, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, 0);

        // Widening the beam recovers the rest of the tree
        let wide = Retriever::new(RetrieverConfig::default().with_fan_out(2, 2));
        let hits = wide.retrieve(&index, &[1.0, 0.05], None, 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_emotion_target_reorders() {
        let index = two_cluster_index();
        // Query equidistant-ish, target pulls the sad cluster up
        let config = RetrieverConfig::default().with_scorer(ScorerConfig::new(0.3));
        let retriever = Retriever::new(config);
        let hits = retriever
            .retrieve(&index, &[0.6, 0.55], Some(Emotion::Sadness), 4)
            .unwrap();

        assert_eq!(hits[0].chunk.emotion, Emotion::Sadness);
    }

    #[test]
    fn test_tie_breaks_by_lower_id() {
        // Identical embeddings and labels: scores tie exactly
        let leaves = vec![
            leaf(5, vec![1.0, 0.0], Emotion::Joy),
            leaf(3, vec![1.0, 0.0], Emotion::Joy),
        ];
        let l1 = vec![ClusterNode::new(
            0,
            ClusterLevel::L1,
            vec![1.0, 0.0],
            vec![5, 3],
            EmotionProfile::from_labels(vec![Emotion::Joy, Emotion::Joy]),
        )];
        let l2 = vec![ClusterNode::new(
            0,
            ClusterLevel::L2,
            vec![1.0, 0.0],
            vec![0],
            EmotionProfile::from_labels(vec![Emotion::Joy, Emotion::Joy]),
        )];
        let index = ClusterIndex::new("01TIE", Utc::now(), false, 2, leaves, l1, l2);

        let hits = Retriever::default()
            .retrieve(&index, &[1.0, 0.0], None, 2)
            .unwrap();
        assert_eq!(hits[0].chunk.id, 3);
        assert_eq!(hits[1].chunk.id, 5);
    }
}
