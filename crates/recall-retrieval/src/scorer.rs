//! Blended semantic/emotion scoring.

use serde::{Deserialize, Serialize};

use recall_types::{cosine_similarity, Emotion, LeafChunk};

/// Weights for blending vector similarity with emotion-label affinity.
///
/// Only the semantic weight is stored; the emotion weight is derived as
/// its complement, so the two always sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Share of the score taken by cosine similarity (clamped to [0, 1]).
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Affinity granted to related (non-identical) label pairs.
    #[serde(default = "default_related_affinity")]
    pub related_affinity: f32,
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_related_affinity() -> f32 {
    0.5
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            related_affinity: default_related_affinity(),
        }
    }
}

impl ScorerConfig {
    /// Create a config with the given semantic weight.
    pub fn new(semantic_weight: f32) -> Self {
        Self {
            semantic_weight: semantic_weight.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    /// Set the related-pair affinity.
    pub fn with_related_affinity(mut self, affinity: f32) -> Self {
        self.related_affinity = affinity.clamp(0.0, 1.0);
        self
    }

    /// Complement of the semantic weight.
    pub fn emotion_weight(&self) -> f32 {
        1.0 - self.semantic_weight.clamp(0.0, 1.0)
    }

    /// Label affinity: 1.0 on exact match, the configured mid value for
    /// related pairs, 0.0 otherwise.
    pub fn affinity(&self, label: Emotion, target: Emotion) -> f32 {
        if label == target {
            1.0
        } else if label.is_related(target) {
            self.related_affinity
        } else {
            0.0
        }
    }

    /// Blended score for one leaf against a query.
    ///
    /// With no target emotion the full weight falls to cosine similarity.
    pub fn score(&self, query: &[f32], leaf: &LeafChunk, target: Option<Emotion>) -> f32 {
        let similarity = cosine_similarity(query, &leaf.embedding);
        match target {
            None => similarity,
            Some(target) => {
                let w_sem = self.semantic_weight.clamp(0.0, 1.0);
                similarity * w_sem + self.affinity(leaf.emotion, target) * self.emotion_weight()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(emotion: Emotion, embedding: Vec<f32>) -> LeafChunk {
        LeafChunk::new(0, embedding, emotion, "row:0")
    }

    #[test]
    fn test_weights_sum_to_one() {
        let config = ScorerConfig::new(0.6);
        assert!((config.semantic_weight + config.emotion_weight() - 1.0).abs() < 1e-6);

        // Out-of-range input clamps rather than breaking the invariant
        let config = ScorerConfig::new(1.7);
        assert_eq!(config.semantic_weight, 1.0);
        assert_eq!(config.emotion_weight(), 0.0);
    }

    #[test]
    fn test_affinity_exact_related_unrelated() {
        let config = ScorerConfig::default();
        assert_eq!(config.affinity(Emotion::Joy, Emotion::Joy), 1.0);
        assert_eq!(config.affinity(Emotion::Sadness, Emotion::Hurt), 0.5);
        assert_eq!(config.affinity(Emotion::Joy, Emotion::Anger), 0.0);
    }

    #[test]
    fn test_no_target_uses_pure_similarity() {
        let config = ScorerConfig::new(0.5);
        let l = leaf(Emotion::Anger, vec![1.0, 0.0]);
        let score = config.score(&[1.0, 0.0], &l, None);
        // Not 0.5: the semantic share is not applied without a target
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_blend_with_target() {
        let config = ScorerConfig::new(0.7);
        let l = leaf(Emotion::Joy, vec![1.0, 0.0]);

        let matching = config.score(&[1.0, 0.0], &l, Some(Emotion::Joy));
        assert!((matching - 1.0).abs() < 1e-6); // 1.0 * 0.7 + 1.0 * 0.3

        let mismatched = config.score(&[1.0, 0.0], &l, Some(Emotion::Anger));
        assert!((mismatched - 0.7).abs() < 1e-6); // 1.0 * 0.7 + 0.0 * 0.3
    }

    #[test]
    fn test_related_target_scores_between() {
        let config = ScorerConfig::new(0.7).with_related_affinity(0.5);
        let l = leaf(Emotion::Hurt, vec![0.0, 1.0]);
        let query = [0.0, 1.0];

        let exact = config.score(&query, &l, Some(Emotion::Hurt));
        let related = config.score(&query, &l, Some(Emotion::Sadness));
        let unrelated = config.score(&query, &l, Some(Emotion::Joy));

        assert!(exact > related);
        assert!(related > unrelated);
    }

    #[test]
    fn test_emotion_only_blend() {
        // semantic_weight 0: ranking is label affinity alone
        let config = ScorerConfig::new(0.0);
        let l = leaf(Emotion::Anxiety, vec![1.0, 0.0]);
        let score = config.score(&[0.0, 1.0], &l, Some(Emotion::Anxiety));
        assert!((score - 1.0).abs() < 1e-6);
    }
}
