//! Emotion label taxonomy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed set of emotion categories assigned to corpus chunks.
///
/// The first six labels mirror the wellness-dialog taxonomy the corpus was
/// annotated with. `Neutral` covers chunks that carry no label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    /// 기쁨
    Joy,
    /// 슬픔
    Sadness,
    /// 분노
    Anger,
    /// 불안
    Anxiety,
    /// 당황
    Panic,
    /// 상처
    Hurt,
    /// No label assigned
    Neutral,
}

impl Emotion {
    /// Canonical label used in persisted metadata tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Anxiety => "anxiety",
            Emotion::Panic => "panic",
            Emotion::Hurt => "hurt",
            Emotion::Neutral => "neutral",
        }
    }

    /// Parse a persisted label. Returns `None` for anything outside the set.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "joy" => Some(Emotion::Joy),
            "sadness" => Some(Emotion::Sadness),
            "anger" => Some(Emotion::Anger),
            "anxiety" => Some(Emotion::Anxiety),
            "panic" => Some(Emotion::Panic),
            "hurt" => Some(Emotion::Hurt),
            "neutral" => Some(Emotion::Neutral),
            _ => None,
        }
    }

    /// All recognized emotion categories.
    pub fn all() -> &'static [Emotion] {
        &[
            Emotion::Joy,
            Emotion::Sadness,
            Emotion::Anger,
            Emotion::Anxiety,
            Emotion::Panic,
            Emotion::Hurt,
            Emotion::Neutral,
        ]
    }

    /// Whether two distinct labels are close enough to earn partial
    /// affinity when blending retrieval scores.
    ///
    /// Pairs: sadness↔hurt, anxiety↔panic, sadness↔anxiety.
    pub fn is_related(self, other: Emotion) -> bool {
        use Emotion::*;
        matches!(
            (self, other),
            (Sadness, Hurt)
                | (Hurt, Sadness)
                | (Anxiety, Panic)
                | (Panic, Anxiety)
                | (Sadness, Anxiety)
                | (Anxiety, Sadness)
        )
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Distribution of emotion labels over the leaves beneath a cluster node.
///
/// Proportions sum to 1 for any non-empty node. Backed by a `BTreeMap` so
/// iteration order is stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmotionProfile {
    proportions: BTreeMap<Emotion, f32>,
}

impl EmotionProfile {
    /// Build a profile from the labels of a node's member leaves.
    pub fn from_labels<I: IntoIterator<Item = Emotion>>(labels: I) -> Self {
        let mut counts: BTreeMap<Emotion, usize> = BTreeMap::new();
        let mut total = 0usize;
        for label in labels {
            *counts.entry(label).or_insert(0) += 1;
            total += 1;
        }

        let mut proportions = BTreeMap::new();
        if total > 0 {
            for (emotion, count) in counts {
                proportions.insert(emotion, count as f32 / total as f32);
            }
        }
        Self { proportions }
    }

    /// Proportion for a single label (0.0 when absent).
    pub fn proportion(&self, emotion: Emotion) -> f32 {
        self.proportions.get(&emotion).copied().unwrap_or(0.0)
    }

    /// The label with the highest proportion, if any.
    ///
    /// Ties resolve to the first label in enum order.
    pub fn dominant(&self) -> Option<(Emotion, f32)> {
        let mut best: Option<(Emotion, f32)> = None;
        for (&emotion, &p) in &self.proportions {
            match best {
                Some((_, bp)) if p <= bp => {}
                _ => best = Some((emotion, p)),
            }
        }
        best
    }

    /// Sum of all proportions (1.0 for a non-empty profile).
    pub fn total(&self) -> f32 {
        self.proportions.values().sum()
    }

    /// Whether the profile covers no leaves.
    pub fn is_empty(&self) -> bool {
        self.proportions.is_empty()
    }

    /// Iterate labels and proportions in stable enum order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        self.proportions.iter().map(|(&e, &p)| (e, p))
    }
}
