//! Seeded k-means under cosine similarity.
//!
//! Lloyd iteration with k-means++ initialization. Every step is
//! deterministic for a fixed seed: point order is the input order, ties in
//! assignment and reseeding resolve to the lowest index, and the only
//! randomness flows through a seeded `StdRng`.

use std::collections::BTreeSet;

use rand::prelude::*;
use tracing::debug;

use recall_types::{cosine_similarity, mean_centroid};

/// Result of one clustering run.
#[derive(Debug)]
pub(crate) struct KmeansOutcome {
    /// Cluster index per input point. Clusters may be empty when the data
    /// has fewer distinct points than `k`; callers drop those.
    pub assignments: Vec<usize>,
    /// Exact member means for the final assignment (empty clusters keep an
    /// empty centroid).
    pub centroids: Vec<Vec<f32>>,
    /// False when the iteration cap ran out before assignments stabilized.
    pub converged: bool,
    /// Iterations actually run.
    pub iterations: usize,
}

/// Partition `points` into at most `k` clusters.
///
/// Callers guarantee `points` is non-empty and `k >= 1`; `k` is capped at
/// the point count, in which case every point becomes its own cluster.
pub(crate) fn cluster(
    points: &[&[f32]],
    k: usize,
    seed: u64,
    max_iterations: usize,
) -> KmeansOutcome {
    let n = points.len();
    let k = k.min(n);

    if k == n {
        // Each point its own cluster: nothing to iterate
        return KmeansOutcome {
            assignments: (0..n).collect(),
            centroids: points.iter().map(|p| p.to_vec()).collect(),
            converged: true,
            iterations: 0,
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = init_centroids(points, k, &mut rng);
    let mut assignments: Vec<usize> = vec![usize::MAX; n];
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=max_iterations {
        iterations = iteration;

        let next = assign(points, &centroids);
        if next == assignments {
            converged = true;
            break;
        }
        assignments = next;

        centroids = update_centroids(points, &assignments, k);
        reseed_empty_clusters(points, &assignments, &mut centroids);
    }

    // Final centroids are the exact means of the final assignment; a
    // reseeded centroid that never attracted members stays empty.
    centroids = update_centroids(points, &assignments, k);

    debug!(
        points = n,
        clusters = k,
        iterations,
        converged,
        "Clustering pass finished"
    );

    KmeansOutcome {
        assignments,
        centroids,
        converged,
        iterations,
    }
}

/// k-means++ seeding: spread initial centroids by sampling points with
/// probability proportional to squared cosine distance from the nearest
/// already-chosen centroid.
fn init_centroids(points: &[&[f32]], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = points.len();
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);

    let first = rng.random_range(0..n);
    centroids.push(points[first].to_vec());

    while centroids.len() < k {
        let weights: Vec<f32> = points
            .iter()
            .map(|point| {
                let nearest = centroids
                    .iter()
                    .map(|c| cosine_distance(point, c))
                    .fold(f32::MAX, f32::min);
                nearest * nearest
            })
            .collect();

        let total: f32 = weights.iter().sum();
        let selected = if total == 0.0 {
            // All remaining points coincide with a centroid
            rng.random_range(0..n)
        } else {
            let threshold = rng.random::<f32>() * total;
            let mut cumulative = 0.0;
            let mut pick = n - 1;
            for (i, &w) in weights.iter().enumerate() {
                cumulative += w;
                if cumulative >= threshold {
                    pick = i;
                    break;
                }
            }
            pick
        };
        centroids.push(points[selected].to_vec());
    }

    centroids
}

/// Assign every point to its most similar centroid; strict comparison
/// keeps the lowest centroid index on ties.
fn assign(points: &[&[f32]], centroids: &[Vec<f32>]) -> Vec<usize> {
    points
        .iter()
        .map(|point| {
            let mut best_cluster = 0;
            let mut best_sim = f32::MIN;
            for (c, centroid) in centroids.iter().enumerate() {
                if centroid.is_empty() {
                    continue;
                }
                let sim = cosine_similarity(point, centroid);
                if sim > best_sim {
                    best_sim = sim;
                    best_cluster = c;
                }
            }
            best_cluster
        })
        .collect()
}

fn update_centroids(points: &[&[f32]], assignments: &[usize], k: usize) -> Vec<Vec<f32>> {
    (0..k)
        .map(|c| {
            mean_centroid(
                assignments
                    .iter()
                    .zip(points)
                    .filter(|(&a, _)| a == c)
                    .map(|(_, &p)| p),
            )
        })
        .collect()
}

/// Dissolve empty clusters by reseeding each from the globally farthest
/// point: the point least similar to its own cluster's centroid. Lowest
/// index wins ties; a point reused once in the same pass is skipped.
fn reseed_empty_clusters(points: &[&[f32]], assignments: &[usize], centroids: &mut [Vec<f32>]) {
    let empty: Vec<usize> = centroids
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_empty())
        .map(|(i, _)| i)
        .collect();
    if empty.is_empty() {
        return;
    }

    let mut used: BTreeSet<usize> = BTreeSet::new();
    for cluster in empty {
        let mut farthest: Option<(usize, f32)> = None;
        for (i, point) in points.iter().enumerate() {
            if used.contains(&i) {
                continue;
            }
            let own = &centroids[assignments[i]];
            if own.is_empty() {
                continue;
            }
            let sim = cosine_similarity(point, own);
            match farthest {
                Some((_, best)) if sim >= best => {}
                _ => farthest = Some((i, sim)),
            }
        }

        if let Some((i, _)) = farthest {
            debug!(cluster, point = i, "Reseeding empty cluster");
            used.insert(i);
            centroids[cluster] = points[i].to_vec();
        }
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).max(0.0)
}
