//! Vector similarity helpers.
//!
//! Pure Rust, no external math dependencies.

/// Cosine similarity between two vectors.
///
/// Returns a value in [-1.0, 1.0] where 1.0 = identical direction. A zero
/// vector has no direction and scores 0.0 against everything.
///
/// # Panics
/// Panics if vectors have different dimensions; callers validate dimensions
/// before scoring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Coordinate-wise arithmetic mean of a set of vectors.
///
/// The result is NOT normalized: persisted centroids must stay exact means
/// of their members.
pub fn mean_centroid<'a, I>(vectors: I) -> Vec<f32>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut sum: Vec<f32> = Vec::new();
    let mut count = 0usize;

    for v in vectors {
        if sum.is_empty() {
            sum = vec![0.0; v.len()];
        }
        assert_eq!(v.len(), sum.len(), "All vectors must have same dimension");
        for (acc, &x) in sum.iter_mut().zip(v.iter()) {
            *acc += x;
        }
        count += 1;
    }

    if count > 0 {
        let n = count as f32;
        for x in sum.iter_mut() {
            *x /= n;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_cosine_scale_invariant() {
        let a = vec![0.3, 0.4];
        let b: Vec<f32> = a.iter().map(|x| x * 50.0).collect();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);
    }

    #[test]
    #[should_panic(expected = "Vectors must have same dimension")]
    fn test_cosine_dimension_mismatch() {
        cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mean_centroid() {
        let e1 = vec![1.0, 0.0, 3.0];
        let e2 = vec![0.0, 1.0, 1.0];
        let centroid = mean_centroid([e1.as_slice(), e2.as_slice()]);
        assert_eq!(centroid, vec![0.5, 0.5, 2.0]);
    }

    #[test]
    fn test_mean_centroid_single() {
        // A singleton's centroid is the point itself, not its unit vector
        let e = vec![3.0, 4.0];
        let centroid = mean_centroid([e.as_slice()]);
        assert_eq!(centroid, vec![3.0, 4.0]);
    }

    #[test]
    fn test_mean_centroid_empty() {
        let centroid = mean_centroid(std::iter::empty());
        assert!(centroid.is_empty());
    }
}
