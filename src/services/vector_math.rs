//! Vector arithmetic shared by every similarity code path.

use crate::error::{AppError, AppResult};

/// Element-wise arithmetic mean of equally sized vectors
///
/// Sums are accumulated in `f64` so averaging many seeds does not drift.
pub fn average<V: AsRef<[f32]>>(vectors: &[V]) -> AppResult<Vec<f32>> {
    let first = vectors
        .first()
        .ok_or_else(|| AppError::InvalidInput("Cannot average zero vectors".to_string()))?;
    let dimension = first.as_ref().len();

    let mut sums = vec![0.0_f64; dimension];
    for vector in vectors {
        let vector = vector.as_ref();
        if vector.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += f64::from(*value);
        }
    }

    let count = vectors.len() as f64;
    Ok(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}

/// Cosine of the angle between `a` and `b`
///
/// A zero-magnitude input yields NaN. Callers ranking by this value must
/// discard non-finite scores.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> AppResult<f32> {
    if a.len() != b.len() {
        return Err(AppError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_single_vector_is_identity() {
        let v = vec![0.25, -1.5, 3.0];
        assert_eq!(average(&[v.clone()]).unwrap(), v);
    }

    #[test]
    fn test_average_elementwise_mean() {
        let avg = average(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![2.0, 2.0]]).unwrap();
        assert_eq!(avg, vec![1.0, 1.0]);
    }

    #[test]
    fn test_average_accepts_slices() {
        let a = [1.0_f32, 3.0];
        let b = [3.0_f32, 5.0];
        let avg = average(&[&a[..], &b[..]]).unwrap();
        assert_eq!(avg, vec![2.0, 4.0]);
    }

    #[test]
    fn test_average_dimension_mismatch() {
        let result = average(&[vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_average_empty_input() {
        let empty: Vec<Vec<f32>> = vec![];
        assert!(matches!(average(&empty), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = [0.3, -0.7, 1.2, 4.0];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_symmetric() {
        let a = [0.9, 0.1, -0.4];
        let b = [-0.2, 0.8, 0.5];
        assert_eq!(
            cosine_similarity(&a, &b).unwrap(),
            cosine_similarity(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((opposite + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_known_value() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.9, 0.1]).unwrap();
        assert!((sim - 0.99388).abs() < 1e-4);
    }

    #[test]
    fn test_cosine_similarity_zero_vector_is_not_finite() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).unwrap();
        assert!(!sim.is_finite());
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        let result = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
    }
}
