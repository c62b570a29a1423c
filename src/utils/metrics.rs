use ndarray::{ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// Fit quality of a factorization against its training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionMetrics {
    /// `||R - R_hat||_F`
    pub frobenius_error: f64,
    pub rmse: f64,
    pub max_abs_error: f64,
}

impl ReconstructionMetrics {
    /// Compares `actual` with `predicted`; both must have the same shape.
    pub fn compute(actual: ArrayView2<'_, f64>, predicted: ArrayView2<'_, f64>) -> Option<Self> {
        if actual.dim() != predicted.dim() || actual.is_empty() {
            return None;
        }

        let (sum_sq, max_abs) = Zip::from(actual)
            .and(predicted)
            .fold((0.0f64, 0.0f64), |(sum, max), &a, &p| {
                let diff = (a - p).abs();
                (sum + diff * diff, max.max(diff))
            });

        Some(Self {
            frobenius_error: sum_sq.sqrt(),
            rmse: (sum_sq / actual.len() as f64).sqrt(),
            max_abs_error: max_abs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_reconstruction() {
        let r = array![[1.0, 2.0], [3.0, 4.0]];
        let m = ReconstructionMetrics::compute(r.view(), r.view()).unwrap();
        assert_eq!(m.frobenius_error, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.max_abs_error, 0.0);
    }

    #[test]
    fn test_errors() {
        let r = array![[1.0, 2.0], [3.0, 4.0]];
        let r_hat = array![[1.0, 2.0], [3.0, 2.0]];
        let m = ReconstructionMetrics::compute(r.view(), r_hat.view()).unwrap();
        assert!((m.frobenius_error - 2.0).abs() < 1e-12);
        assert!((m.rmse - 1.0).abs() < 1e-12);
        assert_eq!(m.max_abs_error, 2.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let r = array![[1.0, 2.0]];
        let r_hat = array![[1.0], [2.0]];
        assert!(ReconstructionMetrics::compute(r.view(), r_hat.view()).is_none());
    }
}
