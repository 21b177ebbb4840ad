//! ndarray-backed covariance for PCA.
//!
//! With the `blas` feature enabled the `XᵀX` product goes through ndarray's
//! matrix multiply, which can dispatch to BLAS. The eigendecomposition
//! itself is unchanged.

use ndarray::ArrayView2;
use ordina_core::{OrdinaError, Result};

/// `XᵀX / (n - 1)` for a flat row-major, already centered `n × p` matrix.
pub(crate) fn covariance_ndarray(centered: &[f64], n: usize, p: usize) -> Result<Vec<f64>> {
    let x = ArrayView2::from_shape((n, p), centered)
        .map_err(|e| OrdinaError::ShapeMismatch(format!("covariance: {e}")))?;
    let scale = (n - 1) as f64;
    let cov = x.t().dot(&x) / scale;
    Ok(cov.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_hand_computed_covariance() {
        // centered columns: [-1, 0, 1] and [2, 0, -2]
        let centered = [-1.0, 2.0, 0.0, 0.0, 1.0, -2.0];
        let cov = covariance_ndarray(&centered, 3, 2).unwrap();
        assert_eq!(cov, vec![1.0, -2.0, -2.0, 4.0]);
    }
}
