//! Principal Component Analysis.
//!
//! PCA always works on the mean-centered feature matrix itself. It never
//! consumes a distance matrix, so the metric chosen for PCoA/NMDS has no
//! effect here.

use ordina_core::Result;

use crate::distance::validate_samples;
use crate::eigen::symmetric_eigen;
use crate::ordination::{check_components, Diagnostics, Method, OrdinationResult};

/// Run PCA on `samples` (`n × p`) and keep the first `n_components` axes.
///
/// # Algorithm
///
/// 1. Subtract the column mean from every feature
/// 2. Covariance `C = XᵀX / (n - 1)`
/// 3. Eigendecompose `C`, eigenpairs sorted descending
/// 4. Scores = centered data × leading eigenvectors
///
/// A constant column centers to zeros and only contributes a zero
/// eigenvalue. When `n_components > p` the extra axes are returned as
/// zero-variance axes (all-zero scores, eigenvalue 0).
///
/// # Errors
///
/// Returns an error if there are fewer than 2 samples, rows are ragged,
/// `n_components` is 0, or the eigensolver fails (for example on NaN
/// input).
pub fn run_pca(samples: &[Vec<f64>], n_components: usize) -> Result<OrdinationResult> {
    let p = validate_samples(samples)?;
    check_components(n_components)?;
    let n = samples.len();

    let centered = center_columns(samples, p);
    let cov = covariance(&centered, n, p)?;
    let total_variance: f64 = (0..p).map(|i| cov[i * p + i]).sum();

    let eig = symmetric_eigen(&cov, p)?;

    let mut eigenvalues = Vec::with_capacity(n_components);
    let mut coordinates = vec![vec![0.0; n_components]; n];
    for k in 0..n_components.min(p) {
        // Rounding can leave a tiny negative value on a zero-variance axis.
        eigenvalues.push(eig.values[k].max(0.0));
        let axis = &eig.vectors[k];
        for (row, scores) in centered.chunks(p).zip(coordinates.iter_mut()) {
            scores[k] = row.iter().zip(axis).map(|(x, w)| x * w).sum();
        }
    }
    eigenvalues.resize(n_components, 0.0);

    let proportion_explained = eigenvalues
        .iter()
        .map(|&e| if total_variance > 0.0 { e / total_variance } else { 0.0 })
        .collect();

    tracing::debug!(
        n_samples = n,
        n_features = p,
        n_components,
        sweeps = eig.sweeps,
        "pca finished"
    );

    Ok(OrdinationResult {
        method: Method::Pca,
        coordinates,
        diagnostics: Diagnostics::Spectral {
            eigenvalues,
            proportion_explained,
            n_negative_eigenvalues: 0,
        },
    })
}

/// Flat row-major copy of `samples` with every column mean subtracted.
fn center_columns(samples: &[Vec<f64>], p: usize) -> Vec<f64> {
    let n = samples.len();
    let mut mean = vec![0.0; p];
    for row in samples {
        for (m, &x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    for m in mean.iter_mut() {
        *m /= n as f64;
    }

    let mut centered = Vec::with_capacity(n * p);
    for row in samples {
        centered.extend(row.iter().zip(&mean).map(|(x, m)| x - m));
    }
    centered
}

/// `XᵀX / (n - 1)` for a flat row-major `n × p` matrix.
#[cfg(not(feature = "blas"))]
fn covariance(centered: &[f64], n: usize, p: usize) -> Result<Vec<f64>> {
    let mut cov = vec![0.0; p * p];
    for r in centered.chunks(p) {
        for i in 0..p {
            for j in i..p {
                let val = r[i] * r[j];
                cov[i * p + j] += val;
                if i != j {
                    cov[j * p + i] += val;
                }
            }
        }
    }
    let scale = (n - 1) as f64;
    for v in cov.iter_mut() {
        *v /= scale;
    }
    Ok(cov)
}

#[cfg(feature = "blas")]
fn covariance(centered: &[f64], n: usize, p: usize) -> Result<Vec<f64>> {
    crate::blas_pca::covariance_ndarray(centered, n, p)
}
