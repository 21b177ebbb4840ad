//! Principal Coordinates Analysis (classical multidimensional scaling).

use ordina_core::Result;

use crate::distance::DistanceMatrix;
use crate::eigen::symmetric_eigen;
use crate::ordination::{check_components, Diagnostics, Method, OrdinationResult};

/// Eigenvalues below `-NEGATIVE_EPS` are counted as genuinely negative.
const NEGATIVE_EPS: f64 = 1e-10;

/// Principal Coordinates Analysis (Gower's method).
///
/// Embeds samples into a low-dimensional Euclidean space that best preserves
/// the pairwise distances.
///
/// # Algorithm
///
/// 1. Double-center the squared distance matrix: `G = -½ (D² - row_mean - col_mean + grand_mean)`
/// 2. Eigendecompose G, eigenpairs sorted descending
/// 3. Coordinates = eigenvector × √max(λ, 0)
///
/// Non-Euclidean metrics (Jaccard, Bray-Curtis) can make G indefinite. The
/// negative eigenvalues are truncated to zero for the coordinates; the
/// reported eigenvalues keep their sign and the count of negatives is
/// returned in the diagnostics. When `n_components > n` the extra axes are
/// zero.
///
/// # Errors
///
/// Returns an error if `n_components` is 0 or the eigensolver fails.
pub fn run_pcoa(distances: &DistanceMatrix, n_components: usize) -> Result<OrdinationResult> {
    check_components(n_components)?;
    let n = distances.n();

    let g = gower_matrix(distances);
    let eig = symmetric_eigen(&g, n)?;

    let n_negative = eig.values.iter().filter(|&&e| e < -NEGATIVE_EPS).count();
    let total_positive: f64 = eig.values.iter().filter(|&&e| e > 0.0).sum();

    let axes = n_components.min(n);
    let mut coordinates = vec![vec![0.0; n_components]; n];
    for k in 0..axes {
        let scale = eig.values[k].max(0.0).sqrt();
        for (i, row) in coordinates.iter_mut().enumerate() {
            row[k] = eig.vectors[k][i] * scale;
        }
    }

    let mut eigenvalues = eig.values[..axes].to_vec();
    eigenvalues.resize(n_components, 0.0);
    let proportion_explained = eigenvalues
        .iter()
        .map(|&e| {
            if total_positive > 0.0 && e > 0.0 {
                e / total_positive
            } else {
                0.0
            }
        })
        .collect();

    if n_negative > 0 {
        tracing::debug!(n_negative, "pcoa: indefinite Gower matrix, negative eigenvalues truncated");
    }
    tracing::debug!(n_samples = n, n_components, sweeps = eig.sweeps, "pcoa finished");

    Ok(OrdinationResult {
        method: Method::Pcoa,
        coordinates,
        diagnostics: Diagnostics::Spectral {
            eigenvalues,
            proportion_explained,
            n_negative_eigenvalues: n_negative,
        },
    })
}

/// `-½ D∘D`, double-centered. Flat row-major `n × n`.
fn gower_matrix(distances: &DistanceMatrix) -> Vec<f64> {
    let n = distances.n();
    let mut g: Vec<f64> = distances
        .as_slice()
        .iter()
        .map(|&d| -0.5 * d * d)
        .collect();
    double_center(&mut g, n);
    g
}

/// Subtract row and column means and add back the grand mean, in place.
fn double_center(matrix: &mut [f64], n: usize) {
    let mut row_means = vec![0.0; n];
    let mut col_means = vec![0.0; n];
    let mut grand_mean = 0.0;

    for i in 0..n {
        for j in 0..n {
            let v = matrix[i * n + j];
            row_means[i] += v;
            col_means[j] += v;
            grand_mean += v;
        }
    }
    for m in row_means.iter_mut() {
        *m /= n as f64;
    }
    for m in col_means.iter_mut() {
        *m /= n as f64;
    }
    grand_mean /= (n * n) as f64;

    for i in 0..n {
        for j in 0..n {
            matrix[i * n + j] = matrix[i * n + j] - row_means[i] - col_means[j] + grand_mean;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{build_matrix, Metric};
    use crate::pca::run_pca;
    use ordina_core::OrdinaError;

    fn embedded(coords: &[Vec<f64>], i: usize, j: usize) -> f64 {
        coords[i]
            .iter()
            .zip(&coords[j])
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn unit_square() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ]
    }

    #[test]
    fn euclidean_recovers_structure() {
        let points = vec![vec![0.0, 0.0], vec![3.0, 0.0], vec![0.0, 4.0]];
        let dm = build_matrix(&points, Metric::Euclidean).unwrap();
        let result = run_pcoa(&dm, 2).unwrap();
        assert_eq!(result.coordinates.len(), 3);
        assert_eq!(result.coordinates[0].len(), 2);
        for i in 0..3 {
            for j in (i + 1)..3 {
                let recon = embedded(&result.coordinates, i, j);
                assert!(
                    (recon - dm.get(i, j)).abs() < 1e-9,
                    "d[{},{}]: orig={} recon={}",
                    i,
                    j,
                    dm.get(i, j),
                    recon
                );
            }
        }
    }

    #[test]
    fn unit_square_matches_pca() {
        let samples = unit_square();
        let dm = build_matrix(&samples, Metric::Euclidean).unwrap();
        let pcoa = run_pcoa(&dm, 2).unwrap();
        let pca = run_pca(&samples, 2).unwrap();
        for i in 0..4 {
            for j in (i + 1)..4 {
                let a = embedded(&pcoa.coordinates, i, j);
                let b = embedded(&pca.coordinates, i, j);
                assert!((a - dm.get(i, j)).abs() < 1e-6);
                assert!((a - b).abs() < 1e-6, "pcoa={a} pca={b}");
            }
        }
    }

    #[test]
    fn no_negative_eigenvalues_for_euclidean() {
        let dm = build_matrix(&unit_square(), Metric::Euclidean).unwrap();
        let result = run_pcoa(&dm, 2).unwrap();
        match result.diagnostics {
            Diagnostics::Spectral {
                n_negative_eigenvalues,
                ..
            } => assert_eq!(n_negative_eigenvalues, 0),
            other => panic!("unexpected diagnostics {other:?}"),
        }
    }

    #[test]
    fn indefinite_input_truncated_not_error() {
        // violates the triangle inequality, so G has a negative eigenvalue
        let dm = DistanceMatrix::from_rows(&[
            vec![0.0, 1.0, 5.0],
            vec![1.0, 0.0, 1.0],
            vec![5.0, 1.0, 0.0],
        ])
        .unwrap();
        let result = run_pcoa(&dm, 3).unwrap();
        match &result.diagnostics {
            Diagnostics::Spectral {
                eigenvalues,
                n_negative_eigenvalues,
                ..
            } => {
                assert!(*n_negative_eigenvalues >= 1);
                assert!(eigenvalues[2] < 0.0);
            }
            other => panic!("unexpected diagnostics {other:?}"),
        }
        assert!(result.coordinates.iter().all(|r| r[2] == 0.0));
        assert!(result.coordinates.iter().flatten().all(|x| x.is_finite()));
    }

    #[test]
    fn proportion_explained_sums_reasonable() {
        let dm = DistanceMatrix::from_rows(&[
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 1.5],
            vec![2.0, 1.5, 0.0],
        ])
        .unwrap();
        let result = run_pcoa(&dm, 2).unwrap();
        if let Diagnostics::Spectral {
            proportion_explained,
            ..
        } = &result.diagnostics
        {
            let total: f64 = proportion_explained.iter().sum();
            assert!(total <= 1.0 + 1e-10, "total={}", total);
            assert!(total > 0.0, "total={}", total);
        }
    }

    #[test]
    fn all_zero_distances_collapse_to_origin() {
        let dm = DistanceMatrix::from_flat(vec![0.0; 16], 4).unwrap();
        let result = run_pcoa(&dm, 2).unwrap();
        assert!(result.coordinates.iter().flatten().all(|&x| x == 0.0));
    }

    #[test]
    fn extra_components_are_zero() {
        let dm = DistanceMatrix::from_flat(vec![0.0, 2.0, 2.0, 0.0], 2).unwrap();
        let result = run_pcoa(&dm, 3).unwrap();
        assert_eq!(result.n_components(), 3);
        assert!((embedded(&result.coordinates, 0, 1) - 2.0).abs() < 1e-12);
        assert!(result.coordinates.iter().all(|r| r[2] == 0.0));
    }

    #[test]
    fn zero_components_error() {
        let dm = DistanceMatrix::from_flat(vec![0.0, 1.0, 1.0, 0.0], 2).unwrap();
        assert!(matches!(
            run_pcoa(&dm, 0).unwrap_err(),
            OrdinaError::InvalidInput(_)
        ));
    }

    #[test]
    fn nan_distance_is_eigen_failure() {
        let dm = DistanceMatrix::from_flat(vec![0.0, f64::NAN, f64::NAN, 0.0], 2).unwrap();
        assert!(matches!(
            run_pcoa(&dm, 2).unwrap_err(),
            OrdinaError::EigenFailure(_)
        ));
    }

    #[test]
    fn double_center_row_col_means_zero() {
        let mut m = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        double_center(&mut m, 3);
        for i in 0..3 {
            let row_mean: f64 = (0..3).map(|j| m[i * 3 + j]).sum::<f64>() / 3.0;
            assert!(row_mean.abs() < 1e-10, "row {} mean = {}", i, row_mean);
        }
        for j in 0..3 {
            let col_mean: f64 = (0..3).map(|i| m[i * 3 + j]).sum::<f64>() / 3.0;
            assert!(col_mean.abs() < 1e-10, "col {} mean = {}", j, col_mean);
        }
    }

    #[test]
    fn double_center_matches_centering_matrix_form() {
        // B = -½ J D² J with J = I - 11ᵀ/n
        let dm = build_matrix(
            &[vec![0.0, 1.0], vec![2.0, 0.5], vec![1.0, 3.0], vec![4.0, 2.0]],
            Metric::Euclidean,
        )
        .unwrap();
        let n = 4;
        let g = gower_matrix(&dm);

        let j: Vec<f64> = (0..n * n)
            .map(|idx| (if idx / n == idx % n { 1.0 } else { 0.0 }) - 1.0 / n as f64)
            .collect();
        let d2: Vec<f64> = dm.as_slice().iter().map(|d| d * d).collect();
        let mul = |a: &[f64], b: &[f64]| -> Vec<f64> {
            (0..n * n)
                .map(|idx| (0..n).map(|k| a[(idx / n) * n + k] * b[k * n + idx % n]).sum())
                .collect()
        };
        let b = mul(&mul(&j, &d2), &j);
        for (x, y) in g.iter().zip(&b) {
            assert!((x - (-0.5 * y)).abs() < 1e-10);
        }
    }
}
