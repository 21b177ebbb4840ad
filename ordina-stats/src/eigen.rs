//! Symmetric eigendecomposition by cyclic Jacobi rotations.
//!
//! Jacobi is slower than tridiagonal QR for large matrices but is
//! unconditionally stable, yields orthonormal eigenvectors even for
//! repeated eigenvalues, and needs no LAPACK. The matrices handled here are
//! `p × p` covariances and `n × n` Gower matrices, which stay small for
//! ordination plots.
//!
//! Eigenpairs are returned sorted by eigenvalue, descending. Each
//! eigenvector's sign is fixed so that its entry of largest magnitude is
//! positive, making the output independent of rotation order.

use ordina_core::{OrdinaError, Result};

/// Upper bound on full sweeps over the off-diagonal before giving up.
const MAX_SWEEPS: usize = 100;

/// Relative off-diagonal norm below which the matrix counts as diagonal.
const TOLERANCE: f64 = 1e-12;

/// Eigenvalues and eigenvectors of a real symmetric matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues, descending.
    pub values: Vec<f64>,
    /// Unit eigenvectors; `vectors[k]` belongs to `values[k]`.
    pub vectors: Vec<Vec<f64>>,
    /// Number of Jacobi sweeps performed.
    pub sweeps: usize,
}

impl SymmetricEigen {
    /// Matrix dimension.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the decomposition is of a 0 × 0 matrix.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(eigenvalue, eigenvector)` pairs in descending order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> {
        self.values
            .iter()
            .copied()
            .zip(self.vectors.iter().map(|v| v.as_slice()))
    }
}

/// Eigendecompose a symmetric `n × n` matrix given in row-major order.
///
/// Only symmetry is assumed; the strict lower triangle is read but treated
/// as a mirror of the upper one.
///
/// # Errors
///
/// Returns [`OrdinaError::ShapeMismatch`] if `matrix.len() != n * n`, and
/// [`OrdinaError::EigenFailure`] if the matrix has non-finite entries or
/// the off-diagonal has not vanished after the sweep limit.
pub fn symmetric_eigen(matrix: &[f64], n: usize) -> Result<SymmetricEigen> {
    if matrix.len() != n * n {
        return Err(OrdinaError::ShapeMismatch(format!(
            "eigen: matrix has {} entries, expected {}x{}",
            matrix.len(),
            n,
            n
        )));
    }
    if let Some(pos) = matrix.iter().position(|v| !v.is_finite()) {
        return Err(OrdinaError::EigenFailure(format!(
            "matrix entry ({}, {}) is not finite",
            pos / n,
            pos % n
        )));
    }

    // Work on A / max|a_ij| so the squared norms below neither underflow
    // nor overflow; eigenvalues are scaled back at the end.
    let max_abs = matrix.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    let mut a: Vec<f64> = if max_abs > 0.0 {
        matrix.iter().map(|x| x / max_abs).collect()
    } else {
        matrix.to_vec()
    };
    let mut v = vec![0.0; n * n];
    for i in 0..n {
        v[i * n + i] = 1.0;
    }

    let scale = frobenius(&a);
    let mut sweeps = 0;
    loop {
        let off = off_diagonal_norm(&a, n);
        if off <= TOLERANCE * scale {
            break;
        }
        if sweeps == MAX_SWEEPS {
            return Err(OrdinaError::EigenFailure(format!(
                "Jacobi did not converge after {MAX_SWEEPS} sweeps (off-diagonal norm {off:.3e})"
            )));
        }
        for p in 0..n {
            for q in (p + 1)..n {
                rotate(&mut a, &mut v, n, p, q);
            }
        }
        sweeps += 1;
    }
    tracing::trace!(n, sweeps, "jacobi converged");

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[j * n + j].total_cmp(&a[i * n + i]));

    let values = order.iter().map(|&k| a[k * n + k] * max_abs).collect();
    let vectors = order
        .iter()
        .map(|&k| {
            let mut col: Vec<f64> = (0..n).map(|i| v[i * n + k]).collect();
            fix_sign(&mut col);
            col
        })
        .collect();

    Ok(SymmetricEigen {
        values,
        vectors,
        sweeps,
    })
}

/// Flip `v` so that its largest-magnitude entry is positive.
pub(crate) fn fix_sign(v: &mut [f64]) {
    let mut pivot = 0.0_f64;
    for &x in v.iter() {
        if x.abs() > pivot.abs() {
            pivot = x;
        }
    }
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

/// Apply the rotation that zeroes `a[p][q]`, accumulating it into `v`.
fn rotate(a: &mut [f64], v: &mut [f64], n: usize, p: usize, q: usize) {
    let apq = a[p * n + q];
    if apq == 0.0 {
        return;
    }
    let app = a[p * n + p];
    let aqq = a[q * n + q];

    // Smaller root of t² + 2θt - 1 = 0 keeps the rotation angle ≤ π/4.
    let theta = (aqq - app) / (2.0 * apq);
    let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    for k in 0..n {
        let akp = a[k * n + p];
        let akq = a[k * n + q];
        a[k * n + p] = c * akp - s * akq;
        a[k * n + q] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a[p * n + k];
        let aqk = a[q * n + k];
        a[p * n + k] = c * apk - s * aqk;
        a[q * n + k] = s * apk + c * aqk;
    }
    a[p * n + q] = 0.0;
    a[q * n + p] = 0.0;

    for k in 0..n {
        let vkp = v[k * n + p];
        let vkq = v[k * n + q];
        v[k * n + p] = c * vkp - s * vkq;
        v[k * n + q] = s * vkp + c * vkq;
    }
}

fn frobenius(a: &[f64]) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn off_diagonal_norm(a: &[f64], n: usize) -> f64 {
    let mut sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            sum += 2.0 * a[i * n + j] * a[i * n + j];
        }
    }
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_vec(m: &[f64], v: &[f64], n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (0..n).map(|j| m[i * n + j] * v[j]).sum())
            .collect()
    }

    #[test]
    fn known_2x2() {
        let m = [3.0, 1.0, 1.0, 3.0];
        let eig = symmetric_eigen(&m, 2).unwrap();
        assert!((eig.values[0] - 4.0).abs() < 1e-12);
        assert!((eig.values[1] - 2.0).abs() < 1e-12);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert!((eig.vectors[0][0] - s).abs() < 1e-12);
        assert!((eig.vectors[0][1] - s).abs() < 1e-12);
    }

    #[test]
    fn eigenpairs_satisfy_definition() {
        #[rustfmt::skip]
        let m = [
            5.0, 2.0, 1.0, 0.5,
            2.0, 3.0, 0.5, 0.0,
            1.0, 0.5, 1.0, 0.2,
            0.5, 0.0, 0.2, 4.0,
        ];
        let eig = symmetric_eigen(&m, 4).unwrap();
        for (lambda, v) in eig.iter() {
            let av = mat_vec(&m, v, 4);
            for (x, y) in av.iter().zip(v) {
                assert!((x - lambda * y).abs() < 1e-9, "λ={lambda}");
            }
            let norm: f64 = v.iter().map(|x| x * x).sum();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        let trace = 5.0 + 3.0 + 1.0 + 4.0;
        let sum: f64 = eig.values.iter().sum();
        assert!((sum - trace).abs() < 1e-10);
    }

    #[test]
    fn sorted_descending_with_negatives() {
        let m = [0.0, 2.0, 2.0, 0.0];
        let eig = symmetric_eigen(&m, 2).unwrap();
        assert!((eig.values[0] - 2.0).abs() < 1e-12);
        assert!((eig.values[1] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn eigenvectors_orthogonal_for_repeated_values() {
        let m = [2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0];
        let eig = symmetric_eigen(&m, 3).unwrap();
        let d: f64 = eig.vectors[0]
            .iter()
            .zip(&eig.vectors[1])
            .map(|(a, b)| a * b)
            .sum();
        assert!(d.abs() < 1e-12);
    }

    #[test]
    fn sign_convention_largest_entry_positive() {
        let m = [1.0, -2.0, -2.0, 4.0];
        let eig = symmetric_eigen(&m, 2).unwrap();
        for v in &eig.vectors {
            let pivot = v.iter().copied().fold(0.0_f64, |p, x| if x.abs() > p.abs() { x } else { p });
            assert!(pivot > 0.0, "{v:?}");
        }
    }

    #[test]
    fn tiny_and_huge_entries_keep_relative_accuracy() {
        for scale in [1e-170, 1e200] {
            let m = [scale, 0.5 * scale, 0.5 * scale, scale];
            let eig = symmetric_eigen(&m, 2).unwrap();
            assert!((eig.values[0] / (1.5 * scale) - 1.0).abs() < 1e-12, "{:?}", eig.values);
            assert!((eig.values[1] / (0.5 * scale) - 1.0).abs() < 1e-12, "{:?}", eig.values);
            let s = std::f64::consts::FRAC_1_SQRT_2;
            assert!((eig.vectors[0][0] - s).abs() < 1e-12);
            assert!((eig.vectors[0][1] - s).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_matrix_needs_no_sweeps() {
        let eig = symmetric_eigen(&[0.0; 9], 3).unwrap();
        assert_eq!(eig.sweeps, 0);
        assert!(eig.values.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn non_finite_is_eigen_failure() {
        let err = symmetric_eigen(&[1.0, f64::NAN, f64::NAN, 1.0], 2).unwrap_err();
        assert!(matches!(err, OrdinaError::EigenFailure(_)));
    }

    #[test]
    fn wrong_size_is_shape_mismatch() {
        let err = symmetric_eigen(&[1.0, 2.0, 3.0], 2).unwrap_err();
        assert!(matches!(err, OrdinaError::ShapeMismatch(_)));
    }

    #[test]
    fn fix_sign_flips_negative_pivot() {
        let mut v = [0.1, -0.9, 0.3];
        fix_sign(&mut v);
        assert_eq!(v, [-0.1, 0.9, -0.3]);
    }
}
