//! Distance metrics and pairwise distance matrices.
//!
//! The abundance metrics follow the usual ecological conventions: Jaccard
//! works on presence/absence (any non-zero value counts as present) and
//! Bray-Curtis on raw abundances. Both are defined as 1 (maximal
//! dissimilarity) when the two samples are entirely empty, rather than
//! failing or producing NaN.
//!
//! NaN in either input vector always yields a NaN distance, so missing
//! values surface in the ordination instead of being silently absorbed.

use std::fmt;
use std::str::FromStr;

use ordina_core::{OrdinaError, Result, Summarizable};

/// Supported distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Metric {
    #[default]
    Euclidean,
    Jaccard,
    #[cfg_attr(feature = "serde", serde(rename = "bray", alias = "braycurtis"))]
    BrayCurtis,
}

impl Metric {
    /// Canonical lowercase name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Jaccard => "jaccard",
            Metric::BrayCurtis => "bray",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = OrdinaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Metric::Euclidean),
            "jaccard" => Ok(Metric::Jaccard),
            "bray" | "braycurtis" | "bray-curtis" | "bray_curtis" => Ok(Metric::BrayCurtis),
            _ => Err(OrdinaError::InvalidMethodOrMetric(format!(
                "unknown metric: {s} (expected euclidean, jaccard, or bray)"
            ))),
        }
    }
}

/// Euclidean (L2) distance between two vectors.
pub fn euclidean(a: &[f64], b: &[f64]) -> Result<f64> {
    validate_pair(a, b)?;
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    Ok(sum.sqrt())
}

/// Jaccard dissimilarity on presence/absence.
///
/// `J = 1 - |A∩B| / |A∪B|` where a feature is present when its value is
/// non-zero. Two all-zero samples are at distance 1.
pub fn jaccard(a: &[f64], b: &[f64]) -> Result<f64> {
    validate_pair(a, b)?;
    let mut intersection = 0usize;
    let mut union = 0usize;
    for (&x, &y) in a.iter().zip(b) {
        if x.is_nan() || y.is_nan() {
            return Ok(f64::NAN);
        }
        let pa = x != 0.0;
        let pb = y != 0.0;
        if pa || pb {
            union += 1;
        }
        if pa && pb {
            intersection += 1;
        }
    }
    if union == 0 {
        return Ok(1.0);
    }
    Ok(1.0 - intersection as f64 / union as f64)
}

/// Bray-Curtis dissimilarity.
///
/// `BC = 1 - 2 * Σ min(a_i, b_i) / Σ (a_i + b_i)`. Two samples whose
/// combined total is zero are at distance 1.
pub fn bray_curtis(a: &[f64], b: &[f64]) -> Result<f64> {
    validate_pair(a, b)?;
    let mut sum_min = 0.0;
    let mut sum_total = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        // f64::min drops NaN, so check explicitly
        if x.is_nan() || y.is_nan() {
            return Ok(f64::NAN);
        }
        sum_min += x.min(y);
        sum_total += x + y;
    }
    if sum_total == 0.0 {
        return Ok(1.0);
    }
    Ok(1.0 - 2.0 * sum_min / sum_total)
}

/// Compute the distance between two vectors using the given metric.
///
/// # Errors
///
/// Returns [`OrdinaError::ShapeMismatch`] if the vectors differ in length.
pub fn distance(a: &[f64], b: &[f64], metric: Metric) -> Result<f64> {
    match metric {
        Metric::Euclidean => euclidean(a, b),
        Metric::Jaccard => jaccard(a, b),
        Metric::BrayCurtis => bray_curtis(a, b),
    }
}

/// Dense symmetric `n × n` distance matrix, stored row-major.
///
/// Matrices built from samples are symmetric with a zero diagonal by
/// construction. Matrices supplied by the caller, including deserialized
/// ones, are only checked for shape.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawDistanceMatrix")
)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    n: usize,
}

/// Unchecked wire form; every deserialized matrix goes through
/// [`DistanceMatrix::from_flat`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawDistanceMatrix {
    data: Vec<f64>,
    n: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawDistanceMatrix> for DistanceMatrix {
    type Error = OrdinaError;

    fn try_from(raw: RawDistanceMatrix) -> Result<Self> {
        DistanceMatrix::from_flat(raw.data, raw.n)
    }
}

impl DistanceMatrix {
    /// Build a distance matrix from sample rows.
    ///
    /// Only the upper triangle is computed; it is mirrored into the lower
    /// triangle and the diagonal is left at zero.
    ///
    /// # Errors
    ///
    /// Returns [`OrdinaError::EmptyInput`] for fewer than 2 samples or no
    /// features, and [`OrdinaError::ShapeMismatch`] for ragged rows.
    pub fn from_samples(samples: &[Vec<f64>], metric: Metric) -> Result<Self> {
        validate_samples(samples)?;
        let n = samples.len();

        #[cfg(feature = "parallel")]
        let upper: Vec<Vec<f64>> = {
            use rayon::prelude::*;
            (0..n)
                .into_par_iter()
                .map(|i| {
                    ((i + 1)..n)
                        .map(|j| distance(&samples[i], &samples[j], metric))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let upper: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| distance(&samples[i], &samples[j], metric))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let mut data = vec![0.0; n * n];
        for (i, row) in upper.iter().enumerate() {
            for (offset, &d) in row.iter().enumerate() {
                let j = i + 1 + offset;
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        tracing::trace!(n, %metric, "built distance matrix");
        Ok(Self { data, n })
    }

    /// Wrap a pre-computed square matrix given as rows.
    ///
    /// # Errors
    ///
    /// Returns [`OrdinaError::EmptyInput`] for fewer than 2 rows and
    /// [`OrdinaError::ShapeMismatch`] if any row length differs from the
    /// number of rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(OrdinaError::EmptyInput(format!(
                "distance matrix needs at least 2 samples, got {n}"
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(OrdinaError::ShapeMismatch(format!(
                    "distance matrix must be square: row {} has length {}, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Ok(Self { data, n })
    }

    /// Wrap a pre-computed flat row-major `n × n` matrix.
    pub fn from_flat(data: Vec<f64>, n: usize) -> Result<Self> {
        if n < 2 {
            return Err(OrdinaError::EmptyInput(format!(
                "distance matrix needs at least 2 samples, got {n}"
            )));
        }
        if data.len() != n * n {
            return Err(OrdinaError::ShapeMismatch(format!(
                "flat distance matrix has {} entries, expected {}x{} = {}",
                data.len(),
                n,
                n,
                n * n
            )));
        }
        Ok(Self { data, n })
    }

    /// Distance between samples `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// Number of samples.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Row `i` of the matrix.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Raw row-major storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy out as a vector of rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.n).map(|r| r.to_vec()).collect()
    }

    /// Upper-triangle entries `(i, j, d)` with `i < j`, row by row.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.n;
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j, self.get(i, j))))
    }

    /// Whether the matrix is symmetric within `tol` with a zero diagonal.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..self.n).all(|i| {
            self.get(i, i).abs() <= tol
                && ((i + 1)..self.n).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tol)
        })
    }
}

impl Summarizable for DistanceMatrix {
    fn summary(&self) -> String {
        format!("DistanceMatrix: {}x{}", self.n, self.n)
    }
}

/// Build the pairwise distance matrix of `samples` under `metric`.
///
/// Convenience alias for [`DistanceMatrix::from_samples`].
pub fn build_matrix(samples: &[Vec<f64>], metric: Metric) -> Result<DistanceMatrix> {
    DistanceMatrix::from_samples(samples, metric)
}

/// Convenience alias for [`build_matrix`].
pub fn compute_distance_matrix(samples: &[Vec<f64>], metric: Metric) -> Result<DistanceMatrix> {
    build_matrix(samples, metric)
}

/// Check that `samples` is a valid `n × p` matrix and return `p`.
pub(crate) fn validate_samples(samples: &[Vec<f64>]) -> Result<usize> {
    let n = samples.len();
    if n < 2 {
        return Err(OrdinaError::EmptyInput(format!(
            "need at least 2 samples, got {n}"
        )));
    }
    let p = samples[0].len();
    if p == 0 {
        return Err(OrdinaError::EmptyInput("samples have no features".into()));
    }
    for (i, row) in samples.iter().enumerate() {
        if row.len() != p {
            return Err(OrdinaError::ShapeMismatch(format!(
                "sample {} has length {}, expected {}",
                i,
                row.len(),
                p
            )));
        }
    }
    Ok(p)
}

fn validate_pair(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(OrdinaError::ShapeMismatch(format!(
            "length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}
