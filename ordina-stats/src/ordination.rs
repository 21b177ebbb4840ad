//! Ordination entry points and result types.
//!
//! - **PCA** works on the centered feature matrix; the metric is ignored
//! - **PCoA** embeds a distance matrix by classical scaling
//! - **NMDS** embeds a distance matrix by stress minimization (SMACOF)

use std::fmt;
use std::str::FromStr;

use ordina_core::{OrdinaError, Result, Summarizable};

use crate::distance::{build_matrix, Metric};
use crate::nmds::{run_nmds, NmdsConfig};
use crate::pca::run_pca;
use crate::pcoa::run_pcoa;

/// Ordination method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Method {
    Pca,
    Pcoa,
    Nmds,
}

impl Method {
    /// Canonical lowercase name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Method::Pca => "pca",
            Method::Pcoa => "pcoa",
            Method::Nmds => "nmds",
        }
    }

    /// Conventional display label, e.g. `PCoA`.
    pub fn label(self) -> &'static str {
        match self {
            Method::Pca => "PCA",
            Method::Pcoa => "PCoA",
            Method::Nmds => "NMDS",
        }
    }

    /// Whether the method consumes a distance matrix.
    pub fn uses_distances(self) -> bool {
        !matches!(self, Method::Pca)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = OrdinaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pca" => Ok(Method::Pca),
            "pcoa" => Ok(Method::Pcoa),
            "nmds" => Ok(Method::Nmds),
            _ => Err(OrdinaError::InvalidMethodOrMetric(format!(
                "unknown method: {s} (expected pca, pcoa, or nmds)"
            ))),
        }
    }
}

/// Settings shared by all methods.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct OrdinationConfig {
    /// Number of output axes.
    pub n_components: usize,
    /// Only read when the method is NMDS.
    pub nmds: NmdsConfig,
}

impl Default for OrdinationConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            nmds: NmdsConfig::default(),
        }
    }
}

/// Method-specific diagnostics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "lowercase")
)]
pub enum Diagnostics {
    /// PCA and PCoA.
    Spectral {
        /// Eigenvalue of each returned axis. PCoA keeps the sign.
        eigenvalues: Vec<f64>,
        /// Fraction of the total (positive) variance on each axis.
        proportion_explained: Vec<f64>,
        /// Negative eigenvalues of the full decomposition. Always 0 for PCA.
        n_negative_eigenvalues: usize,
    },
    /// NMDS.
    Stress {
        /// Kruskal stress-1 of the kept run.
        stress: f64,
        /// Guttman updates in the kept run.
        iterations: usize,
        /// Whether any restart met the stopping rule.
        converged: bool,
        /// Number of runs made.
        restarts: usize,
        /// Index of the kept run.
        best_restart: usize,
    },
}

/// Output of an ordination.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrdinationResult {
    pub method: Method,
    /// Sample coordinates. Shape: `n_samples × n_components`.
    pub coordinates: Vec<Vec<f64>>,
    pub diagnostics: Diagnostics,
}

impl OrdinationResult {
    pub fn n_samples(&self) -> usize {
        self.coordinates.len()
    }

    pub fn n_components(&self) -> usize {
        self.coordinates.first().map_or(0, |r| r.len())
    }

    /// Per-axis eigenvalues for PCA and PCoA.
    pub fn eigenvalues(&self) -> Option<&[f64]> {
        match &self.diagnostics {
            Diagnostics::Spectral { eigenvalues, .. } => Some(eigenvalues),
            Diagnostics::Stress { .. } => None,
        }
    }

    /// Per-axis proportion of variance for PCA and PCoA.
    pub fn proportion_explained(&self) -> Option<&[f64]> {
        match &self.diagnostics {
            Diagnostics::Spectral {
                proportion_explained,
                ..
            } => Some(proportion_explained),
            Diagnostics::Stress { .. } => None,
        }
    }

    /// Final stress for NMDS.
    pub fn stress(&self) -> Option<f64> {
        match self.diagnostics {
            Diagnostics::Stress { stress, .. } => Some(stress),
            Diagnostics::Spectral { .. } => None,
        }
    }

    /// Iteration count for NMDS.
    pub fn iterations(&self) -> Option<usize> {
        match self.diagnostics {
            Diagnostics::Stress { iterations, .. } => Some(iterations),
            Diagnostics::Spectral { .. } => None,
        }
    }

    /// False only for an NMDS result where no restart converged.
    pub fn converged(&self) -> bool {
        match self.diagnostics {
            Diagnostics::Stress { converged, .. } => converged,
            Diagnostics::Spectral { .. } => true,
        }
    }

    /// The non-convergence of an NMDS result, as an error value.
    ///
    /// The coordinates are still usable; this lets callers that treat
    /// non-convergence as fatal turn it into an `Err` themselves.
    pub fn convergence_failure(&self) -> Option<OrdinaError> {
        match self.diagnostics {
            Diagnostics::Stress {
                stress,
                iterations,
                converged: false,
                ..
            } => Some(OrdinaError::ConvergenceFailure { iterations, stress }),
            _ => None,
        }
    }
}

impl Summarizable for OrdinationResult {
    fn summary(&self) -> String {
        let head = format!(
            "{}: {} samples x {} axes",
            self.method.label(),
            self.n_samples(),
            self.n_components()
        );
        match &self.diagnostics {
            Diagnostics::Spectral {
                proportion_explained,
                ..
            } => {
                let total: f64 = proportion_explained.iter().sum();
                format!("{head}, {:.1}% explained", total * 100.0)
            }
            Diagnostics::Stress {
                stress, converged, ..
            } => {
                let state = if *converged { "converged" } else { "not converged" };
                format!("{head}, stress {stress:.4} ({state})")
            }
        }
    }
}

/// Run `method` on `samples` (`n × p`).
///
/// PCA works on the samples directly and ignores `metric`. PCoA and NMDS
/// first build the distance matrix under `metric`.
///
/// # Errors
///
/// Errors from the distance computation or the method propagate unchanged.
pub fn calculate_ordination(
    samples: &[Vec<f64>],
    method: Method,
    metric: Metric,
    config: &OrdinationConfig,
) -> Result<OrdinationResult> {
    let k = config.n_components;
    tracing::debug!(%method, %metric, n_samples = samples.len(), n_components = k, "ordination");
    match method {
        Method::Pca => run_pca(samples, k),
        Method::Pcoa => run_pcoa(&build_matrix(samples, metric)?, k),
        Method::Nmds => run_nmds(&build_matrix(samples, metric)?, k, &config.nmds),
    }
}

/// [`calculate_ordination`] on a flat row-major buffer of `n × n_features`
/// values.
///
/// # Errors
///
/// [`OrdinaError::EmptyInput`] if `n_features` is 0 and
/// [`OrdinaError::ShapeMismatch`] if the buffer length is not a multiple of
/// `n_features`, plus everything [`calculate_ordination`] returns.
pub fn calculate_ordination_flat(
    values: &[f64],
    n_features: usize,
    method: Method,
    metric: Metric,
    config: &OrdinationConfig,
) -> Result<OrdinationResult> {
    if n_features == 0 {
        return Err(OrdinaError::EmptyInput("n_features must be > 0".into()));
    }
    if values.len() % n_features != 0 {
        return Err(OrdinaError::ShapeMismatch(format!(
            "{} values do not divide into rows of {}",
            values.len(),
            n_features
        )));
    }
    let samples: Vec<Vec<f64>> = values.chunks(n_features).map(|r| r.to_vec()).collect();
    calculate_ordination(&samples, method, metric, config)
}

/// [`calculate_ordination`] with the method and metric given by name.
///
/// # Errors
///
/// [`OrdinaError::InvalidMethodOrMetric`] for an unknown name, plus
/// everything [`calculate_ordination`] returns.
pub fn calculate_ordination_named(
    samples: &[Vec<f64>],
    method: &str,
    metric: &str,
    config: &OrdinationConfig,
) -> Result<OrdinationResult> {
    let method: Method = method.parse()?;
    let metric: Metric = metric.parse()?;
    calculate_ordination(samples, method, metric, config)
}

pub(crate) fn check_components(n_components: usize) -> Result<()> {
    if n_components == 0 {
        return Err(OrdinaError::InvalidInput(
            "n_components must be at least 1".into(),
        ));
    }
    Ok(())
}
