//! Ordination engine for samples × features matrices.
//!
//! - **Distances**: Euclidean, Jaccard and Bray-Curtis metrics and the
//!   pairwise [`DistanceMatrix`] builder
//! - **Eigendecomposition**: cyclic Jacobi solver for symmetric matrices
//! - **PCA**: projection of the centered data onto covariance eigenvectors
//! - **PCoA**: classical scaling of a distance matrix (Gower's method)
//! - **NMDS**: SMACOF stress minimization, non-metric or metric, with restarts
//! - **Dispatch**: [`calculate_ordination`] picks the method and metric
//!
//! Everything here is a pure function of its inputs. NMDS is the only
//! randomized method and is reproducible when given a seed.
//!
//! # Example
//!
//! ```
//! use ordina_stats::{calculate_ordination, Method, Metric, OrdinationConfig};
//!
//! let samples = vec![
//!     vec![0.0, 0.0],
//!     vec![1.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 1.0],
//! ];
//! let result = calculate_ordination(
//!     &samples,
//!     Method::Pcoa,
//!     Metric::Euclidean,
//!     &OrdinationConfig::default(),
//! )
//! .unwrap();
//! assert_eq!(result.coordinates.len(), 4);
//! assert_eq!(result.coordinates[0].len(), 2);
//! ```

pub mod distance;
pub mod eigen;
pub mod nmds;
pub mod ordination;
pub mod pca;
pub mod pcoa;

#[cfg(feature = "blas")]
mod blas_pca;

pub use distance::{build_matrix, compute_distance_matrix, distance, DistanceMatrix, Metric};
pub use eigen::{symmetric_eigen, SymmetricEigen};
pub use nmds::{nmds_runs, run_nmds, NmdsConfig, NmdsRun};
pub use ordination::{
    calculate_ordination, calculate_ordination_flat, calculate_ordination_named, Diagnostics,
    Method, OrdinationConfig, OrdinationResult,
};
pub use pca::run_pca;
pub use pcoa::run_pcoa;
