//! Structured error types for the ordina crates.

use thiserror::Error;

/// Unified error type for all ordination operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrdinaError {
    /// Rows of unequal length, or a distance matrix that is not square.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Fewer samples than the operation needs (at least 2).
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// The symmetric eigensolver did not converge.
    #[error("eigendecomposition failed: {0}")]
    EigenFailure(String),

    /// An iterative optimizer stopped at its iteration cap without reaching
    /// its tolerance.
    ///
    /// NMDS never returns this as an `Err`; it is attached to the result as
    /// a diagnostic so callers can still inspect the final stress.
    #[error("did not converge after {iterations} iterations (stress {stress:.6})")]
    ConvergenceFailure { iterations: usize, stress: f64 },

    /// Unrecognized ordination method or distance metric name.
    #[error("invalid method or metric: {0}")]
    InvalidMethodOrMetric(String),

    /// Invalid parameters (zero components, zero restarts, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the ordina crates.
pub type Result<T> = std::result::Result<T, OrdinaError>;
