//! Shared primitives for the ordina ordination engine.
//!
//! `ordina-core` provides the foundation the other ordina crates build on:
//!
//! - **Error types**: [`OrdinaError`] and [`Result`] for structured error handling
//! - **Traits**: [`Summarizable`] for one-line descriptions of results

pub mod error;
pub mod traits;

pub use error::{OrdinaError, Result};
pub use traits::*;
