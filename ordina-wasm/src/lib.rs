//! WASM bindings for the ordina ordination engine.
//!
//! This crate provides in-memory, JSON-based wrappers around `ordina-stats`,
//! designed for environments where file I/O is unavailable (browsers,
//! sandboxed workers). Every public function accepts simple types (`&str`,
//! `&[f64]`, `usize`) and returns a JSON `String`:
//!
//! - Success: `{"ok": <value>}`
//! - Failure: `{"error": "<message>"}`
//!
//! `#[wasm_bindgen]` annotations are only applied with the `wasm` feature,
//! so the same functions can be tested natively.
//!
//! # Modules
//!
//! - [`ordination`]: Distance matrices, PCA, PCoA, NMDS and the full pipeline
//!
//! # Example
//!
//! ```
//! let json = ordina_wasm::calculate_ordination("[[0,0],[1,0],[0,1],[1,1]]", "pcoa", "euclidean", "");
//! let v: serde_json::Value = serde_json::from_str(&json).unwrap();
//! assert_eq!(v["ok"]["coordinates"].as_array().unwrap().len(), 4);
//! ```

pub mod error;
pub mod ordination;

/// Crate version (set from Cargo.toml at compile time).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Re-exports ───────────────────────────────────────────────────────────

pub use error::{wasm_err, wasm_ok, wasm_result};
pub use ordination::{
    calculate_ordination, calculate_ordination_flat, compute_distance_matrix,
    compute_distance_matrix_flat, nmds, pca, pcoa, JsDistanceMatrix,
};
