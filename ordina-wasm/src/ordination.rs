//! Distance and ordination wrappers with JSON input/output.
//!
//! Samples and distance matrices are passed as JSON arrays of rows
//! (`[[1.0, 2.0], [3.0, 4.0]]`), or as flat row-major `Float64Array`s for
//! the `_flat` variants. Method and metric names are the lowercase strings
//! accepted by [`Method`] and [`Metric`]. An empty `config_json` means the
//! default configuration; any field left out of a JSON config keeps its
//! default.

use serde::Serialize;

use ordina_stats::{DistanceMatrix, Method, Metric, NmdsConfig, OrdinationConfig};

use crate::error::{parse_json, wasm_err, wasm_result};

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

// ── Wrapper types ────────────────────────────────────────────────────────

/// Serializable distance matrix as nested rows.
#[derive(Debug, Serialize)]
pub struct JsDistanceMatrix {
    pub n: usize,
    pub metric: String,
    pub rows: Vec<Vec<f64>>,
}

impl JsDistanceMatrix {
    fn new(dm: &DistanceMatrix, metric: Metric) -> Self {
        Self {
            n: dm.n(),
            metric: metric.name().to_string(),
            rows: dm.to_rows(),
        }
    }
}

// ── Argument parsing ─────────────────────────────────────────────────────

fn parse_config<T: Default + serde::de::DeserializeOwned>(json: &str) -> Result<T, String> {
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    parse_json(json, "config")
}

fn parse_rows(json: &str, what: &str) -> Result<Vec<Vec<f64>>, String> {
    parse_json(json, what)
}

fn parse_names(method: &str, metric: &str) -> Result<(Method, Metric), String> {
    let method = method.parse::<Method>().map_err(|e| e.to_string())?;
    let metric = metric.parse::<Metric>().map_err(|e| e.to_string())?;
    Ok((method, metric))
}

fn distances_from_json(json: &str) -> Result<DistanceMatrix, String> {
    let rows = parse_rows(json, "distance matrix")?;
    DistanceMatrix::from_rows(&rows).map_err(|e| e.to_string())
}

// ── JSON boundary functions ──────────────────────────────────────────────

/// Pairwise distance matrix of a JSON array of sample rows.
///
/// Returns JSON `JsDistanceMatrix`.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn compute_distance_matrix(samples_json: &str, metric: &str) -> String {
    let samples = match parse_rows(samples_json, "samples") {
        Ok(s) => s,
        Err(e) => return wasm_err(e),
    };
    let metric = match metric.parse::<Metric>() {
        Ok(m) => m,
        Err(e) => return wasm_err(e),
    };
    wasm_result(
        ordina_stats::compute_distance_matrix(&samples, metric)
            .map(|dm| JsDistanceMatrix::new(&dm, metric)),
    )
}

/// Pairwise distance matrix of a flat row-major `n × n_features` buffer.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn compute_distance_matrix_flat(values: &[f64], n_features: usize, metric: &str) -> String {
    if n_features == 0 || values.len() % n_features != 0 {
        return wasm_err(format!(
            "{} values do not divide into rows of {}",
            values.len(),
            n_features
        ));
    }
    let samples: Vec<Vec<f64>> = values.chunks(n_features).map(|r| r.to_vec()).collect();
    let metric = match metric.parse::<Metric>() {
        Ok(m) => m,
        Err(e) => return wasm_err(e),
    };
    wasm_result(
        ordina_stats::compute_distance_matrix(&samples, metric)
            .map(|dm| JsDistanceMatrix::new(&dm, metric)),
    )
}

/// PCA of a JSON array of sample rows.
///
/// Returns JSON `OrdinationResult`.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn pca(samples_json: &str, n_components: usize) -> String {
    match parse_rows(samples_json, "samples") {
        Ok(samples) => wasm_result(ordina_stats::run_pca(&samples, n_components)),
        Err(e) => wasm_err(e),
    }
}

/// PCoA of a JSON distance matrix (array of rows).
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn pcoa(distances_json: &str, n_components: usize) -> String {
    match distances_from_json(distances_json) {
        Ok(dm) => wasm_result(ordina_stats::run_pcoa(&dm, n_components)),
        Err(e) => wasm_err(e),
    }
}

/// NMDS of a JSON distance matrix (array of rows).
///
/// `config_json` is an `NmdsConfig` object such as
/// `{"seed": 42, "restarts": 8}`, or empty for the defaults.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn nmds(distances_json: &str, n_components: usize, config_json: &str) -> String {
    let dm = match distances_from_json(distances_json) {
        Ok(dm) => dm,
        Err(e) => return wasm_err(e),
    };
    let config: NmdsConfig = match parse_config(config_json) {
        Ok(c) => c,
        Err(e) => return wasm_err(e),
    };
    wasm_result(ordina_stats::run_nmds(&dm, n_components, &config))
}

/// Full pipeline on a JSON array of sample rows.
///
/// `config_json` is an `OrdinationConfig` object such as
/// `{"n_components": 3, "nmds": {"seed": 1}}`, or empty for the defaults.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn calculate_ordination(
    samples_json: &str,
    method: &str,
    metric: &str,
    config_json: &str,
) -> String {
    let samples = match parse_rows(samples_json, "samples") {
        Ok(s) => s,
        Err(e) => return wasm_err(e),
    };
    match prepare(method, metric, config_json) {
        Ok((method, metric, config)) => wasm_result(ordina_stats::calculate_ordination(
            &samples, method, metric, &config,
        )),
        Err(e) => wasm_err(e),
    }
}

/// Full pipeline on a flat row-major `n × n_features` buffer.
#[cfg_attr(feature = "wasm", wasm_bindgen)]
pub fn calculate_ordination_flat(
    values: &[f64],
    n_features: usize,
    method: &str,
    metric: &str,
    config_json: &str,
) -> String {
    match prepare(method, metric, config_json) {
        Ok((method, metric, config)) => wasm_result(ordina_stats::calculate_ordination_flat(
            values, n_features, method, metric, &config,
        )),
        Err(e) => wasm_err(e),
    }
}

fn prepare(
    method: &str,
    metric: &str,
    config_json: &str,
) -> Result<(Method, Metric, OrdinationConfig), String> {
    let (method, metric) = parse_names(method, metric)?;
    let config = parse_config(config_json)?;
    Ok((method, metric, config))
}
