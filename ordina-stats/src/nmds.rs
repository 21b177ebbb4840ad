//! Non-metric and metric multidimensional scaling by SMACOF.
//!
//! Each run starts from a random configuration (or the PCoA solution when
//! warm-starting) and repeats two steps until the relative stress
//! improvement drops below the tolerance:
//!
//! 1. Fit disparities. Non-metric mode fits a monotone (isotonic) function
//!    of the input dissimilarities to the current embedded distances;
//!    metric mode uses the dissimilarities themselves.
//! 2. Apply the Guttman transform, which never increases raw stress for
//!    fixed disparities.
//!
//! Several independent runs are made and the one with the lowest Kruskal
//! stress-1 is kept, since the stress surface is non-convex.
//!
//! A run that hits `max_iter` is not an error: the result is returned with
//! `converged = false` and callers can inspect the stress.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ordina_core::{OrdinaError, Result};

use crate::distance::DistanceMatrix;
use crate::ordination::{check_components, Diagnostics, Method, OrdinationResult};
use crate::pcoa::run_pcoa;

/// Stress at or below this counts as a perfect fit.
const STRESS_FLOOR: f64 = f64::EPSILON;

/// Configuration for NMDS.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct NmdsConfig {
    /// Maximum Guttman updates per run.
    pub max_iter: usize,
    /// Stop when `(previous - current) / previous` stress falls below this.
    pub tol: f64,
    /// Number of independent runs; the lowest-stress run is kept.
    pub restarts: usize,
    /// Seed for the random initial configurations. Run `r` uses
    /// `seed + r`. Without a seed one is drawn from the thread RNG.
    pub seed: Option<u64>,
    /// Fit a rank-preserving transform of the dissimilarities (true) or the
    /// dissimilarities themselves (false).
    pub nonmetric: bool,
    /// Start the first run from the PCoA configuration instead of a random
    /// one.
    pub warm_start: bool,
}

impl Default for NmdsConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            tol: 1e-6,
            restarts: 4,
            seed: None,
            nonmetric: true,
            warm_start: false,
        }
    }
}

impl NmdsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(OrdinaError::InvalidInput("nmds: max_iter must be > 0".into()));
        }
        if self.restarts == 0 {
            return Err(OrdinaError::InvalidInput("nmds: restarts must be > 0".into()));
        }
        if !(self.tol >= 0.0) {
            return Err(OrdinaError::InvalidInput(format!(
                "nmds: tol must be a non-negative number, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Outcome of a single SMACOF run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NmdsRun {
    /// Sample coordinates, centered at the origin. Shape: `n_samples × n_dims`.
    pub coordinates: Vec<Vec<f64>>,
    /// Final Kruskal stress-1.
    pub stress: f64,
    /// Number of Guttman updates performed.
    pub iterations: usize,
    /// Whether the stopping rule was met before `max_iter`.
    pub converged: bool,
    /// Stress of every evaluated configuration, starting with the initial one.
    pub stress_history: Vec<f64>,
    /// Seed of the random initial configuration.
    pub seed: u64,
    /// Whether the run started from the PCoA configuration.
    pub warm_started: bool,
}

/// Run NMDS and keep the lowest-stress restart.
///
/// `converged` in the diagnostics is true when at least one restart met
/// the stopping rule. When none did, the best run is still returned and
/// [`OrdinationResult::convergence_failure`] describes the failure.
///
/// # Errors
///
/// Returns an error if `n_components` is 0 or the config is invalid
/// (`max_iter` or `restarts` of 0, negative or NaN `tol`), or if the PCoA
/// warm start fails.
pub fn run_nmds(
    distances: &DistanceMatrix,
    n_components: usize,
    config: &NmdsConfig,
) -> Result<OrdinationResult> {
    let runs = nmds_runs(distances, n_components, config)?;
    let restarts = runs.len();
    let any_converged = runs.iter().any(|r| r.converged);

    let (best_restart, best) = runs
        .into_iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.stress.total_cmp(&b.stress))
        .ok_or_else(|| OrdinaError::InvalidInput("nmds: restarts must be > 0".into()))?;

    if !any_converged {
        tracing::warn!(
            restarts,
            max_iter = config.max_iter,
            stress = best.stress,
            "nmds: no restart converged, returning best-effort configuration"
        );
    }

    Ok(OrdinationResult {
        method: Method::Nmds,
        coordinates: best.coordinates,
        diagnostics: Diagnostics::Stress {
            stress: best.stress,
            iterations: best.iterations,
            converged: any_converged,
            restarts,
            best_restart,
        },
    })
}

/// Run every NMDS restart and return them in restart order.
///
/// Useful for inspecting the spread of local minima; [`run_nmds`] picks the
/// lowest-stress entry of this list. An all-zero distance matrix
/// short-circuits to a single run with every sample at the origin.
///
/// # Errors
///
/// Same as [`run_nmds`].
pub fn nmds_runs(
    distances: &DistanceMatrix,
    n_components: usize,
    config: &NmdsConfig,
) -> Result<Vec<NmdsRun>> {
    check_components(n_components)?;
    config.validate()?;

    let n = distances.n();
    let base_seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let problem = Problem::new(distances);

    if problem.is_degenerate() {
        tracing::debug!(n_samples = n, "nmds: all dissimilarities are zero");
        return Ok(vec![NmdsRun {
            coordinates: vec![vec![0.0; n_components]; n],
            stress: 0.0,
            iterations: 0,
            converged: true,
            stress_history: vec![0.0],
            seed: base_seed,
            warm_started: false,
        }]);
    }

    let warm = if config.warm_start {
        Some(run_pcoa(distances, n_components)?.coordinates)
    } else {
        None
    };

    let run_one = |restart: usize| -> NmdsRun {
        let seed = base_seed.wrapping_add(restart as u64);
        let (init, warm_started) = match (&warm, restart) {
            (Some(coords), 0) => (coords.clone(), true),
            _ => (random_configuration(n, n_components, seed), false),
        };
        let run = smacof(&problem, init, config, seed, warm_started);
        tracing::debug!(
            restart,
            seed,
            stress = run.stress,
            iterations = run.iterations,
            converged = run.converged,
            "nmds restart finished"
        );
        run
    };

    #[cfg(feature = "parallel")]
    let runs: Vec<NmdsRun> = {
        use rayon::prelude::*;
        (0..config.restarts).into_par_iter().map(run_one).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let runs: Vec<NmdsRun> = (0..config.restarts).map(run_one).collect();

    Ok(runs)
}

/// Upper-triangle view of the dissimilarities shared by every restart.
struct Problem {
    n: usize,
    pairs: Vec<(usize, usize)>,
    dissimilarities: Vec<f64>,
    /// Pair indices sorted by dissimilarity.
    order: Vec<usize>,
    /// Lengths of runs of equal dissimilarity along `order`.
    ties: Vec<usize>,
}

impl Problem {
    fn new(distances: &DistanceMatrix) -> Self {
        let n = distances.n();
        let n_pairs = n * (n - 1) / 2;
        let mut pairs = Vec::with_capacity(n_pairs);
        let mut dissimilarities = Vec::with_capacity(n_pairs);
        for (i, j, d) in distances.upper_triangle() {
            pairs.push((i, j));
            dissimilarities.push(d);
        }

        let mut order: Vec<usize> = (0..n_pairs).collect();
        order.sort_by(|&a, &b| dissimilarities[a].total_cmp(&dissimilarities[b]));

        let mut ties = Vec::new();
        let mut start = 0;
        for pos in 1..=order.len() {
            if pos == order.len()
                || dissimilarities[order[pos]] != dissimilarities[order[start]]
            {
                ties.push(pos - start);
                start = pos;
            }
        }

        Self {
            n,
            pairs,
            dissimilarities,
            order,
            ties,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.dissimilarities.iter().all(|&d| d == 0.0)
    }

    fn embedded_distances(&self, coords: &[Vec<f64>]) -> Vec<f64> {
        self.pairs
            .iter()
            .map(|&(i, j)| {
                coords[i]
                    .iter()
                    .zip(&coords[j])
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect()
    }

    fn disparities(&self, embedded: &[f64], nonmetric: bool) -> Vec<f64> {
        if !nonmetric {
            return self.dissimilarities.clone();
        }

        let sorted: Vec<f64> = self.order.iter().map(|&idx| embedded[idx]).collect();
        let fitted = isotonic_regression(&sorted, &self.ties);
        let mut disparities = vec![0.0; embedded.len()];
        for (&idx, &value) in self.order.iter().zip(&fitted) {
            disparities[idx] = if self.dissimilarities[idx].is_nan() {
                f64::NAN
            } else {
                value
            };
        }

        // Fix the scale (Σ d̂² = number of pairs) so the fit cannot shrink to zero.
        let sum_sq: f64 = disparities.iter().map(|d| d * d).sum();
        if sum_sq > 0.0 {
            let scale = (disparities.len() as f64 / sum_sq).sqrt();
            for d in disparities.iter_mut() {
                *d *= scale;
            }
        }
        disparities
    }
}

fn smacof(
    problem: &Problem,
    mut coords: Vec<Vec<f64>>,
    config: &NmdsConfig,
    seed: u64,
    warm_started: bool,
) -> NmdsRun {
    let mut stress_history = Vec::new();
    let mut prev_stress: Option<f64> = None;
    let mut converged = false;
    let mut iterations = 0;

    loop {
        let embedded = problem.embedded_distances(&coords);
        let disparities = problem.disparities(&embedded, config.nonmetric);
        let stress = stress_1(&disparities, &embedded);
        stress_history.push(stress);

        if stress <= STRESS_FLOOR {
            converged = true;
            break;
        }
        if let Some(prev) = prev_stress {
            if (prev - stress) / prev < config.tol {
                converged = true;
                break;
            }
        }
        if iterations == config.max_iter {
            break;
        }

        coords = guttman_transform(&coords, &problem.pairs, &disparities, &embedded, problem.n);
        iterations += 1;
        prev_stress = Some(stress);
    }

    center(&mut coords);
    let stress = stress_history.last().copied().unwrap_or(f64::NAN);

    NmdsRun {
        coordinates: coords,
        stress,
        iterations,
        converged,
        stress_history,
        seed,
        warm_started,
    }
}

/// Kruskal stress-1: `sqrt(Σ (d̂ - d)² / Σ d̂²)`.
fn stress_1(disparities: &[f64], embedded: &[f64]) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (&dh, &d) in disparities.iter().zip(embedded) {
        num += (dh - d) * (dh - d);
        den += dh * dh;
    }
    if den > 0.0 {
        (num / den).sqrt()
    } else if den == 0.0 {
        1.0
    } else {
        f64::NAN
    }
}

/// One majorization step: `X⁺ = n⁻¹ B(X) X`.
fn guttman_transform(
    coords: &[Vec<f64>],
    pairs: &[(usize, usize)],
    disparities: &[f64],
    embedded: &[f64],
    n: usize,
) -> Vec<Vec<f64>> {
    let dims = coords.first().map_or(0, |r| r.len());
    let mut next = vec![vec![0.0; dims]; n];
    for (idx, &(i, j)) in pairs.iter().enumerate() {
        let d = embedded[idx];
        if d <= 0.0 {
            continue;
        }
        let ratio = disparities[idx] / d;
        for k in 0..dims {
            let delta = ratio * (coords[i][k] - coords[j][k]);
            next[i][k] += delta;
            next[j][k] -= delta;
        }
    }
    let inv_n = 1.0 / n as f64;
    for row in next.iter_mut() {
        for v in row.iter_mut() {
            *v *= inv_n;
        }
    }
    next
}

fn random_configuration(n: usize, dims: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn center(coords: &mut [Vec<f64>]) {
    let n = coords.len();
    let dims = coords.first().map_or(0, |r| r.len());
    for k in 0..dims {
        let mean = coords.iter().map(|r| r[k]).sum::<f64>() / n as f64;
        for row in coords.iter_mut() {
            row[k] -= mean;
        }
    }
}

/// Pool-adjacent-violators fit of a non-decreasing sequence to `y`.
///
/// `ties` gives the lengths of consecutive groups that must share one
/// fitted value (equal dissimilarities); they sum to `y.len()`.
fn isotonic_regression(y: &[f64], ties: &[usize]) -> Vec<f64> {
    // Each block: (sum, count)
    let mut blocks: Vec<(f64, usize)> = Vec::with_capacity(ties.len());
    let mut start = 0;
    for &len in ties {
        let sum: f64 = y[start..start + len].iter().sum();
        start += len;
        blocks.push((sum, len));
        // Pool backwards while the last two blocks violate monotonicity
        while blocks.len() > 1 {
            let (s1, c1) = blocks[blocks.len() - 1];
            let (s0, c0) = blocks[blocks.len() - 2];
            if s0 / c0 as f64 > s1 / c1 as f64 {
                blocks.pop();
                let last = blocks.len() - 1;
                blocks[last] = (s0 + s1, c0 + c1);
            } else {
                break;
            }
        }
    }

    let mut result = Vec::with_capacity(y.len());
    for &(sum, count) in &blocks {
        let val = sum / count as f64;
        result.extend(std::iter::repeat(val).take(count));
    }
    result
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::distance::{build_matrix, Metric};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn metric_smacof_never_increases_stress(
            samples in proptest::collection::vec(
                proptest::collection::vec(0.0..10.0f64, 4),
                5,
            ),
            seed in any::<u64>(),
        ) {
            let dm = build_matrix(&samples, Metric::BrayCurtis).unwrap();
            let config = NmdsConfig {
                seed: Some(seed),
                nonmetric: false,
                restarts: 1,
                max_iter: 50,
                ..Default::default()
            };
            for run in nmds_runs(&dm, 2, &config).unwrap() {
                for w in run.stress_history.windows(2) {
                    prop_assert!(w[1] <= w[0] + 1e-9, "{:?}", run.stress_history);
                }
            }
        }
    }
}
