//! Derivative-free parameter search.
//!
//! Smoothing and SARIMA parameters are estimated by minimising an in-sample
//! loss with a bounded Nelder-Mead simplex.

use std::cmp::Ordering;
use std::time::Instant;

/// Outcome of a Nelder-Mead search.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found.
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`.
    pub optimal_value: f64,
    pub iterations: usize,
    pub converged: bool,
    /// The search stopped because its deadline passed.
    pub timed_out: bool,
}

/// Simplex search settings.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    /// Stop when the spread of objective values drops below this.
    pub tolerance: f64,
    /// Relative size of the initial simplex edges.
    pub initial_step: f64,
    /// Stop iterating once this instant has passed.
    pub deadline: Option<Instant>,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tolerance: 1e-8,
            initial_step: 0.1,
            deadline: None,
        }
    }
}

impl NelderMeadConfig {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimise `objective` starting from `initial`, clamping every trial point
/// into `bounds` when given.
///
/// Non-finite objective values are treated as `+inf`, so a loss that blows up
/// for some parameters simply steers the simplex away from them.
///
/// # Example
/// ```
/// use demand_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 0.3).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.5, 0.5],
///     Some(&[(0.0, 1.0), (-2.0, 2.0)]),
///     NelderMeadConfig::default(),
/// );
/// assert!((result.optimal_point[0] - 0.3).abs() < 1e-3);
/// assert!((result.optimal_point[1] + 1.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let dim = initial.len();
    if dim == 0 {
        return NelderMeadResult {
            optimal_point: Vec::new(),
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
            timed_out: false,
        };
    }

    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let start = clamp(initial.to_vec(), bounds);
    let mut vertices: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
    vertices.push((start.clone(), eval(&start)));
    for i in 0..dim {
        let mut v = start.clone();
        let step = if v[i].abs() > 1e-8 {
            config.initial_step * v[i].abs()
        } else {
            config.initial_step
        };
        v[i] += step;
        // A step that is clamped back onto the start would collapse the simplex.
        let mut v = clamp(v, bounds);
        if v == start {
            v[i] -= 2.0 * step;
            v = clamp(v, bounds);
        }
        let value = eval(&v);
        vertices.push((v, value));
    }

    let mut iterations = 0;
    let mut converged = false;
    let mut timed_out = false;

    while iterations < config.max_iter {
        if config.deadline.is_some_and(|d| Instant::now() >= d) {
            timed_out = true;
            break;
        }
        iterations += 1;
        vertices.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let best = vertices[0].1;
        let worst = vertices[dim].1;
        let second_worst = vertices[dim - 1].1;
        if (worst - best).abs() <= config.tolerance * (1.0 + best.abs()) {
            converged = true;
            break;
        }

        let centroid = centroid(&vertices[..dim]);
        let worst_point = vertices[dim].0.clone();

        let reflected = clamp(along(&centroid, &worst_point, -REFLECT), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < best {
            let expanded = clamp(along(&centroid, &worst_point, -EXPAND), bounds);
            let expanded_value = eval(&expanded);
            vertices[dim] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < second_worst {
            vertices[dim] = (reflected, reflected_value);
            continue;
        }

        let (toward, toward_value) = if reflected_value < worst {
            (reflected, reflected_value)
        } else {
            (worst_point, worst)
        };
        let contracted = clamp(along(&centroid, &toward, CONTRACT), bounds);
        let contracted_value = eval(&contracted);
        if contracted_value < toward_value {
            vertices[dim] = (contracted, contracted_value);
            continue;
        }

        let anchor = vertices[0].0.clone();
        for vertex in vertices.iter_mut().skip(1) {
            let shrunk = clamp(along(&anchor, &vertex.0, SHRINK), bounds);
            let value = eval(&shrunk);
            *vertex = (shrunk, value);
        }
    }

    let (optimal_point, optimal_value) = vertices
        .into_iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .unwrap_or((start, f64::NAN));

    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
        timed_out,
    }
}

fn centroid(vertices: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let dim = vertices[0].0.len();
    let mut c = vec![0.0; dim];
    for (point, _) in vertices {
        for (ci, pi) in c.iter_mut().zip(point) {
            *ci += pi;
        }
    }
    let count = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= count);
    c
}

/// `origin + t * (point - origin)`.
fn along(origin: &[f64], point: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point)
        .map(|(o, p)| o + t * (p - o))
        .collect()
}

fn clamp(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}
