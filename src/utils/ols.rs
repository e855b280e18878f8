//! Penalised least squares on a dense design matrix.
//!
//! Used by the changepoint-trend model to fit its hinge and Fourier
//! coefficients in one solve.

use crate::error::{ForecastError, Result};

/// Solve `min ||y - X b||² + Σ penalty_j b_j²` via the normal equations.
///
/// `rows` holds one design row per observation. `penalties` gives the ridge
/// weight of every column (use 0 for unpenalised columns such as the
/// intercept). A tiny jitter keeps the system positive definite.
pub fn ridge_fit(rows: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    if rows.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if rows.len() != y.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "design has {} rows but target has {} values",
            rows.len(),
            y.len()
        )));
    }
    let k = penalties.len();
    if rows.iter().any(|r| r.len() != k) {
        return Err(ForecastError::InvalidParameter(format!(
            "every design row must have {k} columns"
        )));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in 0..=i {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += penalties[i] + 1e-8;
    }

    solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError("normal equations are not positive definite".into())
    })
}

/// Dot product of a design row with fitted coefficients.
pub fn predict_row(row: &[f64], coefficients: &[f64]) -> f64 {
    row.iter().zip(coefficients).map(|(x, b)| x * b).sum()
}

/// Solve `A x = b` for symmetric positive definite `A` by Cholesky.
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum = b[i] - (0..i).map(|j| l[i][j] * z[j]).sum::<f64>();
        z[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum = z[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>();
        x[i] = sum / l[i][i];
    }
    Some(x)
}
