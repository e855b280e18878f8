//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};

/// Mean Absolute Percentage Error, as a fraction.
///
/// Each term is `|actual - predicted| / max(|actual|, ε)` with
/// `ε = f64::EPSILON`, so zero actuals produce a very large but finite error
/// instead of a division by zero.
///
/// # Example
/// ```
/// use demand_forecast::utils::mape;
///
/// let score = mape(&[100.0, 200.0], &[110.0, 180.0]).unwrap();
/// assert!((score - 0.1).abs() < 1e-12);
/// ```
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    if actual.len() != predicted.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "actual has {} points but forecast has {}",
            actual.len(),
            predicted.len()
        )));
    }

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON))
        .sum();

    let score = sum / actual.len() as f64;
    if score.is_nan() {
        return Err(ForecastError::ComputationError(
            "forecast contains NaN values".to_string(),
        ));
    }
    Ok(score)
}
