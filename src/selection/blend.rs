//! Inverse-error blending of candidate forecasts.

use crate::error::{ForecastError, Result};

/// Weighted average of `members` with weights `1 / score`.
///
/// Every score must be finite and positive and every forecast must have the
/// same length.
pub fn inverse_error_average(members: &[(&[f64], f64)]) -> Result<Vec<f64>> {
    let first = members.first().ok_or(ForecastError::EmptyData)?;
    let horizon = first.0.len();

    let mut total_weight = 0.0;
    let mut combined = vec![0.0; horizon];
    for (forecast, score) in members {
        if !(score.is_finite() && *score > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "blend weights need positive finite scores, got {score}"
            )));
        }
        if forecast.len() != horizon {
            return Err(ForecastError::InvalidParameter(format!(
                "forecast lengths differ: {} vs {horizon}",
                forecast.len()
            )));
        }
        let weight = 1.0 / score;
        total_weight += weight;
        for (c, v) in combined.iter_mut().zip(forecast.iter()) {
            *c += weight * v;
        }
    }

    for c in &mut combined {
        *c /= total_weight;
    }
    Ok(combined)
}

/// `best_weight · best + (1 − best_weight) · inverse_error_average(members)`.
///
/// # Example
/// ```
/// use demand_forecast::selection::blend_forecasts;
///
/// let a = [10.0, 10.0];
/// let b = [20.0, 20.0];
/// let blended = blend_forecasts(&a, &[(&a, 0.1), (&b, 0.2)], 0.5).unwrap();
/// assert!((blended[0] - 11.6667).abs() < 1e-4);
/// ```
pub fn blend_forecasts(best: &[f64], members: &[(&[f64], f64)], best_weight: f64) -> Result<Vec<f64>> {
    let average = inverse_error_average(members)?;
    if average.len() != best.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "best forecast has {} values, members have {}",
            best.len(),
            average.len()
        )));
    }
    Ok(best
        .iter()
        .zip(average.iter())
        .map(|(b, a)| best_weight * b + (1.0 - best_weight) * a)
        .collect())
}
