//! Statistical utility functions.

use statrs::statistics::Statistics;

/// Calculate the mean of a slice (NaN when empty).
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().mean()
}

/// Population standard deviation (ddof = 0), NaN when empty.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().population_std_dev()
}

/// Population coefficient of variation (std / mean).
///
/// Returns 0 when the mean is zero.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 || m.is_nan() {
        return 0.0;
    }
    population_std(values) / m
}

/// Least-squares slope of `values` against their index `0..n`.
///
/// Returns `None` for fewer than two points.
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = mean(values);
    let (sxy, sxx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
            let dx = i as f64 - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
    Some(sxy / sxx)
}
