//! Turning raw observations into a clean monthly series.
//!
//! Raw input may contain several rows per month, mid-month dates and missing
//! months. Preparation aggregates, reindexes onto the monthly grid and trims
//! zero runs at both ends so that downstream models only see the active life
//! of the entity.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::core::period::{month_range, month_start};
use crate::core::{Series, TimeSeriesPoint};
use crate::error::{ForecastError, Result};

/// Aggregate, reindex and trim raw observations.
///
/// Duplicate months are summed, missing months between the first and last
/// observation are filled with zero, and leading/trailing zero runs are
/// removed. An all-zero (or empty) input yields an empty series.
///
/// # Example
/// ```
/// use demand_forecast::core::TimeSeriesPoint;
/// use demand_forecast::transform::prepare_series;
/// use chrono::NaiveDate;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
/// let raw = vec![
///     TimeSeriesPoint::new(d(1, 1), 0.0),
///     TimeSeriesPoint::new(d(2, 10), 3.0),
///     TimeSeriesPoint::new(d(2, 20), 2.0),
///     TimeSeriesPoint::new(d(4, 1), 7.0),
/// ];
/// let series = prepare_series(&raw).unwrap();
/// assert_eq!(series.values(), &[5.0, 0.0, 7.0]);
/// ```
pub fn prepare_series(observations: &[TimeSeriesPoint]) -> Result<Series> {
    let monthly = aggregate_by_month(observations)?;
    let (first, last) = match (monthly.keys().next(), monthly.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Ok(Series::default()),
    };

    let grid: Vec<TimeSeriesPoint> = month_range(first, last)
        .into_iter()
        .map(|period| TimeSeriesPoint::new(period, monthly.get(&period).copied().unwrap_or(0.0)))
        .collect();

    let trimmed = trim_zero_edges(&grid);
    Series::new(trimmed.to_vec())
}

/// Sum observations per month start.
fn aggregate_by_month(observations: &[TimeSeriesPoint]) -> Result<BTreeMap<NaiveDate, f64>> {
    let mut monthly = BTreeMap::new();
    for obs in observations {
        if !obs.value.is_finite() {
            return Err(ForecastError::InvalidObservation {
                period: obs.period.to_string(),
                reason: format!("value {} is not finite", obs.value),
            });
        }
        *monthly.entry(month_start(obs.period)).or_insert(0.0) += obs.value;
    }
    Ok(monthly)
}

/// Slice between the first and last nonzero point (empty if none).
fn trim_zero_edges(points: &[TimeSeriesPoint]) -> &[TimeSeriesPoint] {
    let first = points.iter().position(|p| p.value != 0.0);
    let last = points.iter().rposition(|p| p.value != 0.0);
    match (first, last) {
        (Some(first), Some(last)) => &points[first..=last],
        _ => &[],
    }
}
