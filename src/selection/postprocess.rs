//! Forecast clean-up before persisting.

use chrono::NaiveDate;

use crate::core::{period, Series};
use crate::error::Result;

/// Replace non-finite forecast values with `fill`.
pub fn replace_non_finite(forecast: &mut [f64], fill: f64) -> usize {
    let mut replaced = 0;
    for v in forecast.iter_mut().filter(|v| !v.is_finite()) {
        *v = fill;
        replaced += 1;
    }
    replaced
}

/// Round a forecast to non-negative whole quantities (ceiling).
pub fn to_quantity(value: f64) -> f64 {
    if value.is_finite() {
        value.ceil().max(0.0)
    } else {
        0.0
    }
}

/// First forecast month: the month after the history, but never a month
/// before `current_month`.
///
/// An empty history starts at `current_month`.
pub fn forecast_start(history: &Series, current_month: NaiveDate) -> Result<NaiveDate> {
    let current = period::month_start(current_month);
    let start = match history.last_period() {
        Some(last) => period::next_month(last)?,
        None => current,
    };
    Ok(start.max(current))
}
