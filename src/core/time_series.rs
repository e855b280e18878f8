//! Monthly series for one product/client entity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::period::{is_month_start, months_between, months_from, next_month};
use crate::error::{ForecastError, Result};

/// Client name used for product-level aggregates.
pub const ALL_CLIENTS: &str = "ALL";

/// Identifies one forecasting entity (product/client combination).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub product: String,
    pub client: String,
}

impl EntityKey {
    pub fn new(product: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            client: client.into(),
        }
    }

    /// Key of the product-level aggregate across all clients.
    pub fn product_total(product: impl Into<String>) -> Self {
        Self::new(product, ALL_CLIENTS)
    }

    pub fn is_product_total(&self) -> bool {
        self.client == ALL_CLIENTS
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.product, self.client)
    }
}

/// One observation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(period: NaiveDate, value: f64) -> Self {
        Self { period, value }
    }
}

/// Ordered, contiguous monthly series.
///
/// Periods are month starts, strictly increasing with no gaps. Trimming of
/// leading/trailing zeros is the preparer's job; `Series` itself accepts
/// zeros anywhere so that sub-ranges can be sliced out for cross-validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    periods: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl Series {
    /// Build a series from points, validating the monthly-grid invariant.
    pub fn new(points: Vec<TimeSeriesPoint>) -> Result<Self> {
        let (periods, values) = points.into_iter().map(|p| (p.period, p.value)).unzip();
        Self::from_parts(periods, values)
    }

    /// Build a series starting at `start` with consecutive monthly values.
    pub fn monthly(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if !is_month_start(start) {
            return Err(ForecastError::InvalidPeriod(format!(
                "{start} is not the first day of a month"
            )));
        }
        let periods = months_from(start, values.len());
        if periods.len() != values.len() {
            return Err(ForecastError::InvalidPeriod(format!(
                "{} months from {start} exceed the calendar",
                values.len()
            )));
        }
        Ok(Self { periods, values })
    }

    fn from_parts(periods: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        for period in &periods {
            if !is_month_start(*period) {
                return Err(ForecastError::InvalidPeriod(format!(
                    "{period} is not the first day of a month"
                )));
            }
        }
        for w in periods.windows(2) {
            if months_between(w[0], w[1]) != 1 {
                return Err(ForecastError::InvalidPeriod(format!(
                    "periods must be contiguous months, found {} followed by {}",
                    w[0], w[1]
                )));
            }
        }
        Ok(Self { periods, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn points(&self) -> impl Iterator<Item = TimeSeriesPoint> + '_ {
        self.periods
            .iter()
            .zip(self.values.iter())
            .map(|(&period, &value)| TimeSeriesPoint { period, value })
    }

    pub fn first_period(&self) -> Option<NaiveDate> {
        self.periods.first().copied()
    }

    pub fn last_period(&self) -> Option<NaiveDate> {
        self.periods.last().copied()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Share of observations that are exactly zero.
    pub fn zero_fraction(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let zeros = self.values.iter().filter(|&&v| v == 0.0).count();
        zeros as f64 / self.values.len() as f64
    }

    /// Whether every observation is greater than zero.
    pub fn is_strictly_positive(&self) -> bool {
        !self.values.is_empty() && self.values.iter().all(|&v| v > 0.0)
    }

    /// Arithmetic mean (NaN for an empty series).
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Mean of the last `window` observations, or of all when shorter.
    pub fn tail_mean(&self, window: usize) -> f64 {
        let start = self.values.len().saturating_sub(window);
        let tail = &self.values[start..];
        if tail.is_empty() {
            return f64::NAN;
        }
        tail.iter().sum::<f64>() / tail.len() as f64
    }

    /// Sub-series over `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Series> {
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "invalid slice {start}..{end} of series with {} points",
                self.len()
            )));
        }
        Ok(Series {
            periods: self.periods[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// The `horizon` month starts following the last period.
    pub fn future_periods(&self, horizon: usize) -> Result<Vec<NaiveDate>> {
        let last = self.last_period().ok_or(ForecastError::EmptyData)?;
        Ok(months_from(next_month(last)?, horizon))
    }
}
