//! Piecewise-linear trend with yearly Fourier seasonality.
//!
//! The trend is `k·t + m + Σ δ_j·(t − c_j)₊` on a time axis scaled to
//! `[0, 1]` over the history. Changepoints `c_j` are found by PELT with a
//! linear-trend cost on the first part of the history; the slope
//! adjustments `δ_j` and Fourier coefficients are estimated together by
//! penalised least squares, with the changepoint prior acting as a ridge
//! weight on the `δ_j`. Forecasts are deterministic point values.

use chrono::{Datelike, NaiveDate};
use std::f64::consts::PI;

use crate::changepoint::{pelt_detect, CostFunction, PeltConfig};
use crate::core::{period, Series};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::ols::{predict_row, ridge_fit};
use crate::utils::stats::population_std;

const YEAR_DAYS: f64 = 365.25;

#[derive(Debug, Clone)]
struct Fitted {
    start: NaiveDate,
    last: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    coefficients: Vec<f64>,
    in_sample: Vec<f64>,
}

/// Changepoint trend forecaster.
#[derive(Debug, Clone)]
pub struct ChangepointTrend {
    changepoint_prior_scale: f64,
    seasonality_prior_scale: f64,
    changepoint_range: f64,
    yearly_order: usize,
    min_observations: usize,
    fitted: Option<Fitted>,
}

impl ChangepointTrend {
    pub fn new() -> Self {
        Self {
            changepoint_prior_scale: 0.5,
            seasonality_prior_scale: 10.0,
            changepoint_range: 0.8,
            yearly_order: 3,
            min_observations: 12,
            fitted: None,
        }
    }

    /// Prior scale of the slope changes; larger values allow a more flexible trend.
    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Self {
        self.changepoint_prior_scale = scale.max(1e-6);
        self
    }

    /// Share of the history in which changepoints may be placed.
    pub fn with_changepoint_range(mut self, range: f64) -> Self {
        self.changepoint_range = range.clamp(0.0, 1.0);
        self
    }

    /// Number of sine/cosine pairs of the yearly seasonality.
    pub fn with_yearly_order(mut self, order: usize) -> Self {
        self.yearly_order = order;
        self
    }

    /// Changepoint locations on the scaled time axis.
    pub fn changepoints(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.changepoints.as_slice())
    }

    /// Indices (into the history) of slope changes in the deseasonalised series.
    fn detect_changepoints(&self, deseasonalised: &[f64], scale: f64) -> Vec<usize> {
        let n = deseasonalised.len();
        let limit = ((n as f64) * self.changepoint_range).floor() as usize;
        if limit < 6 {
            return Vec::new();
        }
        let normalized: Vec<f64> = deseasonalised[..limit].iter().map(|v| v / scale).collect();
        let config = PeltConfig::default()
            .cost_function(CostFunction::LinearTrend)
            .penalty(2.0 * (n as f64).ln())
            .min_segment_length(3);
        pelt_detect(&normalized, &config).changepoints
    }

    fn design_row(&self, date: NaiveDate, fitted: &Fitted) -> Vec<f64> {
        let t = (date - fitted.start).num_days() as f64 / fitted.span_days;
        let mut row = Vec::with_capacity(2 + fitted.changepoints.len() + 2 * self.yearly_order);
        row.push(1.0);
        row.push(t);
        row.extend(fitted.changepoints.iter().map(|&c| (t - c).max(0.0)));
        let day = f64::from(date.num_days_from_ce());
        for k in 1..=self.yearly_order {
            let angle = 2.0 * PI * k as f64 * day / YEAR_DAYS;
            row.push(angle.sin());
            row.push(angle.cos());
        }
        row
    }

    /// Ridge weights for `[intercept, slope, hinges.., fourier..]`.
    ///
    /// Prior variances are relative to the noise variance, so the weights
    /// are `σ²/τ²` as in a Gaussian MAP estimate.
    fn penalties(&self, changepoints: usize, noise_var: f64) -> Vec<f64> {
        let mut penalties = vec![0.0, 0.0];
        penalties.extend(
            std::iter::repeat(noise_var / self.changepoint_prior_scale.powi(2)).take(changepoints),
        );
        penalties.extend(
            std::iter::repeat(noise_var / self.seasonality_prior_scale.powi(2))
                .take(2 * self.yearly_order),
        );
        penalties
    }
}

impl Default for ChangepointTrend {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for ChangepointTrend {
    fn fit(&mut self, series: &Series) -> Result<()> {
        let n = series.len();
        if n < self.min_observations {
            return Err(ForecastError::InsufficientData {
                needed: self.min_observations,
                got: n,
            });
        }
        let (start, last) = match (series.first_period(), series.last_period()) {
            (Some(s), Some(l)) => (s, l),
            _ => return Err(ForecastError::EmptyData),
        };

        let y_scale = series
            .values()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
            .max(1.0);
        let y: Vec<f64> = series.values().iter().map(|v| v / y_scale).collect();
        let span_days = ((last - start).num_days() as f64).max(1.0);

        let mut fitted = Fitted {
            start,
            last,
            span_days,
            y_scale,
            changepoints: Vec::new(),
            coefficients: Vec::new(),
            in_sample: Vec::new(),
        };

        // Trend + seasonality without hinges, to deseasonalise before
        // looking for slope changes.
        let base_rows: Vec<Vec<f64>> = series
            .periods()
            .iter()
            .map(|&d| self.design_row(d, &fitted))
            .collect();
        let base = ridge_fit(&base_rows, &y, &self.penalties(0, 0.0))?;
        let mut sse = 0.0;
        let deseasonalised: Vec<f64> = base_rows
            .iter()
            .zip(y.iter())
            .map(|(row, &v)| {
                let resid = v - predict_row(row, &base);
                sse += resid * resid;
                v - predict_row(&row[2..], &base[2..])
            })
            .collect();
        let noise_var = (sse / n as f64).max(1e-6);

        fitted.changepoints = self
            .detect_changepoints(&deseasonalised, population_std(&y).max(1e-9))
            .into_iter()
            .map(|i| (series.periods()[i] - start).num_days() as f64 / span_days)
            .collect();

        let rows: Vec<Vec<f64>> = series
            .periods()
            .iter()
            .map(|&d| self.design_row(d, &fitted))
            .collect();
        let coefficients = ridge_fit(
            &rows,
            &y,
            &self.penalties(fitted.changepoints.len(), noise_var),
        )?;
        fitted.in_sample = rows
            .iter()
            .map(|r| predict_row(r, &coefficients) * y_scale)
            .collect();
        fitted.coefficients = coefficients;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(ForecastError::FitRequired)?;
        let future = period::months_from(period::next_month(fitted.last)?, horizon);
        Ok(future
            .into_iter()
            .map(|d| predict_row(&self.design_row(d, fitted), &fitted.coefficients) * fitted.y_scale)
            .collect())
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.in_sample.as_slice())
    }

    fn name(&self) -> &str {
        "Changepoint Trend"
    }
}
