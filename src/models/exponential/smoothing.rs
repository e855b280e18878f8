//! The exponential smoothing candidate.

use std::time::Instant;

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::exponential::HoltWinters;
use crate::models::Forecaster;

/// What fitting the smoothing candidate produced.
#[derive(Debug, Clone)]
pub enum SmoothingOutcome {
    /// A Holt-Winters model was fitted.
    Fitted(HoltWinters),
    /// Fewer than two seasonal cycles were available; the forecast is the
    /// mean of the most recent observations.
    SeasonalInitFailed { level: f64, needed: usize, got: usize },
}

impl SmoothingOutcome {
    /// Level smoothing weight of the fitted model, if any.
    pub fn alpha(&self) -> Option<f64> {
        match self {
            SmoothingOutcome::Fitted(model) => model.params().map(|p| p.alpha),
            SmoothingOutcome::SeasonalInitFailed { .. } => None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, SmoothingOutcome::Fitted(_))
    }
}

/// Holt-Winters with trend and seasonality, choosing the variant by AIC.
///
/// Strictly positive series try both a multiplicative and an additive model
/// and keep the one with the lower AIC; a failing multiplicative fit is
/// ignored. Series containing zeros use the additive model only. When the
/// additive model cannot initialise its seasonals the outcome is
/// [`SmoothingOutcome::SeasonalInitFailed`] and the forecast is flat.
///
/// # Example
/// ```
/// use demand_forecast::core::Series;
/// use demand_forecast::models::exponential::{ExponentialSmoothing, SmoothingOutcome};
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let series = Series::monthly(start, vec![4.0, 6.0, 8.0, 10.0]).unwrap();
/// let outcome = ExponentialSmoothing::new(12).fit_outcome(&series).unwrap();
/// assert!(matches!(outcome, SmoothingOutcome::SeasonalInitFailed { level, .. } if level == 7.0));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    period: usize,
    fallback_window: usize,
    deadline: Option<Instant>,
    outcome: Option<SmoothingOutcome>,
}

impl ExponentialSmoothing {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            fallback_window: 6,
            deadline: None,
            outcome: None,
        }
    }

    /// Window of the recent-mean forecast used when seasonals cannot be initialised.
    pub fn with_fallback_window(mut self, window: usize) -> Self {
        self.fallback_window = window.max(1);
        self
    }

    pub fn outcome(&self) -> Option<&SmoothingOutcome> {
        self.outcome.as_ref()
    }

    /// Fit without storing the result.
    pub fn fit_outcome(&self, series: &Series) -> Result<SmoothingOutcome> {
        if series.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let multiplicative = if series.is_strictly_positive() {
            let mut model = self.variant(HoltWinters::multiplicative(self.period));
            model.fit(series).ok().map(|_| model)
        } else {
            None
        };

        let mut additive = self.variant(HoltWinters::additive(self.period));
        match additive.fit(series) {
            Ok(()) => {}
            Err(ForecastError::SeasonalInitialization { needed, got }) => {
                return Ok(SmoothingOutcome::SeasonalInitFailed {
                    level: series.tail_mean(self.fallback_window),
                    needed,
                    got,
                });
            }
            Err(e) => return Err(e),
        }

        let chosen = match multiplicative {
            Some(mul) if aic_or_inf(&mul) < aic_or_inf(&additive) => mul,
            _ => additive,
        };
        Ok(SmoothingOutcome::Fitted(chosen))
    }

    fn variant(&self, mut model: HoltWinters) -> HoltWinters {
        if let Some(deadline) = self.deadline {
            model.set_deadline(deadline);
        }
        model
    }
}

fn aic_or_inf(model: &HoltWinters) -> f64 {
    model
        .aic()
        .filter(|a| !a.is_nan())
        .unwrap_or(f64::INFINITY)
}

impl Forecaster for ExponentialSmoothing {
    fn fit(&mut self, series: &Series) -> Result<()> {
        self.outcome = Some(self.fit_outcome(series)?);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        match self.outcome.as_ref().ok_or(ForecastError::FitRequired)? {
            SmoothingOutcome::Fitted(model) => model.predict(horizon),
            SmoothingOutcome::SeasonalInitFailed { level, .. } => Ok(vec![*level; horizon]),
        }
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        match self.outcome.as_ref()? {
            SmoothingOutcome::Fitted(model) => model.fitted_values(),
            SmoothingOutcome::SeasonalInitFailed { .. } => None,
        }
    }

    fn smoothing_level(&self) -> Option<f64> {
        self.outcome.as_ref().and_then(SmoothingOutcome::alpha)
    }

    fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    fn name(&self) -> &str {
        "Exponential Smoothing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exponential::Component;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use std::f64::consts::PI;

    fn series(values: Vec<f64>) -> Series {
        Series::monthly(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn short_series_uses_recent_mean() {
        let s = series((1..=18).map(f64::from).collect());
        let mut model = ExponentialSmoothing::new(12);
        model.fit(&s).unwrap();
        match model.outcome().unwrap() {
            SmoothingOutcome::SeasonalInitFailed { level, needed, got } => {
                assert_relative_eq!(*level, 15.5);
                assert_eq!((*needed, *got), (24, 18));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(model.predict(3).unwrap(), vec![15.5; 3]);
        assert!(model.outcome().unwrap().alpha().is_none());
    }

    #[test]
    fn zeros_force_additive_model() {
        let mut values: Vec<f64> = (0..36)
            .map(|i| 20.0 + 5.0 * (2.0 * PI * i as f64 / 12.0).sin())
            .collect();
        values[4] = 0.0;
        let outcome = ExponentialSmoothing::new(12).fit_outcome(&series(values)).unwrap();
        match outcome {
            SmoothingOutcome::Fitted(model) => {
                assert_eq!(model.seasonal_type(), Component::Additive);
                assert_eq!(model.trend_type(), Component::Additive);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn positive_series_is_fitted() {
        let values: Vec<f64> = (0..36)
            .map(|i| (100.0 + i as f64) * (1.0 + 0.2 * (2.0 * PI * i as f64 / 12.0).sin()))
            .collect();
        let mut model = ExponentialSmoothing::new(12);
        model.fit(&series(values)).unwrap();
        assert!(model.outcome().unwrap().is_fitted());
        assert!(model.outcome().unwrap().alpha().is_some());
        let forecast = model.predict(12).unwrap();
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn passed_deadline_keeps_the_starting_weights() {
        let values: Vec<f64> = (0..36)
            .map(|i| 50.0 + 8.0 * (2.0 * PI * i as f64 / 12.0).sin())
            .collect();
        let mut model = ExponentialSmoothing::new(12);
        model.set_deadline(std::time::Instant::now());
        model.fit(&series(values)).unwrap();
        // the simplex never moves past its initial vertices
        let alpha = model.smoothing_level().unwrap();
        assert!((0.3..=0.33 + 1e-9).contains(&alpha), "alpha {alpha}");
    }
}
