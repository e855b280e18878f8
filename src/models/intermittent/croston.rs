//! Croston's method for intermittent demand forecasting.
//!
//! Croston's method separately smooths the size of nonzero demands and the
//! interval measure, then forecasts their ratio as a flat rate.

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;

/// Croston forecaster.
///
/// With `f` the index of the first positive observation, the state starts at
/// `a = y[f]`, `p = 1`. For each later positive `y[i]`:
///
/// - `a ← α·y[i] + (1−α)·a`
/// - `p ← α·(i − f) + (1−α)·p`
///
/// and the forecast is the constant `a / p`. Indices are measured from the
/// first demand, so leading zeros never influence the result. A series with
/// no positive demand forecasts zero.
#[derive(Debug, Clone)]
pub struct Croston {
    alpha: f64,
    demand_level: Option<f64>,
    interval_level: Option<f64>,
    fitted: Option<Vec<f64>>,
}

impl Croston {
    /// Create a Croston model with the default smoothing constant (0.1).
    pub fn new() -> Self {
        Self {
            alpha: 0.1,
            demand_level: None,
            interval_level: None,
            fitted: None,
        }
    }

    /// Set the smoothing constant.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn demand_level(&self) -> Option<f64> {
        self.demand_level
    }

    pub fn interval_level(&self) -> Option<f64> {
        self.interval_level
    }

    /// Forecast rate implied by the current state.
    fn rate(demand_level: f64, interval_level: f64) -> f64 {
        if interval_level == 0.0 {
            0.0
        } else {
            demand_level / interval_level
        }
    }
}

impl Default for Croston {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for Croston {
    fn fit(&mut self, series: &Series) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let Some(first) = values.iter().position(|&v| v > 0.0) else {
            self.demand_level = Some(0.0);
            self.interval_level = Some(1.0);
            self.fitted = Some(vec![0.0; values.len()]);
            return Ok(());
        };

        let alpha = self.alpha;
        let mut a = values[first];
        let mut p = 1.0;
        let mut fitted = vec![Self::rate(a, p); values.len()];

        for (i, &y) in values.iter().enumerate().skip(first + 1) {
            if y > 0.0 {
                a = alpha * y + (1.0 - alpha) * a;
                p = alpha * (i - first) as f64 + (1.0 - alpha) * p;
            }
            fitted[i] = Self::rate(a, p);
        }

        self.demand_level = Some(a);
        self.interval_level = Some(p);
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        let a = self.demand_level.ok_or(ForecastError::FitRequired)?;
        let p = self.interval_level.ok_or(ForecastError::FitRequired)?;
        Ok(vec![Self::rate(a, p); horizon])
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn name(&self) -> &str {
        "Croston"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> Series {
        Series::monthly(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn hand_computed_state() {
        // first demand at 0: a=4, p=1
        // i=3, y=2: a = 0.1*2 + 0.9*4 = 3.8, p = 0.1*3 + 0.9*1 = 1.2
        // i=5, y=6: a = 0.6 + 3.42 = 4.02, p = 0.5 + 1.08 = 1.58
        let mut model = Croston::new();
        model
            .fit(&series(vec![4.0, 0.0, 0.0, 2.0, 0.0, 6.0, 0.0]))
            .unwrap();
        assert_relative_eq!(model.demand_level().unwrap(), 4.02, epsilon = 1e-12);
        assert_relative_eq!(model.interval_level().unwrap(), 1.58, epsilon = 1e-12);
        let forecast = model.predict(3).unwrap();
        assert_eq!(forecast.len(), 3);
        assert_relative_eq!(forecast[0], 4.02 / 1.58, epsilon = 1e-12);
    }

    #[test]
    fn leading_zeros_do_not_change_forecast() {
        let core = vec![5.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 8.0];
        let mut padded = vec![0.0; 5];
        padded.extend_from_slice(&core);

        let mut a = Croston::new();
        a.fit(&series(core)).unwrap();
        let mut b = Croston::new();
        b.fit(&series(padded)).unwrap();
        assert_relative_eq!(a.predict(1).unwrap()[0], b.predict(1).unwrap()[0]);
    }

    #[test]
    fn all_zero_forecasts_zero() {
        let mut model = Croston::new();
        model.fit(&series(vec![0.0; 6])).unwrap();
        assert_eq!(model.predict(4).unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn custom_alpha_is_used() {
        let mut model = Croston::new().with_alpha(0.5);
        model.fit(&series(vec![2.0, 0.0, 4.0])).unwrap();
        // a = 0.5*4 + 0.5*2 = 3, p = 0.5*2 + 0.5*1 = 1.5
        assert_relative_eq!(model.predict(1).unwrap()[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn predict_requires_fit() {
        assert_eq!(Croston::new().predict(1), Err(ForecastError::FitRequired));
    }
}
