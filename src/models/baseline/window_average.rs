//! Mean of the most recent observations.

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;

/// Forecasts the mean of the last `window` observations (or of the whole
/// series when it is shorter than the window).
#[derive(Debug, Clone)]
pub struct WindowAverage {
    window: usize,
    level: Option<f64>,
}

impl WindowAverage {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            level: None,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Forecaster for WindowAverage {
    fn fit(&mut self, series: &Series) -> Result<()> {
        if series.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        self.level = Some(series.tail_mean(self.window));
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        let level = self.level.ok_or(ForecastError::FitRequired)?;
        Ok(vec![level; horizon])
    }

    fn name(&self) -> &str {
        "WindowAverage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> Series {
        Series::monthly(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn averages_the_tail() {
        let mut model = WindowAverage::new(6);
        model.fit(&series((1..=10).map(f64::from).collect())).unwrap();
        let forecast = model.predict(2).unwrap();
        assert_relative_eq!(forecast[0], 7.5);
        assert_relative_eq!(forecast[1], 7.5);
    }

    #[test]
    fn short_series_uses_full_mean() {
        let mut model = WindowAverage::new(6);
        model.fit(&series(vec![2.0, 4.0, 9.0])).unwrap();
        assert_relative_eq!(model.predict(1).unwrap()[0], 5.0);
    }
}
