//! Naive forecasting model.
//!
//! The naive method simply forecasts the last observed value for all future periods.

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;

/// Naive forecaster that repeats the last value.
#[derive(Debug, Clone, Default)]
pub struct Naive {
    last_value: Option<f64>,
}

impl Naive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for Naive {
    fn fit(&mut self, series: &Series) -> Result<()> {
        self.last_value = Some(series.last_value().ok_or(ForecastError::EmptyData)?);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        let last = self.last_value.ok_or(ForecastError::FitRequired)?;
        Ok(vec![last; horizon])
    }

    fn name(&self) -> &str {
        "Naive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn repeats_last_value() {
        let series =
            Series::monthly(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), vec![3.0, 9.0, 4.0])
                .unwrap();
        let mut model = Naive::new();
        model.fit(&series).unwrap();
        assert_eq!(model.predict(3).unwrap(), vec![4.0; 3]);
        assert!(model.predict(0).unwrap().is_empty());
    }

    #[test]
    fn unfitted_or_empty_is_an_error() {
        assert_eq!(Naive::new().predict(2), Err(ForecastError::FitRequired));
        assert_eq!(
            Naive::new().fit(&Series::default()),
            Err(ForecastError::EmptyData)
        );
    }
}
