//! Gradient-boosted trees on calendar features.

use chrono::{Datelike, NaiveDate};
use std::time::Instant;

use crate::core::{period, Series};
use crate::error::{ForecastError, Result};
use crate::models::boosting::tree::{RegressionTree, TreeParams};
use crate::models::Forecaster;

/// Feature vector of a month: ordinal day, month, quarter, year.
pub fn calendar_features(date: NaiveDate) -> Vec<f64> {
    vec![
        f64::from(date.num_days_from_ce()),
        f64::from(date.month()),
        f64::from(period::quarter(date)),
        f64::from(date.year()),
    ]
}

/// Boosted regression trees with squared loss.
///
/// The model starts from the mean of the history and adds `n_trees` trees,
/// each fitted to the current residuals and shrunk by the learning rate.
/// Forecasts evaluate the ensemble on the calendar features of the future
/// months, so the ordinal-day feature saturates at the last training split.
/// A deadline stops adding trees once it has passed.
///
/// # Example
/// ```
/// use demand_forecast::core::Series;
/// use demand_forecast::models::Forecaster;
/// use demand_forecast::models::boosting::GradientBoosting;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
/// let values: Vec<f64> = (0..24).map(|i| if i % 12 < 6 { 10.0 } else { 30.0 }).collect();
/// let mut model = GradientBoosting::new();
/// model.fit(&Series::monthly(start, values).unwrap()).unwrap();
/// let forecast = model.predict(12).unwrap();
/// assert!(forecast[0] < forecast[6]);
/// ```
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    n_trees: usize,
    learning_rate: f64,
    tree_params: TreeParams,
    base_score: f64,
    trees: Vec<RegressionTree>,
    last_period: Option<NaiveDate>,
    fitted: Vec<f64>,
    deadline: Option<Instant>,
}

impl GradientBoosting {
    /// 100 trees of depth 3 with learning rate 0.1.
    pub fn new() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.1,
            tree_params: TreeParams::default(),
            base_score: 0.0,
            trees: Vec::new(),
            last_period: None,
            fitted: Vec::new(),
            deadline: None,
        }
    }

    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.tree_params.max_depth = max_depth;
        self
    }

    pub fn n_fitted_trees(&self) -> usize {
        self.trees.len()
    }

    fn score(&self, row: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(row))
                .sum::<f64>()
    }
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for GradientBoosting {
    fn fit(&mut self, series: &Series) -> Result<()> {
        if series.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }

        let rows: Vec<Vec<f64>> = series
            .periods()
            .iter()
            .map(|&d| calendar_features(d))
            .collect();
        let y = series.values();

        self.trees.clear();
        self.base_score = series.mean();
        let mut prediction = vec![self.base_score; y.len()];
        for _ in 0..self.n_trees {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let residuals: Vec<f64> = y.iter().zip(&prediction).map(|(a, p)| a - p).collect();
            let tree = RegressionTree::fit(&rows, &residuals, &self.tree_params);
            for (p, row) in prediction.iter_mut().zip(&rows) {
                *p += self.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }

        self.fitted = prediction;
        self.last_period = series.last_period();
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        let last = self.last_period.ok_or(ForecastError::FitRequired)?;
        Ok(period::months_from(period::next_month(last)?, horizon)
            .into_iter()
            .map(|d| self.score(&calendar_features(d)))
            .collect())
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.last_period.map(|_| self.fitted.as_slice())
    }

    fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    fn name(&self) -> &str {
        "Gradient Boosting"
    }
}
