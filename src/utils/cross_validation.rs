//! Rolling-origin cross-validation over contiguous blocks.
//!
//! The series is cut into `folds + 1` equal blocks of `⌊n / (folds + 1)⌋`
//! points. Fold `i` trains on blocks `0..=i` and tests on block `i + 1`, so
//! the training window grows while the test window slides forward. A
//! remainder that does not fill a whole block is never tested.

use std::time::{Duration, Instant};

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::metrics::mape;

/// One train/test split, as index boundaries into the full series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    /// Training data is `[0, train_end)`.
    pub train_end: usize,
    /// Test data is `[train_end, test_end)`.
    pub test_end: usize,
}

impl Fold {
    pub fn horizon(&self) -> usize {
        self.test_end - self.train_end
    }
}

/// Expanding-window folds over a series of length `n`.
///
/// Returns no folds when a block would be empty.
///
/// # Example
/// ```
/// use demand_forecast::utils::cross_validation::expanding_folds;
///
/// let folds = expanding_folds(24, 3);
/// assert_eq!(folds.len(), 3);
/// assert_eq!((folds[0].train_end, folds[0].test_end), (6, 12));
/// assert_eq!((folds[2].train_end, folds[2].test_end), (18, 24));
/// ```
pub fn expanding_folds(n: usize, folds: usize) -> Vec<Fold> {
    let block = n / (folds + 1);
    if block == 0 {
        return Vec::new();
    }
    (0..folds)
        .map(|i| Fold {
            index: i,
            train_end: block * (i + 1),
            test_end: block * (i + 2),
        })
        .collect()
}

/// Result of scoring one model on one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldScore {
    pub fold: Fold,
    pub score: Result<f64>,
    pub elapsed: Duration,
}

/// Fit a fresh model on the fold's training block and score its forecast of
/// the test block with MAPE.
pub fn evaluate_fold<M: Forecaster + ?Sized>(
    model: &mut M,
    series: &Series,
    fold: Fold,
) -> FoldScore {
    let started = Instant::now();
    let score = score_fold(model, series, fold);
    FoldScore {
        fold,
        score,
        elapsed: started.elapsed(),
    }
}

fn score_fold<M: Forecaster + ?Sized>(model: &mut M, series: &Series, fold: Fold) -> Result<f64> {
    if fold.test_end > series.len() || fold.train_end == 0 || fold.horizon() == 0 {
        return Err(ForecastError::InvalidParameter(format!(
            "fold {}..{} does not fit a series of {} points",
            fold.train_end,
            fold.test_end,
            series.len()
        )));
    }
    let train = series.slice(0, fold.train_end)?;
    model.fit(&train)?;
    let forecast = model.predict(fold.horizon())?;
    mape(&series.values()[fold.train_end..fold.test_end], &forecast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct LastValue(Option<f64>);

    impl Forecaster for LastValue {
        fn fit(&mut self, series: &Series) -> Result<()> {
            self.0 = series.last_value();
            Ok(())
        }

        fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
            let last = self.0.ok_or(ForecastError::FitRequired)?;
            Ok(vec![last; horizon])
        }

        fn name(&self) -> &str {
            "LastValue"
        }
    }

    fn series(values: Vec<f64>) -> Series {
        Series::monthly(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn folds_use_floor_of_quarter() {
        let folds = expanding_folds(14, 3);
        assert_eq!(
            folds
                .iter()
                .map(|f| (f.train_end, f.test_end))
                .collect::<Vec<_>>(),
            vec![(3, 6), (6, 9), (9, 12)]
        );
        assert!(expanding_folds(3, 3).is_empty());
    }

    #[test]
    fn fold_score_is_mape_of_test_block() {
        let s = series(vec![10.0, 10.0, 20.0, 20.0]);
        let fold = Fold {
            index: 0,
            train_end: 2,
            test_end: 4,
        };
        let result = evaluate_fold(&mut LastValue(None), &s, fold);
        assert_eq!(result.score, Ok(0.5));
    }

    #[test]
    fn out_of_range_fold_is_an_error() {
        let s = series(vec![1.0, 2.0]);
        let fold = Fold {
            index: 0,
            train_end: 1,
            test_end: 5,
        };
        assert!(evaluate_fold(&mut LastValue(None), &s, fold).score.is_err());
    }
}
