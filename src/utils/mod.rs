//! Utility functions shared by the models and the selector.

pub mod cross_validation;
pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use cross_validation::{evaluate_fold, expanding_folds, Fold, FoldScore};
pub use metrics::mape;
pub use ols::{predict_row, ridge_fit};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{coefficient_of_variation, linear_slope, mean, population_std};
