//! Baseline forecasting models.
//!
//! Used for short histories and as the last-resort fallback.

mod naive;
mod window_average;

pub use naive::Naive;
pub use window_average::WindowAverage;
