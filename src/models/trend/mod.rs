//! Trend models with changepoints.

mod changepoint_trend;

pub use changepoint_trend::ChangepointTrend;
