//! Forecasting models.
//!
//! Every model implements [`Forecaster`]. The four candidates of the full
//! evaluation are created through the [`CandidateRegistry`]; the baseline
//! and intermittent models are used directly by the selector's routing.

mod traits;

pub mod arima;
pub mod baseline;
pub mod boosting;
pub mod exponential;
pub mod intermittent;
pub mod trend;

pub use traits::{BoxedForecaster, CandidateRegistry, Forecaster, ModelKind, ModelSpec};
