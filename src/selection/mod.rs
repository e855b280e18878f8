//! Model selection and ensembling.
//!
//! [`ModelSelector`] routes a prepared series to the no-data, naive,
//! Croston or full-evaluation path and returns an immutable
//! [`ModelSelection`]. The full evaluation cross-validates every candidate of
//! a [`CandidateRegistry`](crate::models::CandidateRegistry) in parallel and
//! blends the refitted forecasts around the best one.

mod blend;
mod outcome;
mod postprocess;
mod selector;

pub use blend::{blend_forecasts, inverse_error_average};
pub use outcome::{
    ensemble_label, CandidateResult, CandidateScore, ModelSelection, SeriesClass, CROSTON,
    MEAN_FALLBACK, NAIVE_INSUFFICIENT, NO_DATA, SMOOTHING_FALLBACK,
};
pub use postprocess::{forecast_start, replace_non_finite, to_quantity};
pub use selector::ModelSelector;
