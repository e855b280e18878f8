//! Exponential smoothing models.
//!
//! - Holt-Winters with additive or multiplicative trend and seasonality
//! - The smoothing candidate, which picks between the two by AIC and falls
//!   back to a recent mean when seasonal initialisation is impossible

mod holt_winters;
mod smoothing;

pub use holt_winters::{Component, HoltWinters, SmoothingParams};
pub use smoothing::{ExponentialSmoothing, SmoothingOutcome};
