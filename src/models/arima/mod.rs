//! Seasonal ARIMA.
//!
//! This module provides:
//! - differencing stages and their inverse
//! - SARIMA (p, d, q)(P, D, Q)\[s\] estimated by conditional sum of squares

mod diff;
mod sarima;

pub use diff::{undifference, DifferenceStage};
pub use sarima::{Sarima, SarimaOrder};
