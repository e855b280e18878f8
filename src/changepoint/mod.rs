//! Changepoint detection.
//!
//! PELT with either a level-shift (L2) or a slope-change (linear trend)
//! segment cost. The changepoint-trend model uses the latter to place the
//! hinges of its piecewise-linear trend.

pub mod cost;
pub mod pelt;

pub use cost::{l2_cost, linear_trend_cost, segment_cost, CostFunction, SegmentCosts};
pub use pelt::{pelt_detect, PeltConfig, PeltResult};
