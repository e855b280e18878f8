//! Core data structures: month periods, entity keys and monthly series.

pub mod period;
mod time_series;

pub use time_series::{EntityKey, Series, TimeSeriesPoint, ALL_CLIENTS};
