//! Manual adjustments and final forecast composition.
//!
//! Planners edit key figures with quantity deltas, percentage multipliers or
//! overrides. The [`AdjustmentBook`] keeps one live edit per slot, a
//! [`SnapshotSource`] hands out a consistent view of history, statistical
//! forecast and edits, and [`compose_final_forecast`] turns that view into
//! one value per month.

mod book;
mod composer;
mod snapshot;
mod types;

pub use book::AdjustmentBook;
pub use composer::{compose_final_forecast, compose_from_source, manual_input_history};
pub use snapshot::{CompositionSnapshot, InMemoryStore, SnapshotSource};
pub use types::{
    Adjustment, AdjustmentSlot, AdjustmentType, FinalForecastPoint, ForecastRun, HistoryPoint,
    HistorySource, KeyFigure, PeriodWindow, StatForecastPoint,
};
