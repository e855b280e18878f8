//! # demand-forecast
//!
//! Demand forecasting per product/client: series preparation, cross-validated
//! model selection with ensembling and fallbacks, quality alerts, and
//! composition of the final forecast from manual adjustments.
//!
//! ```
//! use demand_forecast::prelude::*;
//! use chrono::NaiveDate;
//!
//! let month = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
//! let raw = vec![
//!     TimeSeriesPoint::new(month(1), 4.0),
//!     TimeSeriesPoint::new(month(3), 6.0),
//!     TimeSeriesPoint::new(month(3), 1.0),
//! ];
//! let series = prepare_series(&raw).unwrap();
//! assert_eq!(series.values(), &[4.0, 0.0, 7.0]);
//!
//! let selector = ModelSelector::new(EngineConfig::default().with_horizon(2));
//! let selection = selector.select(&EntityKey::new("SKU1", "C1"), &series).unwrap();
//! assert_eq!(selection.forecast, vec![7.0, 7.0]);
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod adjustment;
pub mod alerts;
pub mod batch;
pub mod changepoint;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod selection;
pub mod transform;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::adjustment::{
        compose_final_forecast, Adjustment, AdjustmentBook, AdjustmentType, CompositionSnapshot,
        FinalForecastPoint, KeyFigure, PeriodWindow, SnapshotSource,
    };
    pub use crate::alerts::{AlertEngine, AlertKind, AlertReport};
    pub use crate::batch::{BatchCollector, BatchOutcome, BatchRunner, EntityObservations};
    pub use crate::config::EngineConfig;
    pub use crate::core::{EntityKey, Series, TimeSeriesPoint};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::Forecaster;
    pub use crate::selection::{ModelSelection, ModelSelector};
    pub use crate::transform::prepare_series;
}
