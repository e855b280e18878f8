//! Key figures, adjustments and the rows the composer reads and writes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::{period, EntityKey};
use crate::error::{ForecastError, Result};

/// A named measure row, with the stable ids used by persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyFigure {
    Sales,
    SmoothedSales,
    Orders,
    SmoothedOrders,
    ManualInput,
    StatForecastSales,
    StatForecastOrders,
    FinalForecast,
}

impl KeyFigure {
    pub const ALL: [KeyFigure; 8] = [
        KeyFigure::Sales,
        KeyFigure::SmoothedSales,
        KeyFigure::Orders,
        KeyFigure::SmoothedOrders,
        KeyFigure::ManualInput,
        KeyFigure::StatForecastSales,
        KeyFigure::StatForecastOrders,
        KeyFigure::FinalForecast,
    ];

    pub fn id(self) -> u32 {
        match self {
            KeyFigure::Sales => 1,
            KeyFigure::SmoothedSales => 2,
            KeyFigure::Orders => 3,
            KeyFigure::SmoothedOrders => 4,
            KeyFigure::ManualInput => 5,
            KeyFigure::StatForecastSales => 6,
            KeyFigure::StatForecastOrders => 7,
            KeyFigure::FinalForecast => 8,
        }
    }

    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kf| kf.id() == id)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("unknown key figure id {id}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyFigure::Sales => "Sales",
            KeyFigure::SmoothedSales => "Smoothed Sales",
            KeyFigure::Orders => "Orders",
            KeyFigure::SmoothedOrders => "Smoothed Orders",
            KeyFigure::ManualInput => "Manual input",
            KeyFigure::StatForecastSales => "Statistical forecast Sales",
            KeyFigure::StatForecastOrders => "Statistical forecast Orders",
            KeyFigure::FinalForecast => "Final Forecast",
        }
    }
}

impl fmt::Display for KeyFigure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of manual edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdjustmentType {
    /// Additive delta.
    Quantity,
    /// Multiplier of `1 + value / 100`.
    Percentage,
    /// Replaces the computed value.
    Override,
}

impl AdjustmentType {
    pub fn id(self) -> u32 {
        match self {
            AdjustmentType::Quantity => 1,
            AdjustmentType::Percentage => 2,
            AdjustmentType::Override => 3,
        }
    }

    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            1 => Ok(AdjustmentType::Quantity),
            2 => Ok(AdjustmentType::Percentage),
            3 => Ok(AdjustmentType::Override),
            _ => Err(ForecastError::InvalidParameter(format!(
                "unknown adjustment type id {id}"
            ))),
        }
    }
}

/// Which raw history feeds a forecast run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HistorySource {
    #[default]
    Sales,
    Orders,
}

impl HistorySource {
    /// Key figure of the raw history rows.
    pub fn history_key_figure(self) -> KeyFigure {
        match self {
            HistorySource::Sales => KeyFigure::Sales,
            HistorySource::Orders => KeyFigure::Orders,
        }
    }

    /// Key figure of the statistical forecast produced from this history.
    pub fn stat_forecast_key_figure(self) -> KeyFigure {
        match self {
            HistorySource::Sales => KeyFigure::StatForecastSales,
            HistorySource::Orders => KeyFigure::StatForecastOrders,
        }
    }
}

/// A manual edit of one key figure in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub entity: EntityKey,
    pub period: NaiveDate,
    pub key_figure: KeyFigure,
    pub adjustment_type: AdjustmentType,
    pub value: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Adjustment {
    pub fn new(
        entity: EntityKey,
        period: NaiveDate,
        key_figure: KeyFigure,
        adjustment_type: AdjustmentType,
        value: f64,
    ) -> Self {
        Self {
            entity,
            period,
            key_figure,
            adjustment_type,
            value,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Identity under which at most one adjustment is live.
    pub fn slot(&self) -> AdjustmentSlot {
        AdjustmentSlot {
            entity: self.entity.clone(),
            period: self.period,
            key_figure: self.key_figure,
            adjustment_type: self.adjustment_type,
        }
    }
}

/// `(entity, period, key figure, adjustment type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdjustmentSlot {
    pub entity: EntityKey,
    pub period: NaiveDate,
    pub key_figure: KeyFigure,
    pub adjustment_type: AdjustmentType,
}

/// One stored history value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub entity: EntityKey,
    pub period: NaiveDate,
    pub key_figure: KeyFigure,
    pub value: Option<f64>,
}

/// Provenance of one statistical forecast computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRun {
    pub run_id: Uuid,
    pub model_used: String,
    /// Level smoothing weight, when the run fitted exponential smoothing.
    pub smoothing_parameter: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl ForecastRun {
    /// New run with a random id, stamped now.
    pub fn new(model_used: impl Into<String>, smoothing_parameter: Option<f64>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            model_used: model_used.into(),
            smoothing_parameter,
            created_at: Utc::now(),
        }
    }
}

/// One statistical forecast value, tagged with the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatForecastPoint {
    pub entity: EntityKey,
    pub period: NaiveDate,
    pub key_figure: KeyFigure,
    pub value: f64,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Composed value of one period; `None` when no base value exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalForecastPoint {
    pub period: NaiveDate,
    pub value: Option<f64>,
}

/// Inclusive range of month starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    /// Window over the months of `start` through `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let start = period::month_start(start);
        let end = period::month_start(end);
        if start > end {
            return Err(ForecastError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, period: NaiveDate) -> bool {
        self.start <= period && period <= self.end
    }

    pub fn periods(&self) -> Vec<NaiveDate> {
        period::month_range(self.start, self.end)
    }
}
