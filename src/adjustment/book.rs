//! Live manual adjustments, one per slot.

use std::collections::BTreeMap;

use crate::adjustment::types::{Adjustment, AdjustmentSlot, PeriodWindow};
use crate::core::{period, EntityKey};
use crate::error::{ForecastError, Result};

/// Upsert store of adjustments keyed by
/// `(entity, period, key figure, adjustment type)`.
///
/// # Example
/// ```
/// use demand_forecast::adjustment::{Adjustment, AdjustmentBook, AdjustmentType, KeyFigure};
/// use demand_forecast::core::EntityKey;
/// use chrono::NaiveDate;
///
/// let mut book = AdjustmentBook::new();
/// let period = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// let key = EntityKey::new("SKU1", "C1");
/// let first = Adjustment::new(key.clone(), period, KeyFigure::FinalForecast, AdjustmentType::Quantity, 5.0);
/// let second = Adjustment::new(key, period, KeyFigure::FinalForecast, AdjustmentType::Quantity, 8.0);
///
/// assert!(book.upsert(first).unwrap().is_none());
/// assert_eq!(book.upsert(second).unwrap().map(|a| a.value), Some(5.0));
/// assert_eq!(book.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AdjustmentBook {
    entries: BTreeMap<AdjustmentSlot, Adjustment>,
}

impl AdjustmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the adjustment of its slot, returning the replaced one.
    pub fn upsert(&mut self, adjustment: Adjustment) -> Result<Option<Adjustment>> {
        if !adjustment.value.is_finite() {
            return Err(ForecastError::InvalidParameter(format!(
                "adjustment value must be finite, got {}",
                adjustment.value
            )));
        }
        if !period::is_month_start(adjustment.period) {
            return Err(ForecastError::InvalidPeriod(format!(
                "{} is not the first day of a month",
                adjustment.period
            )));
        }
        Ok(self.entries.insert(adjustment.slot(), adjustment))
    }

    pub fn remove(&mut self, slot: &AdjustmentSlot) -> Option<Adjustment> {
        self.entries.remove(slot)
    }

    pub fn get(&self, slot: &AdjustmentSlot) -> Option<&Adjustment> {
        self.entries.get(slot)
    }

    /// Adjustments of `entity` whose period lies in `window`, in slot order.
    pub fn for_entity(&self, entity: &EntityKey, window: &PeriodWindow) -> Vec<Adjustment> {
        self.entries
            .values()
            .filter(|a| &a.entity == entity && window.contains(a.period))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Adjustment> {
        self.entries.values()
    }
}
