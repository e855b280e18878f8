//! Consistent reads for the composer.

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::adjustment::book::AdjustmentBook;
use crate::adjustment::types::{
    Adjustment, AdjustmentSlot, HistoryPoint, PeriodWindow, StatForecastPoint,
};
use crate::core::EntityKey;
use crate::error::Result;

/// History, statistical forecast and adjustments of one entity, read together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionSnapshot {
    pub history: Vec<HistoryPoint>,
    pub stat_forecast: Vec<StatForecastPoint>,
    pub adjustments: Vec<Adjustment>,
}

/// Supplies composition snapshots.
///
/// One call must return data from a single consistent read so that the
/// composed values never mix states of different writes.
pub trait SnapshotSource {
    fn snapshot(&self, entity: &EntityKey, window: &PeriodWindow) -> Result<CompositionSnapshot>;
}

#[derive(Debug, Default)]
struct StoreState {
    history: Vec<HistoryPoint>,
    stat_forecast: Vec<StatForecastPoint>,
    adjustments: AdjustmentBook,
}

/// In-memory [`SnapshotSource`] guarded by a single reader-writer lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a history value of `(entity, period, key figure)`.
    pub fn put_history(&self, point: HistoryPoint) {
        let mut state = self.state.write();
        match state.history.iter_mut().find(|h| {
            h.entity == point.entity && h.period == point.period && h.key_figure == point.key_figure
        }) {
            Some(existing) => *existing = point,
            None => state.history.push(point),
        }
    }

    /// Append the rows of a forecast run.
    pub fn append_stat_forecast(&self, points: impl IntoIterator<Item = StatForecastPoint>) {
        self.state.write().stat_forecast.extend(points);
    }

    pub fn upsert_adjustment(&self, adjustment: Adjustment) -> Result<Option<Adjustment>> {
        self.state.write().adjustments.upsert(adjustment)
    }

    pub fn remove_adjustment(&self, slot: &AdjustmentSlot) -> Option<Adjustment> {
        self.state.write().adjustments.remove(slot)
    }

    /// Number of stored statistical forecast rows.
    pub fn stat_forecast_len(&self) -> usize {
        self.state.read().stat_forecast.len()
    }
}

impl SnapshotSource for InMemoryStore {
    fn snapshot(&self, entity: &EntityKey, window: &PeriodWindow) -> Result<CompositionSnapshot> {
        let state = self.state.read();
        let in_scope = |e: &EntityKey, p: NaiveDate| e == entity && window.contains(p);
        Ok(CompositionSnapshot {
            history: state
                .history
                .iter()
                .filter(|h| in_scope(&h.entity, h.period))
                .cloned()
                .collect(),
            stat_forecast: state
                .stat_forecast
                .iter()
                .filter(|f| in_scope(&f.entity, f.period))
                .cloned()
                .collect(),
            adjustments: state.adjustments.for_entity(entity, window),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::types::{AdjustmentType, KeyFigure};
    use chrono::Utc;
    use uuid::Uuid;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn snapshot_is_scoped_to_entity_and_window() {
        let store = InMemoryStore::new();
        let key = EntityKey::new("P", "C");
        let other = EntityKey::new("P", "D");
        for (entity, month) in [(&key, 1), (&key, 5), (&other, 1)] {
            store.put_history(HistoryPoint {
                entity: entity.clone(),
                period: ymd(2024, month),
                key_figure: KeyFigure::Sales,
                value: Some(1.0),
            });
        }
        store.append_stat_forecast([StatForecastPoint {
            entity: key.clone(),
            period: ymd(2024, 2),
            key_figure: KeyFigure::StatForecastSales,
            value: 3.0,
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }]);
        store
            .upsert_adjustment(Adjustment::new(
                key.clone(),
                ymd(2024, 2),
                KeyFigure::FinalForecast,
                AdjustmentType::Quantity,
                2.0,
            ))
            .unwrap();

        let window = PeriodWindow::new(ymd(2024, 1), ymd(2024, 3)).unwrap();
        let snapshot = store.snapshot(&key, &window).unwrap();
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.stat_forecast.len(), 1);
        assert_eq!(snapshot.adjustments.len(), 1);
    }

    #[test]
    fn history_is_replaced_in_place() {
        let store = InMemoryStore::new();
        let key = EntityKey::new("P", "C");
        for value in [1.0, 7.0] {
            store.put_history(HistoryPoint {
                entity: key.clone(),
                period: ymd(2024, 1),
                key_figure: KeyFigure::Sales,
                value: Some(value),
            });
        }
        let window = PeriodWindow::new(ymd(2024, 1), ymd(2024, 1)).unwrap();
        let snapshot = store.snapshot(&key, &window).unwrap();
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].value, Some(7.0));
    }
}
