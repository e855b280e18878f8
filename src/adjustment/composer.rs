//! Final forecast composition.
//!
//! A period is historical when it precedes the first statistical forecast
//! period in the snapshot (or when there is no statistical forecast at all).
//! Its base value is the manual-input history if present, else raw sales.
//! Forecast periods use the sum of the statistical sales and orders
//! forecasts that are present. Adjustments are then applied to the base,
//! first matching rule wins:
//!
//! 1. an override on the final forecast or manual input replaces the value
//!    (final forecast takes precedence over manual input);
//! 2. in forecast periods, an override on the statistical sales forecast,
//!    then one on the statistical orders forecast, replaces the value;
//! 3. a quantity delta is added, then a percentage is applied as
//!    `value · (1 + pct / 100)`;
//! 4. otherwise the base is kept.
//!
//! Periods without a base value compose to `None` and ignore adjustments.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::adjustment::snapshot::{CompositionSnapshot, SnapshotSource};
use crate::adjustment::types::{
    AdjustmentType, FinalForecastPoint, HistoryPoint, HistorySource, KeyFigure, PeriodWindow,
    StatForecastPoint,
};
use crate::core::EntityKey;
use crate::error::Result;

type AdjustmentIndex = BTreeMap<(NaiveDate, KeyFigure, AdjustmentType), f64>;

/// Compose the final forecast of every month in `window`.
///
/// # Example
/// ```
/// use demand_forecast::adjustment::{
///     compose_final_forecast, Adjustment, AdjustmentType, CompositionSnapshot, HistoryPoint,
///     KeyFigure, PeriodWindow,
/// };
/// use demand_forecast::core::EntityKey;
/// use chrono::NaiveDate;
///
/// let key = EntityKey::new("SKU1", "C1");
/// let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let snapshot = CompositionSnapshot {
///     history: vec![HistoryPoint { entity: key.clone(), period: jan, key_figure: KeyFigure::Sales, value: Some(100.0) }],
///     stat_forecast: vec![],
///     adjustments: vec![
///         Adjustment::new(key.clone(), jan, KeyFigure::FinalForecast, AdjustmentType::Quantity, 10.0),
///         Adjustment::new(key.clone(), jan, KeyFigure::FinalForecast, AdjustmentType::Percentage, 5.0),
///     ],
/// };
/// let window = PeriodWindow::new(jan, jan).unwrap();
/// let composed = compose_final_forecast(&key, &window, &snapshot);
/// assert!((composed[0].value.unwrap() - 115.5).abs() < 1e-9);
/// ```
pub fn compose_final_forecast(
    entity: &EntityKey,
    window: &PeriodWindow,
    snapshot: &CompositionSnapshot,
) -> Vec<FinalForecastPoint> {
    let stat = latest_stat_forecast(entity, window, &snapshot.stat_forecast);
    let forecast_start = stat.keys().map(|(period, _)| *period).min();
    let history = history_index(entity, window, &snapshot.history);
    let adjustments = adjustment_index(entity, window, snapshot);

    window
        .periods()
        .into_iter()
        .map(|period| {
            let historical = forecast_start.map_or(true, |start| period < start);
            let base = if historical {
                history
                    .get(&(period, KeyFigure::ManualInput))
                    .or_else(|| history.get(&(period, KeyFigure::Sales)))
                    .copied()
            } else {
                let sales = stat.get(&(period, KeyFigure::StatForecastSales)).map(|p| p.value);
                let orders = stat.get(&(period, KeyFigure::StatForecastOrders)).map(|p| p.value);
                match (sales, orders) {
                    (None, None) => None,
                    (s, o) => Some(s.unwrap_or(0.0) + o.unwrap_or(0.0)),
                }
            };

            let value = base.map(|base| apply_adjustments(period, base, historical, &adjustments));
            debug!(entity = %entity, %period, historical, ?base, ?value, "composed period");
            FinalForecastPoint { period, value }
        })
        .collect()
}

/// Build the window and read one snapshot from `source` before composing.
pub fn compose_from_source<S: SnapshotSource + ?Sized>(
    source: &S,
    entity: &EntityKey,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<FinalForecastPoint>> {
    let window = PeriodWindow::new(start, end)?;
    let snapshot = source.snapshot(entity, &window)?;
    Ok(compose_final_forecast(entity, &window, &snapshot))
}

/// Raw history of `source` with manual-input overrides substituted.
///
/// Periods without a raw value are skipped. The returned rows carry the
/// manual-input key figure and are ordered by period.
pub fn manual_input_history(
    entity: &EntityKey,
    window: &PeriodWindow,
    source: HistorySource,
    snapshot: &CompositionSnapshot,
) -> Vec<HistoryPoint> {
    let adjustments = adjustment_index(entity, window, snapshot);
    let raw_figure = source.history_key_figure();

    let mut rows: Vec<HistoryPoint> = snapshot
        .history
        .iter()
        .filter(|h| &h.entity == entity && h.key_figure == raw_figure && window.contains(h.period))
        .filter_map(|h| {
            let raw = h.value?;
            let value = adjustments
                .get(&(h.period, KeyFigure::ManualInput, AdjustmentType::Override))
                .copied()
                .unwrap_or(raw);
            Some(HistoryPoint {
                entity: entity.clone(),
                period: h.period,
                key_figure: KeyFigure::ManualInput,
                value: Some(value),
            })
        })
        .collect();
    rows.sort_by_key(|h| h.period);
    rows
}

fn apply_adjustments(
    period: NaiveDate,
    base: f64,
    historical: bool,
    adjustments: &AdjustmentIndex,
) -> f64 {
    let lookup = |figure: KeyFigure, kind: AdjustmentType| adjustments.get(&(period, figure, kind)).copied();
    let final_target = |kind: AdjustmentType| {
        lookup(KeyFigure::FinalForecast, kind).or_else(|| lookup(KeyFigure::ManualInput, kind))
    };

    if let Some(value) = final_target(AdjustmentType::Override) {
        return value;
    }
    if !historical {
        let stat_override = lookup(KeyFigure::StatForecastSales, AdjustmentType::Override)
            .or_else(|| lookup(KeyFigure::StatForecastOrders, AdjustmentType::Override));
        if let Some(value) = stat_override {
            return value;
        }
    }

    let mut value = base;
    if let Some(delta) = final_target(AdjustmentType::Quantity) {
        value += delta;
    }
    if let Some(pct) = final_target(AdjustmentType::Percentage) {
        value *= 1.0 + pct / 100.0;
    }
    value
}

/// The statistical forecast row per `(period, key figure)` from the most
/// recently created run.
fn latest_stat_forecast<'a>(
    entity: &EntityKey,
    window: &PeriodWindow,
    rows: &'a [StatForecastPoint],
) -> BTreeMap<(NaiveDate, KeyFigure), &'a StatForecastPoint> {
    let mut latest: BTreeMap<(NaiveDate, KeyFigure), &StatForecastPoint> = BTreeMap::new();
    for row in rows.iter().filter(|r| {
        &r.entity == entity
            && window.contains(r.period)
            && matches!(
                r.key_figure,
                KeyFigure::StatForecastSales | KeyFigure::StatForecastOrders
            )
            && r.value.is_finite()
    }) {
        latest
            .entry((row.period, row.key_figure))
            .and_modify(|current| {
                if row.created_at >= current.created_at {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    latest
}

fn history_index(
    entity: &EntityKey,
    window: &PeriodWindow,
    rows: &[HistoryPoint],
) -> BTreeMap<(NaiveDate, KeyFigure), f64> {
    rows.iter()
        .filter(|h| &h.entity == entity && window.contains(h.period))
        .filter_map(|h| h.value.map(|v| ((h.period, h.key_figure), v)))
        .collect()
}

fn adjustment_index(
    entity: &EntityKey,
    window: &PeriodWindow,
    snapshot: &CompositionSnapshot,
) -> AdjustmentIndex {
    snapshot
        .adjustments
        .iter()
        .filter(|a| &a.entity == entity && window.contains(a.period))
        .map(|a| ((a.period, a.key_figure, a.adjustment_type), a.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::types::Adjustment;
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn key() -> EntityKey {
        EntityKey::new("SKU-1", "C-1")
    }

    fn history(period: NaiveDate, figure: KeyFigure, value: f64) -> HistoryPoint {
        HistoryPoint {
            entity: key(),
            period,
            key_figure: figure,
            value: Some(value),
        }
    }

    fn stat(period: NaiveDate, figure: KeyFigure, value: f64) -> StatForecastPoint {
        StatForecastPoint {
            entity: key(),
            period,
            key_figure: figure,
            value,
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn adj(period: NaiveDate, figure: KeyFigure, kind: AdjustmentType, value: f64) -> Adjustment {
        Adjustment::new(key(), period, figure, kind, value)
    }

    fn window(start: NaiveDate, end: NaiveDate) -> PeriodWindow {
        PeriodWindow::new(start, end).unwrap()
    }

    #[test]
    fn quantity_then_percentage() {
        let snapshot = CompositionSnapshot {
            stat_forecast: vec![stat(ymd(2025, 1), KeyFigure::StatForecastSales, 100.0)],
            adjustments: vec![
                adj(ymd(2025, 1), KeyFigure::FinalForecast, AdjustmentType::Percentage, 5.0),
                adj(ymd(2025, 1), KeyFigure::FinalForecast, AdjustmentType::Quantity, 10.0),
            ],
            ..Default::default()
        };
        let out = compose_final_forecast(&key(), &window(ymd(2025, 1), ymd(2025, 1)), &snapshot);
        assert_relative_eq!(out[0].value.unwrap(), 115.5, epsilon = 1e-9);
    }

    #[test]
    fn override_preempts_quantity_and_percentage() {
        let snapshot = CompositionSnapshot {
            stat_forecast: vec![stat(ymd(2025, 1), KeyFigure::StatForecastSales, 100.0)],
            adjustments: vec![
                adj(ymd(2025, 1), KeyFigure::FinalForecast, AdjustmentType::Override, 250.0),
                adj(ymd(2025, 1), KeyFigure::FinalForecast, AdjustmentType::Quantity, 10.0),
                adj(ymd(2025, 1), KeyFigure::FinalForecast, AdjustmentType::Percentage, 5.0),
            ],
            ..Default::default()
        };
        let out = compose_final_forecast(&key(), &window(ymd(2025, 1), ymd(2025, 1)), &snapshot);
        assert_eq!(out[0].value, Some(250.0));
    }

    #[test]
    fn final_forecast_override_beats_manual_input_override() {
        let snapshot = CompositionSnapshot {
            stat_forecast: vec![stat(ymd(2025, 1), KeyFigure::StatForecastSales, 100.0)],
            adjustments: vec![
                adj(ymd(2025, 1), KeyFigure::ManualInput, AdjustmentType::Override, 90.0),
                adj(ymd(2025, 1), KeyFigure::FinalForecast, AdjustmentType::Override, 80.0),
            ],
            ..Default::default()
        };
        let out = compose_final_forecast(&key(), &window(ymd(2025, 1), ymd(2025, 1)), &snapshot);
        assert_eq!(out[0].value, Some(80.0));
    }

    #[test]
    fn stat_overrides_only_apply_to_forecast_periods() {
        let snapshot = CompositionSnapshot {
            history: vec![history(ymd(2024, 12), KeyFigure::Sales, 40.0)],
            stat_forecast: vec![
                stat(ymd(2025, 1), KeyFigure::StatForecastSales, 100.0),
                stat(ymd(2025, 1), KeyFigure::StatForecastOrders, 20.0),
            ],
            adjustments: vec![
                adj(ymd(2024, 12), KeyFigure::StatForecastSales, AdjustmentType::Override, 1.0),
                adj(ymd(2025, 1), KeyFigure::StatForecastOrders, AdjustmentType::Override, 70.0),
                adj(ymd(2025, 1), KeyFigure::StatForecastSales, AdjustmentType::Override, 60.0),
            ],
        };
        let out = compose_final_forecast(&key(), &window(ymd(2024, 12), ymd(2025, 1)), &snapshot);
        assert_eq!(out[0].value, Some(40.0));
        assert_eq!(out[1].value, Some(60.0));
    }

    #[test]
    fn forecast_base_sums_sales_and_orders() {
        let snapshot = CompositionSnapshot {
            stat_forecast: vec![
                stat(ymd(2025, 1), KeyFigure::StatForecastSales, 100.0),
                stat(ymd(2025, 1), KeyFigure::StatForecastOrders, 20.0),
                stat(ymd(2025, 2), KeyFigure::StatForecastOrders, 30.0),
            ],
            ..Default::default()
        };
        let out = compose_final_forecast(&key(), &window(ymd(2025, 1), ymd(2025, 2)), &snapshot);
        assert_eq!(out[0].value, Some(120.0));
        assert_eq!(out[1].value, Some(30.0));
    }

    #[test]
    fn historical_periods_prefer_manual_input() {
        let snapshot = CompositionSnapshot {
            history: vec![
                history(ymd(2024, 10), KeyFigure::Sales, 50.0),
                history(ymd(2024, 11), KeyFigure::Sales, 55.0),
                history(ymd(2024, 11), KeyFigure::ManualInput, 52.0),
            ],
            stat_forecast: vec![stat(ymd(2025, 1), KeyFigure::StatForecastSales, 100.0)],
            ..Default::default()
        };
        let out = compose_final_forecast(&key(), &window(ymd(2024, 10), ymd(2025, 1)), &snapshot);
        let values: Vec<_> = out.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(50.0), Some(52.0), None, Some(100.0)]);
    }

    #[test]
    fn missing_base_ignores_adjustments() {
        let snapshot = CompositionSnapshot {
            adjustments: vec![adj(ymd(2025, 3), KeyFigure::FinalForecast, AdjustmentType::Override, 9.0)],
            ..Default::default()
        };
        let out = compose_final_forecast(&key(), &window(ymd(2025, 3), ymd(2025, 3)), &snapshot);
        assert_eq!(out, vec![FinalForecastPoint { period: ymd(2025, 3), value: None }]);
    }

    #[test]
    fn latest_run_wins() {
        let mut old = stat(ymd(2025, 1), KeyFigure::StatForecastSales, 10.0);
        old.created_at = Utc::now() - Duration::days(3);
        let new = stat(ymd(2025, 1), KeyFigure::StatForecastSales, 12.0);
        let snapshot = CompositionSnapshot {
            stat_forecast: vec![new, old],
            ..Default::default()
        };
        let out = compose_final_forecast(&key(), &window(ymd(2025, 1), ymd(2025, 1)), &snapshot);
        assert_eq!(out[0].value, Some(12.0));
    }

    #[test]
    fn manual_input_history_applies_overrides() {
        let snapshot = CompositionSnapshot {
            history: vec![
                history(ymd(2024, 2), KeyFigure::Sales, 8.0),
                history(ymd(2024, 1), KeyFigure::Sales, 5.0),
                history(ymd(2024, 1), KeyFigure::Orders, 99.0),
                HistoryPoint {
                    entity: key(),
                    period: ymd(2024, 3),
                    key_figure: KeyFigure::Sales,
                    value: None,
                },
            ],
            adjustments: vec![adj(ymd(2024, 2), KeyFigure::ManualInput, AdjustmentType::Override, 6.0)],
            ..Default::default()
        };
        let rows = manual_input_history(
            &key(),
            &window(ymd(2024, 1), ymd(2024, 3)),
            HistorySource::Sales,
            &snapshot,
        );
        let values: Vec<_> = rows.iter().map(|r| (r.period, r.value)).collect();
        assert_eq!(values, vec![(ymd(2024, 1), Some(5.0)), (ymd(2024, 2), Some(6.0))]);
        assert!(rows.iter().all(|r| r.key_figure == KeyFigure::ManualInput));
    }

    #[test]
    fn reversed_window_is_rejected() {
        let store = crate::adjustment::snapshot::InMemoryStore::new();
        let err = compose_from_source(&store, &key(), ymd(2025, 5), ymd(2025, 1)).unwrap_err();
        assert!(matches!(err, crate::error::ForecastError::InvalidWindow { .. }));
    }
}
