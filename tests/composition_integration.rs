//! Batch forecasts flowing into the store and out through the composer.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use demand_forecast::adjustment::{
    compose_from_source, manual_input_history, Adjustment, AdjustmentType, HistoryPoint,
    HistorySource, InMemoryStore, KeyFigure, PeriodWindow, SnapshotSource,
};
use demand_forecast::batch::{BatchRunner, EntityObservations};
use demand_forecast::config::EngineConfig;
use demand_forecast::core::{EntityKey, TimeSeriesPoint};

fn ymd(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

fn load_history(store: &InMemoryStore, key: &EntityKey, values: &[(NaiveDate, f64)]) {
    for (period, value) in values {
        store.put_history(HistoryPoint {
            entity: key.clone(),
            period: *period,
            key_figure: KeyFigure::Sales,
            value: Some(*value),
        });
    }
}

#[test]
fn batch_output_composes_with_adjustments() {
    let key = EntityKey::new("SKU-9", "C-1");
    let sales = [(ymd(2024, 1), 10.0), (ymd(2024, 2), 12.0), (ymd(2024, 3), 11.2)];

    let runner = BatchRunner::new(EngineConfig::default().with_horizon(3))
        .with_current_month(ymd(2024, 4));
    let observations = sales
        .iter()
        .map(|(p, v)| TimeSeriesPoint::new(*p, *v))
        .collect();
    let outcome = runner.run(&[EntityObservations::new(key.clone(), observations)]);
    assert!(outcome.is_complete());

    let store = InMemoryStore::new();
    load_history(&store, &key, &sales);
    store.append_stat_forecast(outcome.collector.stat_forecast_points().cloned());
    store
        .upsert_adjustment(Adjustment::new(
            key.clone(),
            ymd(2024, 4),
            KeyFigure::FinalForecast,
            AdjustmentType::Quantity,
            10.0,
        ))
        .unwrap();
    store
        .upsert_adjustment(Adjustment::new(
            key.clone(),
            ymd(2024, 4),
            KeyFigure::FinalForecast,
            AdjustmentType::Percentage,
            5.0,
        ))
        .unwrap();
    store
        .upsert_adjustment(
            Adjustment::new(
                key.clone(),
                ymd(2024, 5),
                KeyFigure::FinalForecast,
                AdjustmentType::Override,
                250.0,
            )
            .with_comment("promotion"),
        )
        .unwrap();

    let composed = compose_from_source(&store, &key, ymd(2024, 1), ymd(2024, 7)).unwrap();
    let values: Vec<_> = composed.iter().map(|p| p.value).collect();

    // Naive forecast of 11.2 is stored as 12 units.
    assert_eq!(values[..3], [Some(10.0), Some(12.0), Some(11.2)]);
    assert_relative_eq!(values[3].unwrap(), (12.0 + 10.0) * 1.05, epsilon = 1e-9);
    assert_eq!(values[4], Some(250.0));
    assert_eq!(values[5], Some(12.0));
    assert_eq!(values[6], None);
}

#[test]
fn rerun_replaces_the_statistical_base() {
    let key = EntityKey::new("SKU-3", "C-2");
    let store = InMemoryStore::new();
    let runner = BatchRunner::new(EngineConfig::default().with_horizon(2))
        .with_current_month(ymd(2024, 3));

    for value in [5.0, 8.0] {
        let outcome = runner.run(&[EntityObservations::new(
            key.clone(),
            vec![TimeSeriesPoint::new(ymd(2024, 2), value)],
        )]);
        store.append_stat_forecast(outcome.collector.stat_forecast_points().cloned());
    }
    // Two runs, each with the client and the product total.
    assert_eq!(store.stat_forecast_len(), 8);

    let composed = compose_from_source(&store, &key, ymd(2024, 3), ymd(2024, 4)).unwrap();
    assert!(composed.iter().all(|p| p.value == Some(8.0)));
}

#[test]
fn manual_input_history_reads_overrides_from_the_snapshot() {
    let key = EntityKey::new("SKU-5", "C-3");
    let store = InMemoryStore::new();
    load_history(&store, &key, &[(ymd(2023, 11), 40.0), (ymd(2023, 12), 45.0)]);
    store
        .upsert_adjustment(Adjustment::new(
            key.clone(),
            ymd(2023, 12),
            KeyFigure::ManualInput,
            AdjustmentType::Override,
            41.0,
        ))
        .unwrap();

    let window = PeriodWindow::new(ymd(2023, 11), ymd(2023, 12)).unwrap();
    let snapshot = store.snapshot(&key, &window).unwrap();
    let rows = manual_input_history(&key, &window, HistorySource::Sales, &snapshot);
    let values: Vec<_> = rows.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![Some(40.0), Some(41.0)]);

    let composed = compose_from_source(&store, &key, ymd(2023, 11), ymd(2023, 12)).unwrap();
    // The override adjusts the final value even without a stored manual-input row.
    assert_eq!(composed[1].value, Some(41.0));
}
