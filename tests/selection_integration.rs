//! End-to-end model selection on noisy generated demand.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use demand_forecast::alerts::{AlertEngine, AlertKind};
use demand_forecast::config::EngineConfig;
use demand_forecast::core::{EntityKey, Series};
use demand_forecast::models::ModelKind;
use demand_forecast::selection::{CandidateScore, ModelSelector, SeriesClass, CROSTON};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn seasonal_demand(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let season = 20.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin();
            let noise: f64 = rng.gen_range(-5.0..5.0);
            200.0 + 1.5 * i as f64 + season + noise
        })
        .collect()
}

fn sparse_demand(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            if i % 4 == 0 {
                rng.gen_range(5.0..30.0_f64).round()
            } else {
                0.0
            }
        })
        .collect()
}

fn series(values: Vec<f64>) -> Series {
    Series::monthly(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), values).unwrap()
}

#[test]
fn regular_series_scores_every_candidate() {
    let selector = ModelSelector::new(EngineConfig::default());
    let history = series(seasonal_demand(48, 7));
    let selection = selector
        .select(&EntityKey::new("SKU-42", "North"), &history)
        .unwrap();

    assert_eq!(selection.class, SeriesClass::Regular);
    assert_eq!(selection.forecast.len(), 24);
    assert!(selection.forecast.iter().all(|v| v.is_finite()));
    for kind in ModelKind::ALL {
        match &selection.candidate_scores[kind.name()] {
            CandidateScore::Mape(score) => assert!(score.is_finite(), "{kind}: {score}"),
            other => panic!("{kind} was not scored: {other:?}"),
        }
    }

    let report = AlertEngine::default().evaluate(&selection, &history);
    assert_eq!(report.to_map().len(), AlertKind::ALL.len());
}

#[test]
fn sarima_scores_three_and_four_years_of_history() {
    for n in [36, 48] {
        let selector = ModelSelector::new(EngineConfig::default().with_horizon(12));
        let history = series(seasonal_demand(n, 19));
        let selection = selector
            .select(&EntityKey::new("SKU-8", "West"), &history)
            .unwrap();

        let score = &selection.candidate_scores[ModelKind::Sarima.name()];
        assert!(
            matches!(score, CandidateScore::Mape(v) if v.is_finite() && *v < 1.0),
            "n = {n}: {score:?}"
        );
    }
}

#[test]
fn sparse_series_routes_to_croston() {
    let selector = ModelSelector::new(EngineConfig::default().with_horizon(6));
    let history = series(sparse_demand(36, 11));
    let selection = selector
        .select(&EntityKey::new("SKU-7", "South"), &history)
        .unwrap();

    assert_eq!(selection.chosen_model, CROSTON);
    assert_eq!(selection.forecast.len(), 6);
    assert!(selection.forecast.iter().all(|v| *v >= 0.0));
    assert_relative_eq!(selection.forecast[0], selection.forecast[5]);

    let report = AlertEngine::default().evaluate(&selection, &history);
    assert_eq!(report.message(AlertKind::Fallback), "Model used: Croston");
}

#[test]
fn selection_is_deterministic() {
    let selector = ModelSelector::new(EngineConfig::default().with_horizon(12));
    let history = series(seasonal_demand(36, 3));
    let key = EntityKey::new("SKU-1", "East");
    let first = selector.select(&key, &history).unwrap();
    let second = selector.select(&key, &history).unwrap();
    assert_eq!(first.chosen_model, second.chosen_model);
    assert_eq!(first.forecast, second.forecast);
}
