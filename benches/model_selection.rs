//! Benchmarks for candidate evaluation and batch forecasting.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use demand_forecast::batch::{BatchRunner, EntityObservations};
use demand_forecast::config::EngineConfig;
use demand_forecast::core::{EntityKey, Series, TimeSeriesPoint};
use demand_forecast::selection::ModelSelector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_demand(n: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let season = 15.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin();
            100.0 + 0.8 * i as f64 + season + rng.gen_range(-4.0..4.0_f64)
        })
        .collect()
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_selection");
    group.sample_size(10);
    let selector = ModelSelector::new(EngineConfig::default());
    let key = EntityKey::new("SKU", "C");
    let mut rng = StdRng::seed_from_u64(42);

    for size in [24, 48, 96] {
        let series = Series::monthly(start(), generate_demand(size, &mut rng)).unwrap();
        group.bench_with_input(BenchmarkId::new("select", size), &series, |b, s| {
            b.iter(|| selector.select(black_box(&key), black_box(s)))
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(10);
    let mut rng = StdRng::seed_from_u64(7);
    let groups: Vec<EntityObservations> = (0..16)
        .map(|i| {
            let observations = Series::monthly(start(), generate_demand(36, &mut rng))
                .unwrap()
                .points()
                .collect::<Vec<TimeSeriesPoint>>();
            EntityObservations::new(EntityKey::new(format!("SKU{}", i / 4), format!("C{i}")), observations)
        })
        .collect();
    let runner = BatchRunner::new(EngineConfig::default());

    group.bench_function("run_16_entities", |b| b.iter(|| runner.run(black_box(&groups))));
    group.finish();
}

criterion_group!(benches, bench_selection, bench_batch);
criterion_main!(benches);
