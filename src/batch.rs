//! Batch forecasting over many entities.
//!
//! Every product/client group is forecast on its own, then every product is
//! forecast again from the sum of its clients under the `"ALL"` client.
//! Entities run in parallel; each worker fills its own [`BatchCollector`]
//! and the partial collectors are merged on the calling thread. A failing
//! entity is logged and reported in [`BatchOutcome::failures`] without
//! stopping the rest of the batch. Input groups that already use the
//! `"ALL"` client are reported as failures instead of being forecast, so
//! they never shadow a product total.

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, info};

use crate::adjustment::{ForecastRun, HistorySource, StatForecastPoint};
use crate::alerts::{AlertEngine, AlertReport};
use crate::config::EngineConfig;
use crate::core::{period, EntityKey, Series, TimeSeriesPoint, ALL_CLIENTS};
use crate::error::{ForecastError, Result};
use crate::selection::{forecast_start, to_quantity, ModelSelection, ModelSelector};
use crate::transform::prepare_series;

/// Aggregation level of a forecast entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregationLevel {
    ProductClient,
    Product,
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationLevel::ProductClient => f.write_str("product/client"),
            AggregationLevel::Product => f.write_str("product"),
        }
    }
}

/// Raw observations of one product/client group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityObservations {
    pub key: EntityKey,
    pub observations: Vec<TimeSeriesPoint>,
}

impl EntityObservations {
    pub fn new(key: EntityKey, observations: Vec<TimeSeriesPoint>) -> Self {
        Self { key, observations }
    }
}

/// Everything produced for one entity in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityForecast {
    pub key: EntityKey,
    pub level: AggregationLevel,
    pub history: Series,
    pub selection: ModelSelection,
    pub alerts: AlertReport,
    pub run: ForecastRun,
    /// Statistical forecast rows in whole non-negative quantities.
    pub points: Vec<StatForecastPoint>,
}

impl EntityForecast {
    /// Report row summarising the model choice and alerts.
    pub fn selection_record(&self) -> SelectionRecord {
        SelectionRecord {
            level: self.level,
            product: self.key.product.clone(),
            client: self.key.client.clone(),
            best_model: self.selection.chosen_model.clone(),
            best_score: self.selection.has_score().then_some(self.selection.chosen_score),
            candidate_scores: self
                .selection
                .candidate_scores
                .iter()
                .map(|(name, score)| (name.clone(), score.to_string()))
                .collect(),
            alerts: self.alerts.to_map(),
        }
    }
}

/// One row of the model-selection report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionRecord {
    pub level: AggregationLevel,
    pub product: String,
    pub client: String,
    pub best_model: String,
    /// `None` when the model has no cross-validated score.
    pub best_score: Option<f64>,
    pub candidate_scores: BTreeMap<String, String>,
    pub alerts: BTreeMap<String, String>,
}

/// Results of one batch, keyed by entity.
#[derive(Debug, Clone, Default)]
pub struct BatchCollector {
    forecasts: BTreeMap<EntityKey, EntityForecast>,
}

impl BatchCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a forecast, replacing an earlier one of the same entity.
    pub fn push(&mut self, forecast: EntityForecast) -> Option<EntityForecast> {
        self.forecasts.insert(forecast.key.clone(), forecast)
    }

    /// Move every forecast of `other` into `self`.
    pub fn merge(&mut self, other: BatchCollector) {
        self.forecasts.extend(other.forecasts);
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntityForecast> {
        self.forecasts.get(key)
    }

    pub fn len(&self) -> usize {
        self.forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }

    /// Forecasts in entity order.
    pub fn forecasts(&self) -> impl Iterator<Item = &EntityForecast> {
        self.forecasts.values()
    }

    pub fn at_level(&self, level: AggregationLevel) -> impl Iterator<Item = &EntityForecast> {
        self.forecasts.values().filter(move |f| f.level == level)
    }

    /// Statistical forecast rows of every entity, ready to persist.
    pub fn stat_forecast_points(&self) -> impl Iterator<Item = &StatForecastPoint> {
        self.forecasts.values().flat_map(|f| f.points.iter())
    }

    pub fn selection_records(&self) -> Vec<SelectionRecord> {
        self.forecasts.values().map(EntityForecast::selection_record).collect()
    }

    /// The model-selection report as a JSON array.
    pub fn selection_report_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.selection_records())?)
    }

    pub fn into_forecasts(self) -> Vec<EntityForecast> {
        self.forecasts.into_values().collect()
    }
}

/// An entity whose forecast could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub key: EntityKey,
    pub level: AggregationLevel,
    pub error: ForecastError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub collector: BatchCollector,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    fn merge(mut self, other: BatchOutcome) -> Self {
        self.collector.merge(other.collector);
        self.failures.extend(other.failures);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the prepare, select, alert and tagging pipeline for many entities.
///
/// # Example
/// ```
/// use demand_forecast::batch::{BatchRunner, EntityObservations};
/// use demand_forecast::config::EngineConfig;
/// use demand_forecast::core::{EntityKey, TimeSeriesPoint};
/// use chrono::NaiveDate;
///
/// let month = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
/// let groups = vec![
///     EntityObservations::new(EntityKey::new("SKU1", "C1"), vec![TimeSeriesPoint::new(month(1), 4.0)]),
///     EntityObservations::new(EntityKey::new("SKU1", "C2"), vec![TimeSeriesPoint::new(month(1), 6.0)]),
/// ];
/// let runner = BatchRunner::new(EngineConfig::default().with_horizon(2))
///     .with_current_month(month(2));
/// let outcome = runner.run(&groups);
///
/// assert!(outcome.is_complete());
/// let total = outcome.collector.get(&EntityKey::product_total("SKU1")).unwrap();
/// assert_eq!(total.selection.forecast, vec![10.0, 10.0]);
/// ```
#[derive(Debug)]
pub struct BatchRunner {
    selector: ModelSelector,
    alerts: AlertEngine,
    source: HistorySource,
    current_month: NaiveDate,
}

impl BatchRunner {
    pub fn new(config: EngineConfig) -> Self {
        let alerts = AlertEngine::new(config.alerts.clone());
        Self {
            selector: ModelSelector::new(config),
            alerts,
            source: HistorySource::default(),
            current_month: period::month_start(Utc::now().date_naive()),
        }
    }

    pub fn with_selector(mut self, selector: ModelSelector) -> Self {
        self.selector = selector;
        self
    }

    /// History the observations come from; selects the stat-forecast key figure.
    pub fn with_source(mut self, source: HistorySource) -> Self {
        self.source = source;
        self
    }

    /// Earliest month a forecast may start at. Defaults to the current month.
    pub fn with_current_month(mut self, month: NaiveDate) -> Self {
        self.current_month = period::month_start(month);
        self
    }

    /// Forecast every group and every product total.
    pub fn run(&self, groups: &[EntityObservations]) -> BatchOutcome {
        let (reserved, groups): (Vec<&EntityObservations>, Vec<&EntityObservations>) =
            groups.iter().partition(|g| g.key.is_product_total());
        let rejected: Vec<BatchFailure> = reserved
            .into_iter()
            .map(|g| {
                let err = ForecastError::InvalidParameter(format!(
                    "client name {ALL_CLIENTS:?} is reserved for product totals"
                ));
                error!(entity = %g.key, error = %err, "input group rejected");
                BatchFailure {
                    key: g.key.clone(),
                    level: AggregationLevel::ProductClient,
                    error: err,
                }
            })
            .collect();

        let mut work: Vec<(EntityKey, AggregationLevel, Vec<TimeSeriesPoint>)> = groups
            .iter()
            .map(|g| (g.key.clone(), AggregationLevel::ProductClient, g.observations.clone()))
            .collect();
        work.extend(
            product_totals(&groups)
                .into_iter()
                .map(|(key, obs)| (key, AggregationLevel::Product, obs)),
        );

        let mut outcome = work
            .par_iter()
            .fold(BatchOutcome::default, |mut acc, (key, level, observations)| {
                match self.forecast_entity(key, *level, observations) {
                    Ok(forecast) => {
                        acc.collector.push(forecast);
                    }
                    Err(err) => {
                        error!(entity = %key, level = %level, error = %err, "entity forecast failed");
                        acc.failures.push(BatchFailure {
                            key: key.clone(),
                            level: *level,
                            error: err,
                        });
                    }
                }
                acc
            })
            .reduce(BatchOutcome::default, BatchOutcome::merge);
        outcome.failures.extend(rejected);

        info!(
            entities = work.len(),
            forecasts = outcome.collector.len(),
            failures = outcome.failures.len(),
            "batch finished"
        );
        outcome
    }

    /// Run the pipeline for a single entity.
    pub fn forecast_entity(
        &self,
        key: &EntityKey,
        level: AggregationLevel,
        observations: &[TimeSeriesPoint],
    ) -> Result<EntityForecast> {
        let history = prepare_series(observations)?;
        let selection = self.selector.select(key, &history)?;
        let alerts = self.alerts.evaluate(&selection, &history);
        let run = ForecastRun::new(selection.chosen_model.clone(), selection.smoothing_alpha);

        let start = forecast_start(&history, self.current_month)?;
        let key_figure = self.source.stat_forecast_key_figure();
        let points = period::months_from(start, selection.forecast.len())
            .into_iter()
            .zip(selection.forecast.iter())
            .map(|(period, value)| StatForecastPoint {
                entity: key.clone(),
                period,
                key_figure,
                value: to_quantity(*value),
                run_id: run.run_id,
                created_at: run.created_at,
            })
            .collect();

        Ok(EntityForecast {
            key: key.clone(),
            level,
            history,
            selection,
            alerts,
            run,
            points,
        })
    }
}

/// Observations of every product across all its clients.
fn product_totals(groups: &[&EntityObservations]) -> BTreeMap<EntityKey, Vec<TimeSeriesPoint>> {
    let mut totals: BTreeMap<EntityKey, Vec<TimeSeriesPoint>> = BTreeMap::new();
    for group in groups {
        totals
            .entry(EntityKey::product_total(group.key.product.clone()))
            .or_default()
            .extend(group.observations.iter().copied());
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::KeyFigure;
    use crate::selection::NAIVE_INSUFFICIENT;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn group(product: &str, client: &str, values: &[f64]) -> EntityObservations {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint::new(ymd(2024, i as u32 + 1), *v))
            .collect();
        EntityObservations::new(EntityKey::new(product, client), observations)
    }

    fn runner() -> BatchRunner {
        BatchRunner::new(EngineConfig::default().with_horizon(3)).with_current_month(ymd(2024, 7))
    }

    #[test]
    fn forecasts_both_levels() {
        let groups = vec![
            group("A", "C1", &[1.0, 2.0, 3.0]),
            group("A", "C2", &[2.0, 2.0, 2.5]),
            group("B", "C1", &[4.0, 4.0]),
        ];
        let outcome = runner().run(&groups);

        assert!(outcome.is_complete());
        assert_eq!(outcome.collector.len(), 5);
        assert_eq!(outcome.collector.at_level(AggregationLevel::Product).count(), 2);

        let total = outcome.collector.get(&EntityKey::product_total("A")).unwrap();
        assert_eq!(total.history.values(), &[3.0, 4.0, 5.5]);
        assert_eq!(total.selection.chosen_model, NAIVE_INSUFFICIENT);
    }

    #[test]
    fn points_are_tagged_quantities_from_the_current_month() {
        let outcome = runner().run(&[group("A", "C1", &[1.0, 2.0, 2.4])]);
        let forecast = outcome.collector.get(&EntityKey::new("A", "C1")).unwrap();

        let periods: Vec<_> = forecast.points.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![ymd(2024, 7), ymd(2024, 8), ymd(2024, 9)]);
        assert!(forecast.points.iter().all(|p| p.value == 3.0));
        assert!(forecast.points.iter().all(|p| p.run_id == forecast.run.run_id));
        assert!(forecast
            .points
            .iter()
            .all(|p| p.key_figure == KeyFigure::StatForecastSales));
        assert_eq!(forecast.run.model_used, NAIVE_INSUFFICIENT);
    }

    #[test]
    fn orders_source_tags_order_forecasts() {
        let outcome = runner()
            .with_source(HistorySource::Orders)
            .run(&[group("A", "C1", &[5.0])]);
        assert!(outcome
            .collector
            .stat_forecast_points()
            .all(|p| p.key_figure == KeyFigure::StatForecastOrders));
    }

    #[test]
    fn failing_entity_does_not_stop_the_batch() {
        let groups = vec![
            group("A", "C1", &[1.0, f64::NAN, 3.0]),
            group("B", "C1", &[1.0, 2.0]),
        ];
        let outcome = runner().run(&groups);

        let mut failed: Vec<_> = outcome.failures.iter().map(|f| f.key.clone()).collect();
        failed.sort();
        assert_eq!(failed, vec![EntityKey::product_total("A"), EntityKey::new("A", "C1")]);
        assert!(outcome
            .failures
            .iter()
            .all(|f| matches!(f.error, ForecastError::InvalidObservation { .. })));
        assert!(outcome.collector.get(&EntityKey::new("B", "C1")).is_some());
        assert!(outcome.collector.get(&EntityKey::product_total("B")).is_some());
    }

    #[test]
    fn reserved_client_name_is_reported_not_merged() {
        let groups = vec![
            group("A", "C1", &[1.0, 2.0, 3.0]),
            group("A", "ALL", &[100.0, 100.0, 100.0]),
        ];
        let outcome = runner().run(&groups);

        assert_eq!(outcome.failures.len(), 1);
        let failure = &outcome.failures[0];
        assert_eq!(failure.key, EntityKey::product_total("A"));
        assert_eq!(failure.level, AggregationLevel::ProductClient);
        assert!(matches!(failure.error, ForecastError::InvalidParameter(_)));

        // the product total is built from C1 only
        let total = outcome.collector.get(&EntityKey::product_total("A")).unwrap();
        assert_eq!(total.level, AggregationLevel::Product);
        assert_eq!(total.history.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(outcome.collector.len(), 2);
    }

    #[test]
    fn empty_history_yields_no_data_forecast() {
        let outcome = runner().run(&[group("A", "C1", &[0.0, 0.0])]);
        let forecast = outcome.collector.get(&EntityKey::new("A", "C1")).unwrap();
        assert!(forecast.history.is_empty());
        assert_eq!(forecast.selection.forecast, vec![0.0; 3]);
        assert_eq!(forecast.points[0].period, ymd(2024, 7));
    }

    #[test]
    fn selection_report_lists_every_entity() {
        let outcome = runner().run(&[group("A", "C1", &[2.0, 3.0])]);
        let records = outcome.collector.selection_records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.best_score.is_none()));
        assert_eq!(
            records[0].alerts["Fallback Alert"],
            format!("Model used: {NAIVE_INSUFFICIENT}")
        );
        assert_eq!(
            records[0].candidate_scores["Naive"],
            "Insufficient observations"
        );

        let json = outcome.collector.selection_report_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[0]["best_model"], NAIVE_INSUFFICIENT);
    }

    #[test]
    fn collectors_merge() {
        let mut left = runner().run(&[group("A", "C1", &[1.0])]).collector;
        let right = runner().run(&[group("B", "C1", &[1.0])]).collector;
        left.merge(right);
        assert_eq!(left.len(), 4);
        assert_eq!(left.into_forecasts().len(), 4);
    }
}
