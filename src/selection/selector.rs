//! Series routing, cross-validated candidate evaluation and fallbacks.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::core::{EntityKey, Series};
use crate::error::{ForecastError, Result};
use crate::models::baseline::{Naive, WindowAverage};
use crate::models::exponential::{ExponentialSmoothing, SmoothingOutcome};
use crate::models::intermittent::Croston;
use crate::models::{CandidateRegistry, Forecaster, ModelKind, ModelSpec};
use crate::selection::blend::blend_forecasts;
use crate::selection::outcome::{
    ensemble_label, CandidateResult, CandidateScore, ModelSelection, SeriesClass, CROSTON,
    MEAN_FALLBACK, NAIVE_INSUFFICIENT, NO_DATA, SMOOTHING_FALLBACK,
};
use crate::selection::postprocess::replace_non_finite;
use crate::utils::cross_validation::{evaluate_fold, expanding_folds, Fold};

/// Chooses and builds the statistical forecast of a prepared series.
///
/// Routing, first match wins:
/// 1. empty series: zeros, labelled "No Data";
/// 2. fewer than `min_observations` points: the last value repeated;
/// 3. zero share above `intermittent_zero_fraction`: Croston;
/// 4. otherwise every registered candidate is scored by rolling-origin
///    MAPE, refitted on the whole series and blended around the best one.
///
/// # Example
/// ```
/// use demand_forecast::config::EngineConfig;
/// use demand_forecast::core::{EntityKey, Series};
/// use demand_forecast::selection::ModelSelector;
/// use chrono::NaiveDate;
///
/// let selector = ModelSelector::new(EngineConfig::default().with_horizon(3));
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let series = Series::monthly(start, vec![5.0, 7.0, 6.0]).unwrap();
/// let selection = selector.select(&EntityKey::new("SKU1", "C1"), &series).unwrap();
/// assert_eq!(selection.chosen_model, "Naive (Insufficient data)");
/// assert_eq!(selection.forecast, vec![6.0; 3]);
/// ```
#[derive(Debug)]
pub struct ModelSelector {
    config: EngineConfig,
    registry: CandidateRegistry,
}

impl ModelSelector {
    /// Selector with the standard candidates.
    pub fn new(config: EngineConfig) -> Self {
        let registry = CandidateRegistry::standard(&config);
        Self { config, registry }
    }

    /// Replace the candidate registry.
    pub fn with_registry(mut self, registry: CandidateRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &CandidateRegistry {
        &self.registry
    }

    pub fn classify(&self, series: &Series) -> SeriesClass {
        if series.is_empty() {
            SeriesClass::NoData
        } else if series.len() < self.config.min_observations {
            SeriesClass::Insufficient
        } else if series.zero_fraction() > self.config.intermittent_zero_fraction {
            SeriesClass::Intermittent
        } else {
            SeriesClass::Regular
        }
    }

    /// Build the model selection of one entity.
    ///
    /// Non-finite forecast values are replaced by the historical mean.
    pub fn select(&self, entity: &EntityKey, series: &Series) -> Result<ModelSelection> {
        let class = self.classify(series);
        debug!(entity = %entity, points = series.len(), ?class, "routing series");

        let mut selection = match class {
            SeriesClass::NoData => self.no_data(),
            SeriesClass::Insufficient => self.naive(series)?,
            SeriesClass::Intermittent => self.croston(series)?,
            SeriesClass::Regular => self.evaluate(entity, series)?,
        };

        let mean = series.mean();
        let fill = if mean.is_finite() { mean } else { 0.0 };
        let replaced = replace_non_finite(&mut selection.forecast, fill);
        if replaced > 0 {
            warn!(
                entity = %entity,
                model = %selection.chosen_model,
                replaced,
                "non-finite forecast values replaced by the historical mean"
            );
        }
        Ok(selection)
    }

    fn no_data(&self) -> ModelSelection {
        let mut scores = BTreeMap::new();
        scores.insert(
            "No Model".to_string(),
            CandidateScore::Skipped("Insufficient data".to_string()),
        );
        ModelSelection {
            class: SeriesClass::NoData,
            chosen_model: NO_DATA.to_string(),
            chosen_score: f64::INFINITY,
            candidate_scores: scores,
            forecast: vec![0.0; self.config.forecast_horizon],
            smoothing_alpha: None,
        }
    }

    fn naive(&self, series: &Series) -> Result<ModelSelection> {
        let mut model = Naive::new();
        model.fit(series)?;
        let mut scores = BTreeMap::new();
        scores.insert(
            "Naive".to_string(),
            CandidateScore::Skipped("Insufficient observations".to_string()),
        );
        Ok(ModelSelection {
            class: SeriesClass::Insufficient,
            chosen_model: NAIVE_INSUFFICIENT.to_string(),
            chosen_score: f64::INFINITY,
            candidate_scores: scores,
            forecast: model.predict(self.config.forecast_horizon)?,
            smoothing_alpha: None,
        })
    }

    fn croston(&self, series: &Series) -> Result<ModelSelection> {
        let mut model = Croston::new().with_alpha(self.config.croston_alpha);
        model.fit(series)?;
        let mut scores = BTreeMap::new();
        scores.insert(
            "Croston".to_string(),
            CandidateScore::Skipped(format!(
                "Intermittent demand > {:.0}% zeros",
                self.config.intermittent_zero_fraction * 100.0
            )),
        );
        Ok(ModelSelection {
            class: SeriesClass::Intermittent,
            chosen_model: CROSTON.to_string(),
            chosen_score: f64::INFINITY,
            candidate_scores: scores,
            forecast: model.predict(self.config.forecast_horizon)?,
            smoothing_alpha: None,
        })
    }

    /// Score one candidate on `folds`, then refit it on the whole series.
    ///
    /// Folds run in parallel. With a configured budget every model instance
    /// receives the same wall-clock deadline, counted from the start of the
    /// evaluation, and stops iterating once it passes. Being past the
    /// deadline after the folds or after the refit fails the candidate like
    /// any other fit error.
    pub fn evaluate_candidate(
        &self,
        entity: &EntityKey,
        spec: &ModelSpec,
        series: &Series,
        folds: &[Fold],
    ) -> CandidateResult {
        let kind = spec.kind;
        let report = |error: &ForecastError, stage: &str| {
            warn!(entity = %entity, model = kind.name(), stage, error = %error, "candidate failed");
            CandidateResult::failed(kind)
        };

        if folds.is_empty() {
            return report(
                &ForecastError::InsufficientData {
                    needed: self.config.cv_folds + 1,
                    got: series.len(),
                },
                "cross-validation",
            );
        }

        let started = Instant::now();
        let deadline = self.config.candidate_budget().map(|budget| started + budget);
        let instance = || {
            let mut model = spec.create();
            if let Some(deadline) = deadline {
                model.set_deadline(deadline);
            }
            model
        };

        let fold_scores: Vec<_> = folds
            .par_iter()
            .map(|&fold| evaluate_fold(instance().as_mut(), series, fold))
            .collect();

        let mut scores = Vec::with_capacity(fold_scores.len());
        for fold_score in fold_scores {
            debug!(
                entity = %entity,
                model = kind.name(),
                fold = fold_score.fold.index,
                elapsed_ms = fold_score.elapsed.as_millis() as u64,
                "fold scored"
            );
            match fold_score.score {
                Ok(score) => scores.push(score),
                Err(e) => return report(&e, "cross-validation"),
            }
        }
        if let Err(e) = self.check_budget(kind, deadline) {
            return report(&e, "cross-validation");
        }
        let average = scores.iter().sum::<f64>() / scores.len() as f64;

        let mut model = instance();
        let refit = model
            .fit(series)
            .and_then(|_| model.predict(self.config.forecast_horizon));
        match refit.and_then(|f| self.check_budget(kind, deadline).map(|_| f)) {
            Ok(forecast) => CandidateResult {
                kind,
                score: CandidateScore::Mape(average),
                forecast: Some(forecast),
                smoothing_level: model.smoothing_level(),
            },
            Err(e) => report(&e, "refit"),
        }
    }

    fn check_budget(&self, kind: ModelKind, deadline: Option<Instant>) -> Result<()> {
        match (deadline, self.config.candidate_budget()) {
            (Some(deadline), Some(budget)) if Instant::now() > deadline => {
                Err(ForecastError::BudgetExceeded {
                    model: kind.name().to_string(),
                    budget_ms: budget.as_millis() as u64,
                })
            }
            _ => Ok(()),
        }
    }

    fn evaluate(&self, entity: &EntityKey, series: &Series) -> Result<ModelSelection> {
        let folds = expanding_folds(series.len(), self.config.cv_folds);
        let specs: Vec<&ModelSpec> = self.registry.iter().collect();
        let results: Vec<CandidateResult> = specs
            .par_iter()
            .map(|spec| self.evaluate_candidate(entity, spec, series, &folds))
            .collect();

        let candidate_scores: BTreeMap<String, CandidateScore> = results
            .iter()
            .map(|r| (r.name().to_string(), r.score.clone()))
            .collect();

        let mut best: Option<(&CandidateResult, f64, &[f64])> = None;
        for result in &results {
            if let (Some(score), Some(forecast)) = (result.score.value(), result.forecast.as_deref()) {
                if best.map_or(score < f64::INFINITY, |(_, s, _)| score < s) {
                    best = Some((result, score, forecast));
                }
            }
        }

        let smoothing_alpha = results
            .iter()
            .find(|r| r.kind == ModelKind::ExponentialSmoothing)
            .and_then(|r| r.smoothing_level);

        let Some((best_result, best_score, best_forecast)) = best else {
            warn!(entity = %entity, error = %ForecastError::AllCandidatesFailed, "falling back");
            return self.fallback(series, candidate_scores);
        };

        let members: Vec<(&[f64], f64)> = results
            .iter()
            .filter_map(|r| match (r.score.value(), r.forecast.as_deref()) {
                (Some(s), Some(f)) if s.is_finite() && s > 0.0 && f.len() == best_forecast.len() => {
                    Some((f, s))
                }
                _ => None,
            })
            .collect();

        let (chosen_model, forecast) = if members.is_empty() {
            (best_result.name().to_string(), best_forecast.to_vec())
        } else {
            (
                ensemble_label(best_result.name()),
                blend_forecasts(best_forecast, &members, self.config.best_weight)?,
            )
        };
        debug!(
            entity = %entity,
            best = best_result.name(),
            best_score,
            members = members.len(),
            "candidate evaluation finished"
        );

        Ok(ModelSelection {
            class: SeriesClass::Regular,
            chosen_model,
            chosen_score: best_score,
            candidate_scores,
            forecast,
            smoothing_alpha,
        })
    }

    /// Smoothing on the whole series, then the recent mean.
    fn fallback(
        &self,
        series: &Series,
        candidate_scores: BTreeMap<String, CandidateScore>,
    ) -> Result<ModelSelection> {
        let horizon = self.config.forecast_horizon;
        let smoothing = ExponentialSmoothing::new(self.config.seasonal_period)
            .with_fallback_window(self.config.fallback_window);

        let fitted = match smoothing.fit_outcome(series) {
            Ok(SmoothingOutcome::Fitted(model)) => model
                .predict(horizon)
                .ok()
                .map(|forecast| (forecast, model.smoothing_level())),
            Ok(SmoothingOutcome::SeasonalInitFailed { .. }) | Err(_) => None,
        };

        let (chosen_model, forecast, smoothing_alpha) = match fitted {
            Some((forecast, alpha)) => (SMOOTHING_FALLBACK, forecast, alpha),
            None => {
                let mut mean = WindowAverage::new(self.config.fallback_window);
                mean.fit(series)?;
                (MEAN_FALLBACK, mean.predict(horizon)?, None)
            }
        };

        Ok(ModelSelection {
            class: SeriesClass::Regular,
            chosen_model: chosen_model.to_string(),
            chosen_score: f64::INFINITY,
            candidate_scores,
            forecast,
            smoothing_alpha,
        })
    }
}
