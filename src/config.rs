//! Engine configuration.
//!
//! Every field has a default matching the reference behaviour, so an empty
//! configuration source yields a fully working engine.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{ForecastError, Result};

/// Tunables for model selection, fallbacks and alerting.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of future months to forecast.
    #[serde(default = "default_horizon")]
    pub forecast_horizon: usize,
    /// Series shorter than this use the naive forecast.
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
    /// Share of zero observations above which Croston is used.
    #[serde(default = "default_zero_fraction")]
    pub intermittent_zero_fraction: f64,
    /// Croston smoothing constant.
    #[serde(default = "default_croston_alpha")]
    pub croston_alpha: f64,
    /// Seasonal period of the monthly grid.
    #[serde(default = "default_seasonal_period")]
    pub seasonal_period: usize,
    /// Number of rolling-origin folds.
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Window of the mean-of-last-N fallback.
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,
    /// Weight of the single best candidate in the final blend.
    #[serde(default = "default_best_weight")]
    pub best_weight: f64,
    /// Per-candidate wall-clock budget in milliseconds.
    #[serde(default)]
    pub candidate_budget_ms: Option<u64>,
    #[serde(default)]
    pub alerts: AlertThresholds,
}

/// Thresholds used by the alert engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AlertThresholds {
    /// Cross-validated MAPE above which the high-error alert fires.
    #[serde(default = "default_high_error")]
    pub high_error: f64,
    /// Forecast std / history std ratio below which the forecast is flat.
    #[serde(default = "default_flat_ratio")]
    pub flat_ratio: f64,
    /// Minimum forecast/history slope ratio in the same direction.
    #[serde(default = "default_trend_ratio")]
    pub trend_ratio: f64,
    /// Coefficient of variation of candidate scores above which models disagree.
    #[serde(default = "default_disagreement_cv")]
    pub disagreement_cv: f64,
}

fn default_horizon() -> usize {
    24
}
fn default_min_observations() -> usize {
    12
}
fn default_zero_fraction() -> f64 {
    0.5
}
fn default_croston_alpha() -> f64 {
    0.1
}
fn default_seasonal_period() -> usize {
    12
}
fn default_cv_folds() -> usize {
    3
}
fn default_fallback_window() -> usize {
    6
}
fn default_best_weight() -> f64 {
    0.5
}
fn default_high_error() -> f64 {
    0.30
}
fn default_flat_ratio() -> f64 {
    0.10
}
fn default_trend_ratio() -> f64 {
    0.5
}
fn default_disagreement_cv() -> f64 {
    0.20
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            high_error: default_high_error(),
            flat_ratio: default_flat_ratio(),
            trend_ratio: default_trend_ratio(),
            disagreement_cv: default_disagreement_cv(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            forecast_horizon: default_horizon(),
            min_observations: default_min_observations(),
            intermittent_zero_fraction: default_zero_fraction(),
            croston_alpha: default_croston_alpha(),
            seasonal_period: default_seasonal_period(),
            cv_folds: default_cv_folds(),
            fallback_window: default_fallback_window(),
            best_weight: default_best_weight(),
            candidate_budget_ms: None,
            alerts: AlertThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Load from an optional `demand_forecast.{toml,yaml,json}` file and
    /// `DEMAND__*` environment variables (e.g. `DEMAND__FORECAST_HORIZON=12`).
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("demand_forecast").required(false))
            .add_source(config::Environment::with_prefix("DEMAND").separator("__"))
            .build()?;

        let engine_config: EngineConfig = config.try_deserialize()?;
        engine_config.validate()?;
        Ok(engine_config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(ForecastError::Config(message));
        if self.forecast_horizon == 0 {
            return invalid("forecast_horizon must be at least 1".to_string());
        }
        if self.seasonal_period == 0 {
            return invalid("seasonal_period must be at least 1".to_string());
        }
        if self.cv_folds == 0 {
            return invalid("cv_folds must be at least 1".to_string());
        }
        if self.fallback_window == 0 {
            return invalid("fallback_window must be at least 1".to_string());
        }
        let unit_fractions = [
            ("intermittent_zero_fraction", self.intermittent_zero_fraction),
            ("croston_alpha", self.croston_alpha),
            ("best_weight", self.best_weight),
        ];
        for (name, value) in unit_fractions {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must lie in [0, 1], got {value}"));
            }
        }
        let thresholds = [
            ("alerts.high_error", self.alerts.high_error),
            ("alerts.flat_ratio", self.alerts.flat_ratio),
            ("alerts.trend_ratio", self.alerts.trend_ratio),
            ("alerts.disagreement_cv", self.alerts.disagreement_cv),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }

    /// Set the forecast horizon.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.forecast_horizon = horizon;
        self
    }

    /// Set the per-candidate time budget.
    pub fn with_candidate_budget(mut self, budget: Duration) -> Self {
        self.candidate_budget_ms = Some(budget.as_millis() as u64);
        self
    }

    pub fn candidate_budget(&self) -> Option<Duration> {
        self.candidate_budget_ms.map(Duration::from_millis)
    }
}
