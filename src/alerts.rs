//! Quality alerts derived from a model selection and its history.
//!
//! Every alert is evaluated independently; an alert that does not fire
//! maps to an empty message so that reports always carry all five columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::AlertThresholds;
use crate::core::Series;
use crate::selection::ModelSelection;
use crate::utils::stats::{coefficient_of_variation, linear_slope, population_std};

/// The closed set of alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    Fallback,
    HighError,
    FlatForecast,
    TrendInconsistency,
    ModelDisagreement,
}

impl AlertKind {
    pub const ALL: [AlertKind; 5] = [
        AlertKind::Fallback,
        AlertKind::HighError,
        AlertKind::FlatForecast,
        AlertKind::TrendInconsistency,
        AlertKind::ModelDisagreement,
    ];

    /// Report column name.
    pub fn name(self) -> &'static str {
        match self {
            AlertKind::Fallback => "Fallback Alert",
            AlertKind::HighError => "High MAPE Alert",
            AlertKind::FlatForecast => "Flat Forecast Alert",
            AlertKind::TrendInconsistency => "Trend Inconsistency Alert",
            AlertKind::ModelDisagreement => "Model Consensus Alert",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Alert messages of one entity; an empty message means the alert is clear.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertReport {
    messages: BTreeMap<AlertKind, String>,
}

impl AlertReport {
    pub fn message(&self, kind: AlertKind) -> &str {
        self.messages.get(&kind).map_or("", String::as_str)
    }

    pub fn is_raised(&self, kind: AlertKind) -> bool {
        !self.message(kind).is_empty()
    }

    /// Raised alerts with their messages.
    pub fn raised(&self) -> impl Iterator<Item = (AlertKind, &str)> {
        self.messages
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(k, m)| (*k, m.as_str()))
    }

    /// Every alert, keyed by report column name.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        AlertKind::ALL
            .iter()
            .map(|k| (k.name().to_string(), self.message(*k).to_string()))
            .collect()
    }
}

/// Evaluates the alert rules.
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    thresholds: AlertThresholds,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, selection: &ModelSelection, history: &Series) -> AlertReport {
        let mut messages = BTreeMap::new();
        messages.insert(AlertKind::Fallback, fallback(selection));
        messages.insert(AlertKind::HighError, self.high_error(selection));
        messages.insert(
            AlertKind::FlatForecast,
            self.flat_forecast(&selection.forecast, history.values()),
        );
        messages.insert(
            AlertKind::TrendInconsistency,
            self.trend_inconsistency(&selection.forecast, history.values()),
        );
        messages.insert(AlertKind::ModelDisagreement, self.disagreement(selection));
        AlertReport { messages }
    }

    fn high_error(&self, selection: &ModelSelection) -> String {
        let score = selection.chosen_score;
        if score.is_finite() && score > self.thresholds.high_error {
            format!("MAPE: {:.1}%", score * 100.0)
        } else {
            String::new()
        }
    }

    fn flat_forecast(&self, forecast: &[f64], history: &[f64]) -> String {
        if forecast.is_empty() || history.is_empty() {
            return String::new();
        }
        let historical_std = population_std(history);
        let forecast_std = population_std(forecast);
        if historical_std > 0.0 && forecast_std < self.thresholds.flat_ratio * historical_std {
            format!(
                "Forecast std ({forecast_std:.2}) < {:.0}% of historical std ({historical_std:.2})",
                self.thresholds.flat_ratio * 100.0
            )
        } else {
            String::new()
        }
    }

    fn trend_inconsistency(&self, forecast: &[f64], history: &[f64]) -> String {
        let (Some(hist), Some(fcst)) = (linear_slope(history), linear_slope(forecast)) else {
            return format!(
                "Trend slope estimation error: need at least 2 points, got {} historical and {} forecast",
                history.len(),
                forecast.len()
            );
        };
        let ratio = self.thresholds.trend_ratio;
        let inconsistent = hist * fcst < 0.0
            || (hist > 0.0 && fcst < ratio * hist)
            || (hist < 0.0 && fcst > ratio * hist);
        if inconsistent {
            format!("Historical slope: {hist:.2}, Forecast slope: {fcst:.2}")
        } else {
            String::new()
        }
    }

    fn disagreement(&self, selection: &ModelSelection) -> String {
        let scores = selection.numeric_scores();
        if scores.is_empty() {
            return String::new();
        }
        let cv = coefficient_of_variation(&scores);
        if cv > self.thresholds.disagreement_cv {
            format!("Candidate MAPEs CV: {cv:.2}")
        } else {
            String::new()
        }
    }
}

fn fallback(selection: &ModelSelection) -> String {
    let name = selection.chosen_model.to_lowercase();
    if ["fallback", "naive", "croston"]
        .iter()
        .any(|k| name.contains(k))
    {
        format!("Model used: {}", selection.chosen_model)
    } else {
        String::new()
    }
}
