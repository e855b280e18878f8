//! Result types of model selection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::ModelKind;

/// Chosen-model label of an empty series.
pub const NO_DATA: &str = "No Data";
/// Chosen-model label of a series too short to evaluate.
pub const NAIVE_INSUFFICIENT: &str = "Naive (Insufficient data)";
/// Chosen-model label of an intermittent series.
pub const CROSTON: &str = "Croston";
/// Chosen-model label when no candidate succeeded but smoothing did.
pub const SMOOTHING_FALLBACK: &str = "Exponential Smoothing (Fallback)";
/// Chosen-model label of the last-resort recent-mean forecast.
pub const MEAN_FALLBACK: &str = "AvgLast6 (Fallback)";

/// Label of a blended forecast built around `best`.
pub fn ensemble_label(best: &str) -> String {
    format!("Ensemble ({best} + others)")
}

/// How a series was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesClass {
    /// No observations after preparation.
    NoData,
    /// Fewer observations than the evaluation needs.
    Insufficient,
    /// More zeros than the intermittent threshold allows.
    Intermittent,
    /// Cross-validated candidate evaluation.
    Regular,
}

/// Score of one candidate: an average MAPE, a failure, or a skip reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateScore {
    Mape(f64),
    Error,
    Skipped(String),
}

impl CandidateScore {
    /// The numeric score, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            CandidateScore::Mape(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CandidateScore::Error)
    }
}

impl fmt::Display for CandidateScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateScore::Mape(v) => write!(f, "{v:.4}"),
            CandidateScore::Error => f.write_str("Error"),
            CandidateScore::Skipped(reason) => f.write_str(reason),
        }
    }
}

/// Evaluation of one candidate across the folds plus its full refit.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub kind: ModelKind,
    pub score: CandidateScore,
    /// Forecast of the model refitted on the whole series; `None` on failure.
    pub forecast: Option<Vec<f64>>,
    /// Level smoothing weight of the refitted model, when it has one.
    pub smoothing_level: Option<f64>,
}

impl CandidateResult {
    pub fn failed(kind: ModelKind) -> Self {
        Self {
            kind,
            score: CandidateScore::Error,
            forecast: None,
            smoothing_level: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Outcome of model selection for one entity. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub class: SeriesClass,
    pub chosen_model: String,
    /// Average MAPE of the best candidate, `f64::INFINITY` when no
    /// cross-validated score applies.
    pub chosen_score: f64,
    pub candidate_scores: BTreeMap<String, CandidateScore>,
    pub forecast: Vec<f64>,
    /// Level smoothing weight of the exponential smoothing model, if one was fitted.
    pub smoothing_alpha: Option<f64>,
}

impl ModelSelection {
    pub fn has_score(&self) -> bool {
        self.chosen_score.is_finite()
    }

    /// Positive finite scores of candidates that did not fail.
    pub fn numeric_scores(&self) -> Vec<f64> {
        self.candidate_scores
            .values()
            .filter_map(CandidateScore::value)
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect()
    }
}
