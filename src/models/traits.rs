//! Forecaster trait and the candidate registry used by model selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::core::Series;
use crate::error::Result;

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to a prepared monthly series.
    fn fit(&mut self, series: &Series) -> Result<()>;

    /// Point forecasts for the `horizon` months after the fitted series.
    fn predict(&self, horizon: usize) -> Result<Vec<f64>>;

    /// In-sample one-step predictions, when the model keeps them.
    fn fitted_values(&self) -> Option<&[f64]> {
        None
    }

    /// Fitted level smoothing weight, for models that have one.
    fn smoothing_level(&self) -> Option<f64> {
        None
    }

    /// Cut iterative estimation short once `deadline` has passed.
    ///
    /// The fit still completes with the best parameters found so far.
    /// Models without an iterative fit ignore the deadline.
    fn set_deadline(&mut self, _deadline: Instant) {}

    /// Get the model name.
    fn name(&self) -> &str;
}

/// Boxed forecaster that can be moved onto a worker thread.
///
/// # Example
///
/// ```
/// use demand_forecast::models::{BoxedForecaster, Forecaster};
/// use demand_forecast::models::baseline::Naive;
///
/// let model: BoxedForecaster = Box::new(Naive::new());
/// assert_eq!(model.name(), "Naive");
/// ```
pub type BoxedForecaster = Box<dyn Forecaster + Send>;

/// The closed set of candidates evaluated for regular series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    ExponentialSmoothing,
    Sarima,
    ChangepointTrend,
    GradientBoosting,
}

impl ModelKind {
    /// Every candidate, in evaluation order.
    pub const ALL: [ModelKind; 4] = [
        ModelKind::ExponentialSmoothing,
        ModelKind::Sarima,
        ModelKind::ChangepointTrend,
        ModelKind::GradientBoosting,
    ];

    /// Display name used in candidate scores and chosen-model labels.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::ExponentialSmoothing => "Exponential Smoothing",
            ModelKind::Sarima => "SARIMA",
            ModelKind::ChangepointTrend => "Changepoint Trend",
            ModelKind::GradientBoosting => "Gradient Boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Factory for one candidate kind.
pub struct ModelSpec {
    pub kind: ModelKind,
    factory: Box<dyn Fn() -> BoxedForecaster + Send + Sync>,
}

impl ModelSpec {
    pub fn new<F>(kind: ModelKind, factory: F) -> Self
    where
        F: Fn() -> BoxedForecaster + Send + Sync + 'static,
    {
        Self {
            kind,
            factory: Box::new(factory),
        }
    }

    /// Create a fresh, unfitted model instance.
    pub fn create(&self) -> BoxedForecaster {
        (self.factory)()
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec").field("kind", &self.kind).finish()
    }
}

/// Ordered collection of candidate specifications.
///
/// # Example
///
/// ```
/// use demand_forecast::config::EngineConfig;
/// use demand_forecast::models::{CandidateRegistry, ModelKind};
///
/// let registry = CandidateRegistry::standard(&EngineConfig::default());
/// let kinds: Vec<_> = registry.iter().map(|spec| spec.kind).collect();
/// assert_eq!(kinds, ModelKind::ALL.to_vec());
/// ```
#[derive(Debug, Default)]
pub struct CandidateRegistry {
    specs: Vec<ModelSpec>,
}

impl CandidateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// The four standard candidates configured from `config`.
    pub fn standard(config: &EngineConfig) -> Self {
        use crate::models::arima::Sarima;
        use crate::models::boosting::GradientBoosting;
        use crate::models::exponential::ExponentialSmoothing;
        use crate::models::trend::ChangepointTrend;

        let period = config.seasonal_period;
        let window = config.fallback_window;
        let mut registry = Self::new();
        registry.register(ModelSpec::new(ModelKind::ExponentialSmoothing, move || {
            Box::new(ExponentialSmoothing::new(period).with_fallback_window(window))
        }));
        registry.register(ModelSpec::new(ModelKind::Sarima, move || {
            Box::new(Sarima::seasonal_111(period))
        }));
        registry.register(ModelSpec::new(ModelKind::ChangepointTrend, || {
            Box::new(ChangepointTrend::new())
        }));
        registry.register(ModelSpec::new(ModelKind::GradientBoosting, || {
            Box::new(GradientBoosting::new())
        }));
        registry
    }

    /// Register a spec, replacing an existing one of the same kind.
    pub fn register(&mut self, spec: ModelSpec) {
        match self.specs.iter_mut().find(|s| s.kind == spec.kind) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    pub fn get(&self, kind: ModelKind) -> Option<&ModelSpec> {
        self.specs.iter().find(|s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::baseline::Naive;

    #[test]
    fn standard_registry_creates_named_models() {
        let registry = CandidateRegistry::standard(&EngineConfig::default());
        assert_eq!(registry.len(), 4);
        for spec in registry.iter() {
            assert_eq!(spec.create().name(), spec.kind.name());
        }
    }

    #[test]
    fn register_replaces_same_kind() {
        let mut registry = CandidateRegistry::standard(&EngineConfig::default());
        registry.register(ModelSpec::new(ModelKind::Sarima, || Box::new(Naive::new())));
        assert_eq!(registry.len(), 4);
        let model = registry.get(ModelKind::Sarima).unwrap().create();
        assert_eq!(model.name(), "Naive");
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ModelKind::Sarima.to_string(), "SARIMA");
        assert_eq!(
            ModelKind::ExponentialSmoothing.name(),
            "Exponential Smoothing"
        );
    }
}
