//! Error types for the demand-forecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while preparing, forecasting or composing.
///
/// Insufficient data and seasonal-initialization problems are normally
/// routed to a fallback by the caller; only the remaining variants abort
/// an entity's computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A raw observation could not be used (non-finite value).
    #[error("invalid observation for {period}: {reason}")]
    InvalidObservation { period: String, reason: String },

    /// Periods violate the month-start/contiguity invariant.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Composition window is empty or reversed.
    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow { start: String, end: String },

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Seasonal state cannot be initialised from the available cycles.
    #[error("cannot compute initial seasonals: need {needed} observations, got {got}")]
    SeasonalInitialization { needed: usize, got: usize },

    /// A candidate exceeded its wall-clock budget.
    #[error("{model} exceeded its time budget of {budget_ms} ms")]
    BudgetExceeded { model: String, budget_ms: u64 },

    /// Every candidate in a full evaluation failed.
    #[error("all candidate models failed")]
    AllCandidatesFailed,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// A report could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<config::ConfigError> for ForecastError {
    fn from(err: config::ConfigError) -> Self {
        ForecastError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ForecastError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ForecastError::InsufficientData { needed: 12, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 12, got 5"
        );

        let err = ForecastError::SeasonalInitialization { needed: 24, got: 18 };
        assert_eq!(
            err.to_string(),
            "cannot compute initial seasonals: need 24 observations, got 18"
        );

        let err = ForecastError::BudgetExceeded {
            model: "SARIMA".to_string(),
            budget_ms: 250,
        };
        assert_eq!(err.to_string(), "SARIMA exceeded its time budget of 250 ms");

        let err = ForecastError::InvalidWindow {
            start: "2024-05-01".to_string(),
            end: "2024-01-01".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid window: start 2024-05-01 is after end 2024-01-01"
        );
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ForecastError::AllCandidatesFailed;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
