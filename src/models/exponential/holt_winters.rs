//! Holt-Winters forecasting model.
//!
//! Also known as triple exponential smoothing, this model handles
//! data with both trend and seasonality. Trend and seasonal components can
//! each be additive or multiplicative.

use std::time::Instant;

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// How a component combines with the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Component {
    #[default]
    Additive,
    Multiplicative,
}

/// Smoothing weights for level, trend and season.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

const PARAM_BOUNDS: (f64, f64) = (1e-4, 0.9999);

impl SmoothingParams {
    fn from_slice(p: &[f64]) -> Self {
        let (lo, hi) = PARAM_BOUNDS;
        Self {
            alpha: p[0].clamp(lo, hi),
            beta: p[1].clamp(lo, hi),
            gamma: p[2].clamp(lo, hi),
        }
    }
}

#[derive(Debug, Clone)]
struct State {
    level: f64,
    trend: f64,
    seasonals: Vec<f64>,
}

/// Holt-Winters forecaster.
///
/// One-step forecast for time `t` with `m` = seasonal period:
/// - base: `l + b` (additive trend) or `l · b` (multiplicative trend)
/// - `ŷ_t = base + s_{t-m}` or `base · s_{t-m}`
///
/// Updates after observing `y_t`:
/// - `l_t = α·deseason(y_t) + (1-α)·base`
/// - `b_t = β·(l_t - l_{t-1}) + (1-β)·b_{t-1}` (or the ratio `l_t / l_{t-1}`)
/// - `s_t = γ·(y_t - l_t) + (1-γ)·s_{t-m}` (or `y_t / l_t`)
///
/// The first season initialises the state, so at least two full seasons are
/// required; shorter input fails with [`ForecastError::SeasonalInitialization`].
#[derive(Debug, Clone)]
pub struct HoltWinters {
    trend_type: Component,
    seasonal_type: Component,
    period: usize,
    params: Option<SmoothingParams>,
    optimize: bool,
    deadline: Option<Instant>,
    state: Option<State>,
    fitted: Option<Vec<f64>>,
    sse: Option<f64>,
    n: usize,
}

impl HoltWinters {
    /// Model with fixed smoothing weights.
    pub fn new(
        trend_type: Component,
        seasonal_type: Component,
        period: usize,
        params: SmoothingParams,
    ) -> Self {
        Self {
            trend_type,
            seasonal_type,
            period: period.max(1),
            params: Some(SmoothingParams::from_slice(&[
                params.alpha,
                params.beta,
                params.gamma,
            ])),
            optimize: false,
            deadline: None,
            state: None,
            fitted: None,
            sse: None,
            n: 0,
        }
    }

    /// Model whose weights are estimated by minimising in-sample SSE.
    pub fn auto(trend_type: Component, seasonal_type: Component, period: usize) -> Self {
        Self {
            trend_type,
            seasonal_type,
            period: period.max(1),
            params: None,
            optimize: true,
            deadline: None,
            state: None,
            fitted: None,
            sse: None,
            n: 0,
        }
    }

    /// Additive trend and additive seasonality with estimated weights.
    pub fn additive(period: usize) -> Self {
        Self::auto(Component::Additive, Component::Additive, period)
    }

    /// Multiplicative trend and multiplicative seasonality with estimated weights.
    pub fn multiplicative(period: usize) -> Self {
        Self::auto(Component::Multiplicative, Component::Multiplicative, period)
    }

    pub fn params(&self) -> Option<SmoothingParams> {
        self.params
    }

    pub fn trend_type(&self) -> Component {
        self.trend_type
    }

    pub fn seasonal_type(&self) -> Component {
        self.seasonal_type
    }

    pub fn seasonals(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.seasonals.as_slice())
    }

    /// Akaike information criterion of the fitted model.
    ///
    /// `n·ln(SSE/n) + 2k` over the observations after the initial season,
    /// with `k` counting the three weights plus the initial level, trend and
    /// seasonal states.
    pub fn aic(&self) -> Option<f64> {
        let sse = self.sse?;
        let n = self.n.checked_sub(self.period).filter(|&n| n > 0)? as f64;
        let k = (3 + 2 + self.period) as f64;
        Some(n * (sse.max(1e-12) / n).ln() + 2.0 * k)
    }

    fn uses_multiplication(&self) -> bool {
        self.trend_type == Component::Multiplicative
            || self.seasonal_type == Component::Multiplicative
    }

    fn initial_state(&self, values: &[f64]) -> State {
        let m = self.period;
        let first = &values[..m];
        let second = &values[m..2 * m];
        let first_mean = first.iter().sum::<f64>() / m as f64;
        let second_mean = second.iter().sum::<f64>() / m as f64;

        let trend = match self.trend_type {
            Component::Additive => (second_mean - first_mean) / m as f64,
            Component::Multiplicative => (second_mean / first_mean).powf(1.0 / m as f64),
        };

        let mut seasonals: Vec<f64> = match self.seasonal_type {
            Component::Additive => first.iter().map(|y| y - first_mean).collect(),
            Component::Multiplicative => first.iter().map(|y| y / first_mean).collect(),
        };
        normalize_seasonals(&mut seasonals, self.seasonal_type);

        State {
            level: first_mean,
            trend,
            seasonals,
        }
    }

    fn base(&self, state: &State, steps: f64) -> f64 {
        match self.trend_type {
            Component::Additive => state.level + steps * state.trend,
            Component::Multiplicative => state.level * state.trend.powf(steps),
        }
    }

    fn apply_season(&self, base: f64, season: f64) -> f64 {
        match self.seasonal_type {
            Component::Additive => base + season,
            Component::Multiplicative => base * season,
        }
    }

    /// Run the recursions over `values[period..]`.
    ///
    /// Returns the SSE of the one-step forecasts, the fitted values (the
    /// initial season is echoed back) and the final state.
    fn filter(&self, values: &[f64], p: SmoothingParams) -> (f64, Vec<f64>, State) {
        let m = self.period;
        let mut state = self.initial_state(values);
        let mut fitted = values[..m].to_vec();
        fitted.reserve(values.len() - m);
        let mut sse = 0.0;

        for (t, &y) in values.iter().enumerate().skip(m) {
            let idx = t % m;
            let s = state.seasonals[idx];
            let base = self.base(&state, 1.0);
            let forecast = self.apply_season(base, s);
            fitted.push(forecast);
            sse += (y - forecast).powi(2);

            let deseasonalized = match self.seasonal_type {
                Component::Additive => y - s,
                Component::Multiplicative => y / s,
            };
            let prev_level = state.level;
            state.level = p.alpha * deseasonalized + (1.0 - p.alpha) * base;
            state.trend = match self.trend_type {
                Component::Additive => {
                    p.beta * (state.level - prev_level) + (1.0 - p.beta) * state.trend
                }
                Component::Multiplicative => {
                    p.beta * (state.level / prev_level) + (1.0 - p.beta) * state.trend
                }
            };
            state.seasonals[idx] = match self.seasonal_type {
                Component::Additive => p.gamma * (y - state.level) + (1.0 - p.gamma) * s,
                Component::Multiplicative => p.gamma * (y / state.level) + (1.0 - p.gamma) * s,
            };
        }

        if !sse.is_finite() {
            sse = f64::INFINITY;
        }
        (sse, fitted, state)
    }

    fn optimize_params(&self, values: &[f64]) -> SmoothingParams {
        let bounds = [PARAM_BOUNDS; 3];
        let result = nelder_mead(
            |x| self.filter(values, SmoothingParams::from_slice(x)).0,
            &[0.3, 0.1, 0.1],
            Some(&bounds),
            NelderMeadConfig {
                deadline: self.deadline,
                ..NelderMeadConfig::default()
            },
        );
        SmoothingParams::from_slice(&result.optimal_point)
    }
}

/// Additive seasonals sum to zero, multiplicative ones average to one.
fn normalize_seasonals(seasonals: &mut [f64], kind: Component) {
    if seasonals.is_empty() {
        return;
    }
    let mean = seasonals.iter().sum::<f64>() / seasonals.len() as f64;
    match kind {
        Component::Additive => seasonals.iter_mut().for_each(|s| *s -= mean),
        Component::Multiplicative => {
            if mean.abs() > 1e-10 {
                seasonals.iter_mut().for_each(|s| *s /= mean);
            }
        }
    }
}

impl Default for HoltWinters {
    fn default() -> Self {
        Self::additive(12)
    }
}

impl Forecaster for HoltWinters {
    fn fit(&mut self, series: &Series) -> Result<()> {
        let values = series.values();
        let needed = 2 * self.period;
        if values.len() < needed {
            return Err(ForecastError::SeasonalInitialization {
                needed,
                got: values.len(),
            });
        }
        if self.uses_multiplication() && !series.is_strictly_positive() {
            return Err(ForecastError::InvalidParameter(
                "multiplicative components require strictly positive data".to_string(),
            ));
        }

        let params = match (self.optimize, self.params) {
            (false, Some(p)) => p,
            _ => self.optimize_params(values),
        };
        let (sse, fitted, state) = self.filter(values, params);
        if !sse.is_finite() {
            return Err(ForecastError::ComputationError(
                "Holt-Winters recursion diverged".to_string(),
            ));
        }

        self.n = values.len();
        self.params = Some(params);
        self.sse = Some(sse);
        self.fitted = Some(fitted);
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        let state = self.state.as_ref().ok_or(ForecastError::FitRequired)?;
        Ok((1..=horizon)
            .map(|h| {
                let s = state.seasonals[(self.n + h - 1) % self.period];
                self.apply_season(self.base(state, h as f64), s)
            })
            .collect())
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn smoothing_level(&self) -> Option<f64> {
        self.params().map(|p| p.alpha)
    }

    fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    fn name(&self) -> &str {
        match (self.trend_type, self.seasonal_type) {
            (Component::Additive, Component::Additive) => "HoltWinters(add, add)",
            (Component::Additive, Component::Multiplicative) => "HoltWinters(add, mul)",
            (Component::Multiplicative, Component::Additive) => "HoltWinters(mul, add)",
            (Component::Multiplicative, Component::Multiplicative) => "HoltWinters(mul, mul)",
        }
    }
}
