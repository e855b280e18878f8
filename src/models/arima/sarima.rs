//! Seasonal ARIMA estimated by conditional sum of squares.

use std::time::Instant;

use crate::core::Series;
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{undifference, DifferenceStage};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// SARIMA order (p, d, q)(P, D, Q)\[s\].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SarimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl SarimaOrder {
    /// Number of AR and MA coefficients to estimate.
    pub fn num_params(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    /// Observations lost to differencing.
    pub fn differencing_loss(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    /// Shortest series the full order is estimated on.
    pub fn min_observations(&self) -> usize {
        self.differencing_loss() + 3
    }

    /// The same order with the seasonal part removed.
    pub fn non_seasonal(&self) -> Self {
        Self {
            seasonal_p: 0,
            seasonal_d: 0,
            seasonal_q: 0,
            ..*self
        }
    }

    /// Order that can be estimated from `n` observations.
    ///
    /// A series too short to difference at the seasonal lag keeps only the
    /// non-seasonal part. `None` when even that needs more data.
    pub fn estimable_for(&self, n: usize) -> Option<Self> {
        if n >= self.min_observations() {
            return Some(*self);
        }
        let reduced = self.non_seasonal();
        (n >= reduced.min_observations()).then_some(reduced)
    }
}

const COEF_BOUND: f64 = 0.99;

/// SARIMA forecaster.
///
/// The series is differenced `d` times at lag 1 and `D` times at lag `s`.
/// The differenced series `w` follows
///
/// `φ(B)·Φ(B^s)·w_t = θ(B)·Θ(B^s)·e_t`
///
/// with coefficients found by Nelder-Mead on the conditional sum of squared
/// one-step errors (pre-sample values and errors are zero). Coefficients are
/// bounded to (-0.99, 0.99) but stationarity and invertibility are not
/// enforced. No constant term is estimated.
///
/// Training data that leaves fewer than three points after the full
/// differencing is fitted with the non-seasonal part of the order only
/// (see [`SarimaOrder::estimable_for`]).
///
/// When the log transform is enabled and the training data is strictly
/// positive, the model is fitted on `ln(y)` and forecasts are exponentiated.
#[derive(Debug, Clone)]
pub struct Sarima {
    order: SarimaOrder,
    fitted_order: Option<SarimaOrder>,
    log_transform: bool,
    deadline: Option<Instant>,
    /// Lag polynomial of the AR side as `w_t = Σ ar[i]·w_{t-i} + ...`, index 0 unused.
    ar: Vec<f64>,
    /// Lag polynomial of the MA side as `... + Σ ma[j]·e_{t-j}`, index 0 unused.
    ma: Vec<f64>,
    coefficients: Option<Vec<f64>>,
    stages: Vec<DifferenceStage>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    logged: bool,
}

impl Sarima {
    pub fn new(order: SarimaOrder) -> Self {
        Self {
            order,
            fitted_order: None,
            log_transform: true,
            deadline: None,
            ar: Vec::new(),
            ma: Vec::new(),
            coefficients: None,
            stages: Vec::new(),
            differenced: Vec::new(),
            residuals: Vec::new(),
            logged: false,
        }
    }

    /// (1, 1, 1)(1, 1, 1)\[period\].
    pub fn seasonal_111(period: usize) -> Self {
        Self::new(SarimaOrder {
            p: 1,
            d: 1,
            q: 1,
            seasonal_p: 1,
            seasonal_d: 1,
            seasonal_q: 1,
            period,
        })
    }

    /// Enable or disable fitting on the log scale for positive data.
    pub fn with_log_transform(mut self, enabled: bool) -> Self {
        self.log_transform = enabled;
        self
    }

    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    /// Order used by the last fit.
    pub fn fitted_order(&self) -> Option<SarimaOrder> {
        self.fitted_order
    }

    /// Estimated coefficients as `[φ.., Φ.., θ.., Θ..]`.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    /// Whether the last fit used the log scale.
    pub fn is_log_scale(&self) -> bool {
        self.logged
    }

    /// Expand the seasonal and non-seasonal polynomials into lag vectors.
    fn lag_polynomials(order: &SarimaOrder, params: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (phi, rest) = params.split_at(order.p);
        let (seasonal_phi, rest) = rest.split_at(order.seasonal_p);
        let (theta, seasonal_theta) = rest.split_at(order.q);

        // (1 - Σφ B^i)(1 - ΣΦ B^{js}), then negate to the regression form
        let ar_poly = poly_mul(
            &sparse_poly(phi, 1, -1.0),
            &sparse_poly(seasonal_phi, order.period, -1.0),
        );
        let ma_poly = poly_mul(
            &sparse_poly(theta, 1, 1.0),
            &sparse_poly(seasonal_theta, order.period, 1.0),
        );
        let ar = ar_poly.iter().map(|c| -c).collect();
        (ar, ma_poly)
    }

    /// One-step errors of the recursion with zero pre-sample.
    fn residuals_for(w: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
        let mut e = vec![0.0; w.len()];
        for t in 0..w.len() {
            let mut pred = 0.0;
            for (i, &a) in ar.iter().enumerate().skip(1) {
                if a != 0.0 && i <= t {
                    pred += a * w[t - i];
                }
            }
            for (j, &m) in ma.iter().enumerate().skip(1) {
                if m != 0.0 && j <= t {
                    pred += m * e[t - j];
                }
            }
            e[t] = w[t] - pred;
        }
        e
    }

    fn css_for(order: &SarimaOrder, w: &[f64], params: &[f64]) -> f64 {
        let (ar, ma) = Self::lag_polynomials(order, params);
        let sse: f64 = Self::residuals_for(w, &ar, &ma).iter().map(|e| e * e).sum();
        if sse.is_finite() {
            sse
        } else {
            f64::INFINITY
        }
    }
}

/// `1 + sign·Σ c_k B^{k·step}` as a dense coefficient vector.
fn sparse_poly(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (k, &c) in coefs.iter().enumerate() {
        poly[(k + 1) * step] = sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

impl Forecaster for Sarima {
    fn fit(&mut self, series: &Series) -> Result<()> {
        let Some(order) = self.order.estimable_for(series.len()) else {
            return Err(ForecastError::InsufficientData {
                needed: self.order.non_seasonal().min_observations(),
                got: series.len(),
            });
        };

        let logged = self.log_transform && series.is_strictly_positive();
        let mut current: Vec<f64> = if logged {
            series.values().iter().map(|v| v.ln()).collect()
        } else {
            series.values().to_vec()
        };

        let mut stages = Vec::with_capacity(order.d + order.seasonal_d);
        for _ in 0..order.d {
            let (stage, out) = DifferenceStage::apply(current, 1);
            stages.push(stage);
            current = out;
        }
        for _ in 0..order.seasonal_d {
            let (stage, out) = DifferenceStage::apply(current, order.period);
            stages.push(stage);
            current = out;
        }
        let w = current;

        let k = order.num_params();
        let coefficients = if k == 0 {
            Vec::new()
        } else {
            let bounds = vec![(-COEF_BOUND, COEF_BOUND); k];
            let config = NelderMeadConfig {
                deadline: self.deadline,
                ..NelderMeadConfig::default()
            };
            let result = nelder_mead(
                |params| Self::css_for(&order, &w, params),
                &vec![0.1; k],
                Some(&bounds),
                config,
            );
            result.optimal_point
        };

        let (ar, ma) = Self::lag_polynomials(&order, &coefficients);
        let residuals = Self::residuals_for(&w, &ar, &ma);
        if !residuals.iter().all(|e| e.is_finite()) {
            return Err(ForecastError::ComputationError(
                "SARIMA recursion diverged".to_string(),
            ));
        }

        self.fitted_order = Some(order);
        self.ar = ar;
        self.ma = ma;
        self.coefficients = Some(coefficients);
        self.stages = stages;
        self.differenced = w;
        self.residuals = residuals;
        self.logged = logged;
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Vec<f64>> {
        if self.coefficients.is_none() {
            return Err(ForecastError::FitRequired);
        }

        let n = self.differenced.len();
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();
        for t in n..n + horizon {
            let mut next = 0.0;
            for (i, &a) in self.ar.iter().enumerate().skip(1) {
                if i <= t {
                    next += a * w[t - i];
                }
            }
            for (j, &m) in self.ma.iter().enumerate().skip(1) {
                if j <= t {
                    next += m * e[t - j];
                }
            }
            w.push(next);
            e.push(0.0);
        }

        let forecast = undifference(&self.stages, &w[n..]);
        Ok(if self.logged {
            forecast.into_iter().map(f64::exp).collect()
        } else {
            forecast
        })
    }

    fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    fn name(&self) -> &str {
        "SARIMA"
    }
}
