//! Pruned exact linear time segmentation.
//!
//! Minimises the sum of segment costs plus a fixed penalty per changepoint,
//! discarding split candidates that can no longer be optimal.

use super::cost::{CostFunction, SegmentCosts};

/// Segmentation settings.
#[derive(Debug, Clone)]
pub struct PeltConfig {
    pub cost_fn: CostFunction,
    /// Cost added per changepoint; larger values give fewer segments.
    pub penalty: f64,
    /// Shortest allowed segment, in observations.
    pub min_segment_length: usize,
}

impl Default for PeltConfig {
    fn default() -> Self {
        Self {
            cost_fn: CostFunction::L2,
            penalty: 1.0,
            min_segment_length: 2,
        }
    }
}

impl PeltConfig {
    pub fn cost_function(mut self, cost_fn: CostFunction) -> Self {
        self.cost_fn = cost_fn;
        self
    }

    pub fn penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    /// Clamped to at least one observation.
    pub fn min_segment_length(mut self, min_len: usize) -> Self {
        self.min_segment_length = min_len.max(1);
        self
    }
}

/// Optimal segmentation of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct PeltResult {
    /// First index of every segment but the first.
    pub changepoints: Vec<usize>,
    /// Half-open `(start, end)` bounds.
    pub segments: Vec<(usize, usize)>,
    /// Summed segment cost without penalties.
    pub cost: f64,
}

/// Segment `series` under `config`.
///
/// # Example
/// ```
/// use demand_forecast::changepoint::{pelt_detect, PeltConfig};
///
/// let mut series = vec![0.0; 20];
/// series.extend(vec![10.0; 20]);
///
/// let result = pelt_detect(&series, &PeltConfig::default().penalty(5.0));
/// assert_eq!(result.changepoints, vec![20]);
/// ```
pub fn pelt_detect(series: &[f64], config: &PeltConfig) -> PeltResult {
    let n = series.len();
    let min_len = config.min_segment_length.max(1);
    let costs = SegmentCosts::new(series, config.cost_fn);

    if n < 2 * min_len {
        return PeltResult {
            changepoints: Vec::new(),
            segments: vec![(0, n)],
            cost: costs.cost(0, n),
        };
    }

    // best[t] = minimum penalised cost of segmenting series[0..t]
    let mut best = vec![f64::INFINITY; n + 1];
    best[0] = -config.penalty;
    let mut last_change = vec![0usize; n + 1];
    let mut candidates: Vec<usize> = vec![0];

    for t in min_len..=n {
        let (mut best_total, mut best_s) = (f64::INFINITY, 0);
        for &s in &candidates {
            if t - s >= min_len {
                let total = best[s] + costs.cost(s, t) + config.penalty;
                if total < best_total {
                    best_total = total;
                    best_s = s;
                }
            }
        }
        best[t] = best_total;
        last_change[t] = best_s;

        candidates.retain(|&s| t - s < min_len || best[s] + costs.cost(s, t) <= best[t]);
        if t + min_len <= n {
            candidates.push(t);
        }
    }

    let mut changepoints = Vec::new();
    let mut t = n;
    while t > 0 {
        let prev = last_change[t];
        if prev > 0 {
            changepoints.push(prev);
        }
        t = prev;
    }
    changepoints.reverse();

    let mut segments = Vec::with_capacity(changepoints.len() + 1);
    let mut start = 0;
    for &cp in &changepoints {
        segments.push((start, cp));
        start = cp;
    }
    segments.push((start, n));

    let cost = segments.iter().map(|&(s, e)| costs.cost(s, e)).sum();
    PeltResult {
        changepoints,
        segments,
        cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pelt_no_changepoint() {
        let series = vec![5.0; 20];
        let result = pelt_detect(&series, &PeltConfig::default().penalty(10.0));
        assert!(result.changepoints.is_empty());
        assert_eq!(result.segments, vec![(0, 20)]);
    }

    #[test]
    fn pelt_two_level_shifts() {
        let mut series = vec![0.0; 10];
        series.extend(vec![10.0; 10]);
        series.extend(vec![0.0; 10]);
        let result = pelt_detect(&series, &PeltConfig::default().penalty(2.0));
        assert_eq!(result.changepoints, vec![10, 20]);
    }

    #[test]
    fn pelt_slope_change_with_linear_trend_cost() {
        // rising for 15 points, then falling
        let series: Vec<f64> = (0..30)
            .map(|i| if i < 15 { 2.0 * i as f64 } else { 28.0 - 3.0 * (i - 15) as f64 })
            .collect();
        let config = PeltConfig::default()
            .cost_function(CostFunction::LinearTrend)
            .penalty(5.0)
            .min_segment_length(3);
        let result = pelt_detect(&series, &config);
        assert_eq!(result.changepoints, vec![15]);
    }

    #[test]
    fn pelt_high_penalty_suppresses_changepoints() {
        let mut series = vec![0.0; 10];
        series.extend(vec![100.0; 10]);
        let result = pelt_detect(&series, &PeltConfig::default().penalty(100_000.0));
        assert!(result.changepoints.is_empty());
    }

    #[test]
    fn pelt_respects_min_segment_length() {
        let mut series = vec![0.0; 2];
        series.extend(vec![100.0; 18]);
        let config = PeltConfig::default().penalty(1.0).min_segment_length(5);
        let result = pelt_detect(&series, &config);
        assert!(result.changepoints.iter().all(|&cp| cp >= 5 && cp <= 15));
    }

    #[test]
    fn pelt_short_and_empty_series() {
        assert!(pelt_detect(&[1.0, 2.0, 3.0], &PeltConfig::default())
            .changepoints
            .is_empty());
        let empty = pelt_detect(&[], &PeltConfig::default());
        assert!(empty.changepoints.is_empty());
        assert_eq!(empty.segments, vec![(0, 0)]);
    }
}
