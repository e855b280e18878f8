//! Segment cost functions for changepoint detection.

/// Cost of fitting one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostFunction {
    /// Squared deviation from the segment mean (level shifts).
    #[default]
    L2,
    /// Residual sum of squares of a per-segment linear fit (slope changes).
    LinearTrend,
}

/// Cost of a standalone segment.
pub fn segment_cost(segment: &[f64], cost_fn: CostFunction) -> f64 {
    match cost_fn {
        CostFunction::L2 => l2_cost(segment),
        CostFunction::LinearTrend => linear_trend_cost(segment),
    }
}

/// L2 cost: sum of squared deviations from the mean.
pub fn l2_cost(segment: &[f64]) -> f64 {
    if segment.is_empty() {
        return 0.0;
    }
    let mean = segment.iter().sum::<f64>() / segment.len() as f64;
    segment.iter().map(|x| (x - mean).powi(2)).sum()
}

/// Residual sum of squares after regressing the segment on its index.
pub fn linear_trend_cost(segment: &[f64]) -> f64 {
    let costs = SegmentCosts::new(segment, CostFunction::LinearTrend);
    costs.cost(0, segment.len())
}

/// Cumulative sums that give any segment's cost in O(1).
#[derive(Debug, Clone)]
pub struct SegmentCosts {
    cost_fn: CostFunction,
    sum_y: Vec<f64>,
    sum_y2: Vec<f64>,
    sum_xy: Vec<f64>,
}

impl SegmentCosts {
    pub fn new(series: &[f64], cost_fn: CostFunction) -> Self {
        let n = series.len();
        let mut sum_y = Vec::with_capacity(n + 1);
        let mut sum_y2 = Vec::with_capacity(n + 1);
        let mut sum_xy = Vec::with_capacity(n + 1);
        let (mut y, mut y2, mut xy) = (0.0, 0.0, 0.0);
        sum_y.push(0.0);
        sum_y2.push(0.0);
        sum_xy.push(0.0);
        for (i, &v) in series.iter().enumerate() {
            y += v;
            y2 += v * v;
            xy += i as f64 * v;
            sum_y.push(y);
            sum_y2.push(y2);
            sum_xy.push(xy);
        }
        Self {
            cost_fn,
            sum_y,
            sum_y2,
            sum_xy,
        }
    }

    /// Cost of `series[start..end]`.
    pub fn cost(&self, start: usize, end: usize) -> f64 {
        if end <= start {
            return 0.0;
        }
        let n = (end - start) as f64;
        let sy = self.sum_y[end] - self.sum_y[start];
        let syy = self.sum_y2[end] - self.sum_y2[start];
        let mean_y = sy / n;
        let ss_yy = (syy - n * mean_y * mean_y).max(0.0);

        match self.cost_fn {
            CostFunction::L2 => ss_yy,
            CostFunction::LinearTrend => {
                if end - start < 2 {
                    return 0.0;
                }
                // x runs over start..end; Σx and Σx² in closed form
                let (a, b) = (start as f64, (end - 1) as f64);
                let mean_x = (a + b) / 2.0;
                let ss_xx = n * (n * n - 1.0) / 12.0;
                let sxy = self.sum_xy[end] - self.sum_xy[start];
                let ss_xy = sxy - n * mean_x * mean_y;
                (ss_yy - ss_xy * ss_xy / ss_xx).max(0.0)
            }
        }
    }
}
