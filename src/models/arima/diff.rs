//! Differencing utilities for ARIMA models.

fn lag_difference(series: &[f64], lag: usize) -> Vec<f64> {
    if series.len() <= lag {
        return Vec::new();
    }
    series
        .iter()
        .skip(lag)
        .zip(series.iter())
        .map(|(curr, prev)| curr - prev)
        .collect()
}

/// One differencing step: the series before it was differenced and the lag used.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceStage {
    pub input: Vec<f64>,
    pub lag: usize,
}

impl DifferenceStage {
    /// Difference `input` at `lag`, returning the stage and its output.
    pub fn apply(input: Vec<f64>, lag: usize) -> (Self, Vec<f64>) {
        let output = lag_difference(&input, lag);
        (Self { input, lag }, output)
    }
}

/// Integrate forecasts of a differenced series back to the original scale.
///
/// `stages` are listed in the order they were applied; they are undone in
/// reverse, each continuing its stored input series.
pub fn undifference(stages: &[DifferenceStage], forecast: &[f64]) -> Vec<f64> {
    let mut current = forecast.to_vec();
    for stage in stages.iter().rev() {
        let mut extended = stage.input.clone();
        for &step in &current {
            let base = extended
                .len()
                .checked_sub(stage.lag)
                .map_or(0.0, |i| extended[i]);
            extended.push(step + base);
        }
        current = extended.split_off(stage.input.len());
    }
    current
}
