/// Time sweep analysis
///
/// Oscillation at fixed frequency (3.142 rad/s) and strain, G' and G''
/// recorded over time. The moduli settle after loading; the operator picks a
/// plateau window and the mean / standard deviation over that window are
/// the sample's G', G'' at 3.142 rad/s.

use crate::analysis::export::TimeSweepData;
use crate::error::{Result, RheoError};

/// Inclusive time window in minutes, finite with start ≤ finish
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    start_min: f64,
    finish_min: f64,
}

impl TimeWindow {
    pub fn new(start_min: f64, finish_min: f64) -> Result<Self> {
        if !(start_min.is_finite() && finish_min.is_finite()) || start_min > finish_min {
            return Err(RheoError::InvalidInput(format!(
                "time window [{}, {}] is not a valid interval",
                start_min, finish_min
            )));
        }
        Ok(Self { start_min, finish_min })
    }

    pub fn start_min(&self) -> f64 {
        self.start_min
    }

    pub fn finish_min(&self) -> f64 {
        self.finish_min
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_min && t <= self.finish_min
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self { start_min: 0.5, finish_min: 5.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSweepResult {
    pub window: TimeWindow,
    pub points: usize,
    pub storage_mean: f64,
    pub loss_mean: f64,
    /// Population standard deviation (ddof = 0)
    pub storage_std: f64,
    pub loss_std: f64,
}

impl TimeSweepResult {
    /// Last recorded time, offered to the operator as the window upper bound
    pub fn last_time(data: &TimeSweepData) -> Option<f64> {
        data.time_min.last().copied()
    }
}

/// Mean and population standard deviation of `values`
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

pub fn analyze_time_sweep(data: &TimeSweepData, window: TimeWindow) -> Result<TimeSweepResult> {
    let (storage, loss): (Vec<f64>, Vec<f64>) = data
        .time_min
        .iter()
        .zip(data.storage.iter().zip(&data.loss))
        .filter(|(t, _)| window.contains(**t))
        .map(|(_, (g1, g2))| (*g1, *g2))
        .unzip();

    if storage.is_empty() {
        return Err(RheoError::EmptySelection(format!(
            "no time sweep points between {} and {} min",
            window.start_min, window.finish_min
        )));
    }

    let (storage_mean, storage_std) = mean_and_std(&storage);
    let (loss_mean, loss_std) = mean_and_std(&loss);
    Ok(TimeSweepResult {
        window,
        points: storage.len(),
        storage_mean,
        loss_mean,
        storage_std,
        loss_std,
    })
}
