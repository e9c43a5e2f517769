//! Cohort preprocessing of the statistical database
//!
//! Applied row by row, in this order:
//! 1. Missing time sweep means are filled from the frequency sweep at 3.142 rad/s
//! 2. Crossover points above the limit are dropped
//! 3. Implausible Cross fits (η₀ too high or η∞ too low) drop the whole Cross group
//! 4. Time/frequency and frequency/flow deviations are computed
//! 5. A moduli deviation over the limit drops the frequency group, a
//!    viscosity deviation over the limit drops the flow group
//! 6. tan(δ) at the three reading frequencies

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::stat_db::{
    CONSISTENCY, CROSSOVER, FLOW_VISCOSITY, FS_LOSS_HIGH, FS_LOSS_LOW, FS_LOSS_REF, FS_STORAGE_HIGH,
    FS_STORAGE_LOW, FS_STORAGE_REF, FS_VISCOSITY, INFINITE_RATE_VISCOSITY, RATE_INDEX, STANDARD_ERROR,
    TS_LOSS_MEAN, TS_STORAGE_MEAN, ZERO_RATE_VISCOSITY,
};
use crate::database::table::Table;
use crate::error::Result;
use crate::utils::relative_deviation;

pub const STORAGE_DEVIATION: &str = "time/frequency G' deviation";
pub const LOSS_DEVIATION: &str = "time/frequency G'' deviation";
pub const VISCOSITY_DEVIATION: &str = "frequency/flow step deviation";

pub const TAN_DELTA_LOW: &str = "tan(delta) at 0.68 rad/s";
pub const TAN_DELTA_REF: &str = "tan(delta) at 3.142 rad/s";
pub const TAN_DELTA_HIGH: &str = "tan(delta) at 14.58 rad/s";

const CROSS_GROUP: [&str; 5] = [ZERO_RATE_VISCOSITY, INFINITE_RATE_VISCOSITY, CONSISTENCY, RATE_INDEX, STANDARD_ERROR];

const FREQUENCY_GROUP: [&str; 8] = [
    FS_STORAGE_LOW, FS_LOSS_LOW, FS_STORAGE_REF, FS_LOSS_REF, FS_STORAGE_HIGH, FS_LOSS_HIGH,
    FS_VISCOSITY, CROSSOVER,
];

const FLOW_GROUP: [&str; 6] = [
    ZERO_RATE_VISCOSITY, INFINITE_RATE_VISCOSITY, CONSISTENCY, RATE_INDEX, STANDARD_ERROR, FLOW_VISCOSITY,
];

/// Plausibility limits
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PreprocessThresholds {
    /// Largest credible crossover frequency (rad/s)
    #[serde(default = "default_crossover_max")]
    pub crossover_max: f64,
    /// Largest credible zero-rate viscosity (Pa·s)
    #[serde(default = "default_eta_0_max")]
    pub eta_0_max: f64,
    /// Smallest credible infinite-rate viscosity (Pa·s)
    #[serde(default = "default_eta_inf_min")]
    pub eta_inf_min: f64,
    /// Largest accepted relative deviation between two tests
    #[serde(default = "default_deviation_limit")]
    pub deviation_limit: f64,
}

fn default_crossover_max() -> f64 { 15.0 }
fn default_eta_0_max() -> f64 { 50.0 }
fn default_eta_inf_min() -> f64 { 0.001 }
fn default_deviation_limit() -> f64 { 0.2 }

impl Default for PreprocessThresholds {
    fn default() -> Self {
        Self {
            crossover_max: default_crossover_max(),
            eta_0_max: default_eta_0_max(),
            eta_inf_min: default_eta_inf_min(),
            deviation_limit: default_deviation_limit(),
        }
    }
}

fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    Some(num? / den?).filter(|v| v.is_finite())
}

fn deviation(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(relative_deviation(a?, b?)).filter(|v| v.is_finite())
}

fn clear(table: &mut Table, row: usize, columns: &[&str]) -> Result<()> {
    for column in columns {
        if table.has_column(column) {
            table.set_text(row, column, None)?;
        }
    }
    Ok(())
}

/// Preprocessed copy of a statistical database table
///
/// Deviation and tan(δ) columns are appended.
pub fn preprocess(table: &Table, thresholds: &PreprocessThresholds) -> Result<Table> {
    let mut t = table.clone();
    for column in [
        STORAGE_DEVIATION, LOSS_DEVIATION, VISCOSITY_DEVIATION,
        TAN_DELTA_LOW, TAN_DELTA_REF, TAN_DELTA_HIGH,
    ] {
        t.ensure_column(column);
    }

    let mut blanked_frequency = 0;
    let mut blanked_flow = 0;
    for row in 0..t.num_rows() {
        // 1. fill time sweep means
        if t.number(row, TS_STORAGE_MEAN).is_none() {
            let fill = t.number(row, FS_STORAGE_REF);
            t.set_number(row, TS_STORAGE_MEAN, fill)?;
        }
        if t.number(row, TS_LOSS_MEAN).is_none() {
            let fill = t.number(row, FS_LOSS_REF);
            t.set_number(row, TS_LOSS_MEAN, fill)?;
        }

        // 2. crossover limit
        if t.number(row, CROSSOVER).is_some_and(|c| c > thresholds.crossover_max) {
            t.set_number(row, CROSSOVER, None)?;
        }

        // 3. Cross plausibility
        let eta_0_high = t.number(row, ZERO_RATE_VISCOSITY).is_some_and(|v| v > thresholds.eta_0_max);
        let eta_inf_low = t.number(row, INFINITE_RATE_VISCOSITY).is_some_and(|v| v < thresholds.eta_inf_min);
        if eta_0_high || eta_inf_low {
            clear(&mut t, row, &CROSS_GROUP)?;
        }

        // 4. deviations
        let storage_dev = deviation(t.number(row, TS_STORAGE_MEAN), t.number(row, FS_STORAGE_REF));
        let loss_dev = deviation(t.number(row, TS_LOSS_MEAN), t.number(row, FS_LOSS_REF));
        let viscosity_dev = deviation(t.number(row, FS_VISCOSITY), t.number(row, FLOW_VISCOSITY));
        t.set_number(row, STORAGE_DEVIATION, storage_dev)?;
        t.set_number(row, LOSS_DEVIATION, loss_dev)?;
        t.set_number(row, VISCOSITY_DEVIATION, viscosity_dev)?;

        // 5. inconsistent tests
        let limit = thresholds.deviation_limit;
        if storage_dev.is_some_and(|d| d > limit) || loss_dev.is_some_and(|d| d > limit) {
            clear(&mut t, row, &FREQUENCY_GROUP)?;
            blanked_frequency += 1;
        }
        if viscosity_dev.is_some_and(|d| d > limit) {
            clear(&mut t, row, &FLOW_GROUP)?;
            blanked_flow += 1;
        }

        // 6. tan(δ)
        let low = ratio(t.number(row, FS_LOSS_LOW), t.number(row, FS_STORAGE_LOW));
        let reference = ratio(t.number(row, TS_LOSS_MEAN), t.number(row, TS_STORAGE_MEAN));
        let high = ratio(t.number(row, FS_LOSS_HIGH), t.number(row, FS_STORAGE_HIGH));
        t.set_number(row, TAN_DELTA_LOW, low)?;
        t.set_number(row, TAN_DELTA_REF, reference)?;
        t.set_number(row, TAN_DELTA_HIGH, high)?;
    }
    debug!(rows = t.num_rows(), blanked_frequency, blanked_flow, "preprocessed statistical database");
    Ok(t)
}
