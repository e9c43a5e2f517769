//! Per-sample rheometer export
//!
//! The instrument software exports all tests of one sample side by side in a
//! single sheet; the frequency sweep's moduli carry a `.1` suffix to keep
//! them apart from the time sweep's. Each test is detected by the presence
//! of its key column.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::database::table::Table;
use crate::error::Result;

pub const TIME: &str = "time (min)";
pub const TS_STORAGE: &str = "G' (Pa)";
pub const TS_LOSS: &str = "G'' (Pa)";

pub const ANGULAR_FREQUENCY: &str = "ang. Frequency (rad/s)";
pub const FS_STORAGE: &str = "G' (Pa).1";
pub const FS_LOSS: &str = "G'' (Pa).1";
pub const COMPLEX_VISCOSITY: &str = "|n*| (Pa.s)";
pub const PHASE_ANGLE: &str = "delta (degrees)";

pub const SHEAR_RATE: &str = "shear rate (1/s)";
pub const VISCOSITY: &str = "viscosity (Pa.s)";

pub const FIT_ZERO_RATE: &str = "zero-rate viscosity (Pa.s)";
pub const FIT_INFINITE_RATE: &str = "infinite-rate viscosity (Pa.s)";
pub const FIT_CONSISTENCY: &str = "consistency (s)";
pub const FIT_RATE_INDEX: &str = "rate index (-)";
pub const FIT_STANDARD_ERROR: &str = "standard error";

/// Location of a sample's export inside the experiment directory
pub fn export_path(experiment_dir: &Path, sample_id: &str) -> PathBuf {
    experiment_dir.join(format!("{}.csv", sample_id))
}

/// Time sweep series (complete rows only)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSweepData {
    pub time_min: Vec<f64>,
    pub storage: Vec<f64>,
    pub loss: Vec<f64>,
}

/// Frequency sweep series (complete rows only, instrument order)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencySweepData {
    pub frequency: Vec<f64>,
    pub storage: Vec<f64>,
    pub loss: Vec<f64>,
    pub complex_viscosity: Vec<f64>,
    pub delta_deg: Vec<f64>,
}

/// Flow step series (complete rows only)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowStepData {
    pub shear_rate: Vec<f64>,
    pub viscosity: Vec<f64>,
}

/// Cross parameters as reported by the instrument software
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentCrossFit {
    pub eta_0: f64,
    pub eta_inf: f64,
    pub consistency: f64,
    pub rate_index: f64,
    pub standard_error: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExperimentExport {
    pub sample_id: String,
    table: Table,
}

impl ExperimentExport {
    pub fn new(sample_id: &str, table: Table) -> Self {
        Self { sample_id: sample_id.to_string(), table }
    }

    pub fn load(experiment_dir: &Path, sample_id: &str) -> Result<Self> {
        let path = export_path(experiment_dir, sample_id);
        let table = Table::load(&path)?;
        debug!(sample = sample_id, rows = table.num_rows(), "loaded export");
        Ok(Self::new(sample_id, table))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn has_time_sweep(&self) -> bool {
        self.table.has_column(TIME)
    }

    pub fn has_frequency_sweep(&self) -> bool {
        self.table.has_column(ANGULAR_FREQUENCY)
    }

    pub fn has_flow_step(&self) -> bool {
        self.table.has_column(SHEAR_RATE)
    }

    pub fn time_sweep(&self) -> Result<TimeSweepData> {
        let mut cols = self.table.complete_numeric(&[TIME, TS_STORAGE, TS_LOSS])?.into_iter();
        Ok(TimeSweepData {
            time_min: cols.next().unwrap_or_default(),
            storage: cols.next().unwrap_or_default(),
            loss: cols.next().unwrap_or_default(),
        })
    }

    pub fn frequency_sweep(&self) -> Result<FrequencySweepData> {
        let mut cols = self
            .table
            .complete_numeric(&[ANGULAR_FREQUENCY, FS_STORAGE, FS_LOSS, COMPLEX_VISCOSITY, PHASE_ANGLE])?
            .into_iter();
        Ok(FrequencySweepData {
            frequency: cols.next().unwrap_or_default(),
            storage: cols.next().unwrap_or_default(),
            loss: cols.next().unwrap_or_default(),
            complex_viscosity: cols.next().unwrap_or_default(),
            delta_deg: cols.next().unwrap_or_default(),
        })
    }

    pub fn flow_step(&self) -> Result<FlowStepData> {
        let mut cols = self.table.complete_numeric(&[SHEAR_RATE, VISCOSITY])?.into_iter();
        Ok(FlowStepData {
            shear_rate: cols.next().unwrap_or_default(),
            viscosity: cols.next().unwrap_or_default(),
        })
    }

    /// Instrument Cross fit from the first data row, when all four
    /// parameters are present
    pub fn instrument_cross_fit(&self) -> Option<InstrumentCrossFit> {
        let t = &self.table;
        Some(InstrumentCrossFit {
            eta_0: t.number(0, FIT_ZERO_RATE)?,
            eta_inf: t.number(0, FIT_INFINITE_RATE)?,
            consistency: t.number(0, FIT_CONSISTENCY)?,
            rate_index: t.number(0, FIT_RATE_INDEX)?,
            standard_error: t.number(0, FIT_STANDARD_ERROR),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Export with all three tests, shaped like a real instrument sheet:
    /// frequency sweep rows shorter than the time sweep, delta > 90 at the
    /// top of the frequency range.
    pub fn full_export() -> ExperimentExport {
        let headers = [
            TIME, TS_STORAGE, TS_LOSS,
            ANGULAR_FREQUENCY, FS_STORAGE, FS_LOSS, COMPLEX_VISCOSITY, PHASE_ANGLE,
            SHEAR_RATE, VISCOSITY,
        ];
        let mut table = Table::new(&headers);
        let freqs: [f64; 7] = [0.1, 0.68, 1.5, 3.142, 6.8, 14.58, 31.4];
        let storage: [f64; 7] = [0.05, 0.4, 1.1, 2.0, 3.0, 3.9, 4.2];
        let loss: [f64; 7] = [0.3, 0.8, 1.3, 1.8, 2.2, 2.6, 3.0];
        let deltas = [80.0, 63.0, 50.0, 42.0, 36.0, 34.0, 120.0];
        let rates = [0.1, 0.316, 1.0, 3.162, 10.0, 31.62, 100.0, 316.2];
        for i in 0..10 {
            let mut row: Vec<Option<String>> = Vec::new();
            let t = 0.5 * (i + 1) as f64;
            row.push(Some(t.to_string()));
            row.push(Some((2.0 + 0.1 * (i % 2) as f64).to_string()));
            row.push(Some((1.8 - 0.1 * (i % 2) as f64).to_string()));
            if i < freqs.len() {
                let eta_star = (storage[i] * storage[i] + loss[i] * loss[i]).sqrt() / freqs[i];
                row.push(Some(freqs[i].to_string()));
                row.push(Some(storage[i].to_string()));
                row.push(Some(loss[i].to_string()));
                row.push(Some(eta_star.to_string()));
                row.push(Some(deltas[i].to_string()));
            } else {
                row.extend(std::iter::repeat(None).take(5));
            }
            if i < rates.len() {
                let eta = crate::analysis::cross_model::cross_viscosity(rates[i], 2.0, 0.01, 0.5, 0.8);
                row.push(Some(rates[i].to_string()));
                row.push(Some(eta.to_string()));
            } else {
                row.extend(std::iter::repeat(None).take(2));
            }
            table.push_row(row);
        }
        ExperimentExport::new("S1", table)
    }
}
