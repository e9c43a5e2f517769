/// Frequency sweep analysis
///
/// Reads G', G'' and |η*| at the standard frequencies (0.68, 3.142 and
/// 14.58 rad/s) and locates the crossover point where the dominant modulus
/// changes.
///
/// Rows with a phase angle at or above the cutoff (90° by default) are
/// instrument artefacts at the top of the frequency range: a reading that
/// lands on such a row is reported as missing, and the crossover scan skips
/// them.

use serde::{Deserialize, Serialize};

use crate::analysis::export::FrequencySweepData;

/// Frequencies at which the sweep is read, and how strictly
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FrequencyTargets {
    /// Low reading frequency (rad/s)
    #[serde(default = "default_low")]
    pub low: f64,
    /// Reference frequency shared with the time sweep (rad/s)
    #[serde(default = "default_reference")]
    pub reference: f64,
    /// High reading frequency (rad/s)
    #[serde(default = "default_high")]
    pub high: f64,
    /// Maximum relative distance between a target and the row used for it
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Rows with delta at or above this value (degrees) are not readable
    #[serde(default = "default_delta_cutoff")]
    pub delta_cutoff_deg: f64,
}

fn default_low() -> f64 { 0.68 }
fn default_reference() -> f64 { 3.142 }
fn default_high() -> f64 { 14.58 }
fn default_tolerance() -> f64 { 0.05 }
fn default_delta_cutoff() -> f64 { 90.0 }

impl Default for FrequencyTargets {
    fn default() -> Self {
        Self {
            low: default_low(),
            reference: default_reference(),
            high: default_high(),
            tolerance: default_tolerance(),
            delta_cutoff_deg: default_delta_cutoff(),
        }
    }
}

/// Storage or loss modulus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulus {
    Storage,
    Loss,
}

/// Where G' and G'' swap order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossover {
    /// Angular frequency of the first row after the swap (rad/s)
    pub frequency: f64,
    /// Row index in the sweep
    pub index: usize,
    /// Modulus that dominated before the crossover
    pub dominant_before: Modulus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuliReading {
    pub frequency: f64,
    pub storage: f64,
    pub loss: f64,
    pub complex_viscosity: f64,
    pub delta_deg: f64,
}

impl ModuliReading {
    pub fn tan_delta(&self) -> f64 {
        self.loss / self.storage
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySweepResult {
    pub low: Option<ModuliReading>,
    pub reference: Option<ModuliReading>,
    pub high: Option<ModuliReading>,
    pub crossover: Option<Crossover>,
}

impl FrequencySweepResult {
    /// |η*| at the reference frequency
    pub fn complex_viscosity(&self) -> Option<f64> {
        self.reference.map(|r| r.complex_viscosity)
    }

    pub fn crossover_frequency(&self) -> Option<f64> {
        self.crossover.map(|c| c.frequency)
    }
}

/// Index of the row nearest `target` on a log-frequency scale, if within
/// `tolerance` (relative)
pub fn nearest_row(frequencies: &[f64], target: f64, tolerance: f64) -> Option<usize> {
    let (index, freq) = frequencies
        .iter()
        .enumerate()
        .filter(|(_, f)| **f > 0.0)
        .min_by(|(_, a), (_, b)| {
            let da = (a.ln() - target.ln()).abs();
            let db = (b.ln() - target.ln()).abs();
            da.total_cmp(&db)
        })?;
    if ((freq - target) / target).abs() <= tolerance {
        Some(index)
    } else {
        None
    }
}

/// Scan for the first row where the initially larger modulus becomes
/// strictly smaller
///
/// The larger modulus is fixed by the first row; ties there count as
/// loss-dominated.
pub fn find_crossover(frequency: &[f64], storage: &[f64], loss: &[f64]) -> Option<Crossover> {
    let first_storage = *storage.first()?;
    let first_loss = *loss.first()?;
    let dominant_before = if first_storage > first_loss {
        Modulus::Storage
    } else {
        Modulus::Loss
    };

    storage
        .iter()
        .zip(loss)
        .position(|(g1, g2)| match dominant_before {
            Modulus::Storage => g1 < g2,
            Modulus::Loss => g2 < g1,
        })
        .map(|index| Crossover {
            frequency: frequency[index],
            index,
            dominant_before,
        })
}

pub fn analyze_frequency_sweep(data: &FrequencySweepData, targets: &FrequencyTargets) -> FrequencySweepResult {
    let reading_at = |target: f64| -> Option<ModuliReading> {
        let i = nearest_row(&data.frequency, target, targets.tolerance)?;
        if data.delta_deg[i] >= targets.delta_cutoff_deg {
            return None;
        }
        Some(ModuliReading {
            frequency: data.frequency[i],
            storage: data.storage[i],
            loss: data.loss[i],
            complex_viscosity: data.complex_viscosity[i],
            delta_deg: data.delta_deg[i],
        })
    };

    let readable: Vec<usize> = (0..data.frequency.len())
        .filter(|&i| data.delta_deg[i] < targets.delta_cutoff_deg)
        .collect();
    let pick = |series: &[f64]| -> Vec<f64> { readable.iter().map(|&i| series[i]).collect() };
    let crossover = find_crossover(&pick(&data.frequency), &pick(&data.storage), &pick(&data.loss))
        .map(|c| Crossover { index: readable[c.index], ..c });

    FrequencySweepResult {
        low: reading_at(targets.low),
        reference: reading_at(targets.reference),
        high: reading_at(targets.high),
        crossover,
    }
}
