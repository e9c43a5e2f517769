//! Configuration management for the rheology workflow
//!
//! Reads a TOML file into structured settings for file locations, sweep
//! reading targets, cohort preprocessing thresholds, biomarkers, and the
//! Monte Carlo / logistic regression runs. Every field has a default, so an
//! empty file (or a missing section) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::flow_step::FlowTargets;
use crate::analysis::frequency_sweep::FrequencyTargets;
use crate::analysis::sample::AnalysisTargets;
use crate::analysis::time_sweep::TimeWindow;
use crate::cohort::biomarker::{default_biomarkers, Biomarker};
use crate::cohort::logistic::LogisticSettings;
use crate::cohort::monte_carlo::MonteCarloSettings;
use crate::cohort::preprocess::PreprocessThresholds;
use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub preprocess: PreprocessThresholds,
    #[serde(default)]
    pub cohort: CohortConfig,
    #[serde(default = "default_biomarkers")]
    pub biomarkers: Vec<Biomarker>,
    #[serde(default)]
    pub monte_carlo: MonteCarloSettings,
    #[serde(default)]
    pub logistic: LogisticSettings,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            analysis: AnalysisConfig::default(),
            preprocess: PreprocessThresholds::default(),
            cohort: CohortConfig::default(),
            biomarkers: default_biomarkers(),
            monte_carlo: MonteCarloSettings::default(),
            logistic: LogisticSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Sample/test descriptions
    #[serde(default = "default_sample_database")]
    pub sample_database: PathBuf,
    /// Directory holding one `<SID>.csv` instrument export per sample
    #[serde(default = "default_experiment_dir")]
    pub experiment_dir: PathBuf,
    /// Derived parameters, one row per sample
    #[serde(default = "default_stat_database")]
    pub stat_database: PathBuf,
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default = "default_report_template")]
    pub report_template: PathBuf,
    /// Cohort tables and figures
    #[serde(default = "default_cohort_dir")]
    pub cohort_dir: PathBuf,
}

fn default_sample_database() -> PathBuf { PathBuf::from("Database.csv") }
fn default_experiment_dir() -> PathBuf { PathBuf::from("Experimental_Data") }
fn default_stat_database() -> PathBuf { PathBuf::from("Statistical_Analysis_Database.csv") }
fn default_report_dir() -> PathBuf { PathBuf::from("reports") }
fn default_report_template() -> PathBuf { PathBuf::from("report_template.txt") }
fn default_cohort_dir() -> PathBuf { PathBuf::from("cohort") }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sample_database: default_sample_database(),
            experiment_dir: default_experiment_dir(),
            stat_database: default_stat_database(),
            report_dir: default_report_dir(),
            report_template: default_report_template(),
            cohort_dir: default_cohort_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Default time sweep window start (min)
    #[serde(default = "default_time_start")]
    pub time_start_min: f64,
    /// Default time sweep window end (min)
    #[serde(default = "default_time_finish")]
    pub time_finish_min: f64,
    #[serde(default)]
    pub frequency: FrequencyTargets,
    #[serde(default)]
    pub flow: FlowTargets,
}

fn default_time_start() -> f64 { 0.5 }
fn default_time_finish() -> f64 { 5.0 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            time_start_min: default_time_start(),
            time_finish_min: default_time_finish(),
            frequency: FrequencyTargets::default(),
            flow: FlowTargets::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn window(&self) -> Result<TimeWindow> {
        TimeWindow::new(self.time_start_min, self.time_finish_min)
    }

    pub fn targets(&self) -> AnalysisTargets {
        AnalysisTargets { frequency: self.frequency, flow: self.flow }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CohortConfig {
    /// Significance level of the group comparisons
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_alpha() -> f64 { 0.05 }

impl Default for CohortConfig {
    fn default() -> Self {
        Self { alpha: default_alpha() }
    }
}

impl LabConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: LabConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════════");
        println!("  Rheology Lab Configuration");
        println!("═══════════════════════════════════════════════════════════════");
        println!("Paths:");
        println!("  Sample database:      {}", self.paths.sample_database.display());
        println!("  Experiment exports:   {}", self.paths.experiment_dir.display());
        println!("  Statistical database: {}", self.paths.stat_database.display());
        println!("  Reports:              {}", self.paths.report_dir.display());
        println!("  Report template:      {}", self.paths.report_template.display());

        println!("\nAnalysis:");
        println!("  Time window: {} - {} min", self.analysis.time_start_min, self.analysis.time_finish_min);
        println!("  Frequencies: {} / {} / {} rad/s (tol {:.0}%, delta < {}°)",
            self.analysis.frequency.low,
            self.analysis.frequency.reference,
            self.analysis.frequency.high,
            self.analysis.frequency.tolerance * 100.0,
            self.analysis.frequency.delta_cutoff_deg);
        println!("  Shear rate:  {} 1/s", self.analysis.flow.shear_rate);

        println!("\nPreprocessing:");
        println!("  Crossover ≤ {} rad/s, η₀ ≤ {} Pa·s, η∞ ≥ {} Pa·s, deviation ≤ {}",
            self.preprocess.crossover_max,
            self.preprocess.eta_0_max,
            self.preprocess.eta_inf_min,
            self.preprocess.deviation_limit);

        println!("\nBiomarkers ({}):", self.biomarkers.len());
        for b in &self.biomarkers {
            println!("  {:<12} {:>6.2}  {:?}", b.name, b.threshold, b.direction);
        }

        println!("\nStatistics:");
        println!("  α = {}", self.cohort.alpha);
        println!("  Monte Carlo: {} draws, scale {}, seed {}",
            self.monte_carlo.samples, self.monte_carlo.scale_factor, self.monte_carlo.seed);
        println!("  Logistic: test {:.0}%, {} folds, C = {}, seed {}",
            self.logistic.test_fraction * 100.0,
            self.logistic.folds,
            self.logistic.c,
            self.logistic.seed);

        println!("═══════════════════════════════════════════════════════════════\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: LabConfig = toml::from_str("").unwrap();
        assert_eq!(config.paths.sample_database, PathBuf::from("Database.csv"));
        assert_eq!(config.analysis.frequency.reference, 3.142);
        assert_eq!(config.analysis.flow.shear_rate, 3.162);
        assert_eq!(config.preprocess.crossover_max, 15.0);
        assert_eq!(config.biomarkers.len(), 10);
        assert_eq!(config.logistic.folds, 5);
        assert!(config.analysis.window().is_ok());
    }

    #[test]
    fn test_partial_sections_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[paths]
experiment_dir = "exports"

[analysis]
time_finish_min = 8.0

[analysis.frequency]
tolerance = 0.1

[[biomarkers]]
name = "G'"
column = "Frequency Sweep G' at 0.68 rad/s (Pa)"
threshold = 2.18
direction = "control"
"#
        )
        .unwrap();

        let config = LabConfig::from_file(file.path()).unwrap();
        assert_eq!(config.paths.experiment_dir, PathBuf::from("exports"));
        assert_eq!(config.paths.stat_database, PathBuf::from("Statistical_Analysis_Database.csv"));
        assert_eq!(config.analysis.time_finish_min, 8.0);
        assert_eq!(config.analysis.time_start_min, 0.5);
        assert_eq!(config.analysis.frequency.tolerance, 0.1);
        assert_eq!(config.analysis.frequency.low, 0.68);
        assert_eq!(config.biomarkers.len(), 1);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis\ntime_start_min = ").unwrap();
        assert!(matches!(
            LabConfig::from_file(file.path()),
            Err(crate::error::RheoError::Config(_))
        ));
    }
}
