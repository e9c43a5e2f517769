/// Per-sample analysis driver
///
/// Runs every analysis whose test is present in the export and keeps both
/// the series and the derived values, so the report can draw figures from
/// the same data the statistical database is filled from.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::cox_merz::{analyze_cox_merz, CoxMerzResult};
use crate::analysis::export::{ExperimentExport, FlowStepData, FrequencySweepData, TimeSweepData};
use crate::analysis::flow_step::{analyze_flow_step, CrossSource, FlowStepResult, FlowTargets};
use crate::analysis::frequency_sweep::{analyze_frequency_sweep, FrequencySweepResult, FrequencyTargets};
use crate::analysis::time_sweep::{analyze_time_sweep, TimeSweepResult, TimeWindow};
use crate::error::Result;
use crate::utils::{relative_deviation, to_percent};

/// Reading targets for the sweeps
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct AnalysisTargets {
    #[serde(default)]
    pub frequency: FrequencyTargets,
    #[serde(default)]
    pub flow: FlowTargets,
}

#[derive(Debug, Clone, Default)]
pub struct SampleAnalysis {
    pub sample_id: String,
    pub time_data: Option<TimeSweepData>,
    pub time_sweep: Option<TimeSweepResult>,
    pub frequency_data: Option<FrequencySweepData>,
    pub frequency_sweep: Option<FrequencySweepResult>,
    pub flow_data: Option<FlowStepData>,
    pub flow_step: Option<FlowStepResult>,
    pub cox_merz: Option<CoxMerzResult>,
}

/// Analyse all tests found in `export`
///
/// Absent tests are logged and left as `None`. A time window that selects
/// no points drops the time sweep result but keeps its series.
pub fn analyze_sample(export: &ExperimentExport, window: TimeWindow, targets: &AnalysisTargets) -> Result<SampleAnalysis> {
    let mut analysis = SampleAnalysis {
        sample_id: export.sample_id.clone(),
        ..Default::default()
    };

    if export.has_time_sweep() {
        let data = export.time_sweep()?;
        match analyze_time_sweep(&data, window) {
            Ok(result) => analysis.time_sweep = Some(result),
            Err(e) => warn!(sample = %export.sample_id, error = %e, "time sweep skipped"),
        }
        analysis.time_data = Some(data);
    } else {
        info!(sample = %export.sample_id, "no time sweep data");
    }

    if export.has_frequency_sweep() {
        let data = export.frequency_sweep()?;
        analysis.frequency_sweep = Some(analyze_frequency_sweep(&data, &targets.frequency));
        analysis.frequency_data = Some(data);
    } else {
        info!(sample = %export.sample_id, "no frequency sweep data");
    }

    if export.has_flow_step() {
        let data = export.flow_step()?;
        analysis.flow_step = Some(analyze_flow_step(&data, export.instrument_cross_fit(), &targets.flow));
        analysis.flow_data = Some(data);
    } else {
        info!(sample = %export.sample_id, "no flow step data");
    }

    if export.has_frequency_sweep() && export.has_flow_step() {
        analysis.cox_merz = Some(analyze_cox_merz(export, &targets.frequency, &targets.flow)?);
    }

    Ok(analysis)
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}

impl SampleAnalysis {
    /// Percent difference between the time sweep mean and the frequency
    /// sweep reading at the reference frequency, for (G', G'')
    pub fn time_frequency_differences(&self) -> (Option<f64>, Option<f64>) {
        let (Some(ts), Some(reading)) = (self.time_sweep, self.frequency_sweep.as_ref().and_then(|f| f.reference))
        else {
            return (None, None);
        };
        (
            Some(to_percent(relative_deviation(ts.storage_mean, reading.storage))),
            Some(to_percent(relative_deviation(ts.loss_mean, reading.loss))),
        )
    }

    /// Operator tables on stdout
    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════");
        println!("  Sample {}", self.sample_id);
        println!("═══════════════════════════════════════════════════════════");

        if let Some(ts) = &self.time_sweep {
            println!("\nTime sweep ({} - {} min, {} points)", ts.window.start_min(), ts.window.finish_min(), ts.points);
            println!("  {:<10} {:>12} {:>12}", "", "Mean (Pa)", "Std (-)");
            println!("  {:<10} {:>12.4} {:>12.4}", "G'", ts.storage_mean, ts.storage_std);
            println!("  {:<10} {:>12.4} {:>12.4}", "G''", ts.loss_mean, ts.loss_std);
        }

        if let Some(fs) = &self.frequency_sweep {
            println!("\nFrequency sweep");
            println!("  {:<14} {:>12} {:>12} {:>12} {:>10}", "ω (rad/s)", "G' (Pa)", "G'' (Pa)", "|η*| (Pa.s)", "tan(δ)");
            for reading in [fs.low, fs.reference, fs.high].iter().flatten() {
                println!(
                    "  {:<14} {:>12.4} {:>12.4} {:>12.4} {:>10.4}",
                    reading.frequency, reading.storage, reading.loss, reading.complex_viscosity, reading.tan_delta()
                );
            }
            println!("  Crossover: {} rad/s", cell(fs.crossover_frequency()));
            let (d_storage, d_loss) = self.time_frequency_differences();
            if d_storage.is_some() {
                println!("  Time/frequency sweep difference (%): G' {}  G'' {}", cell(d_storage), cell(d_loss));
            }
        }

        if let Some(flow) = &self.flow_step {
            let source = match flow.source {
                CrossSource::Instrument => "instrument",
                CrossSource::Fitted => "fitted",
            };
            println!("\nFlow step (Cross parameters, {})", source);
            let p = flow.cross;
            println!("  Zero-rate viscosity (Pa.s):     {}", cell(p.map(|p| p.eta_0)));
            println!("  Infinite-rate viscosity (Pa.s): {}", cell(p.map(|p| p.eta_inf)));
            println!("  Consistency (s):                {}", cell(p.map(|p| p.consistency)));
            println!("  Rate index (-):                 {}", cell(p.map(|p| p.rate_index)));
            println!("  Standard error:                 {}", cell(flow.standard_error));
            println!("  Viscosity at target rate:       {}", cell(flow.viscosity_at_target));
        }

        if let Some(cm) = &self.cox_merz {
            println!("\nCox-Merz");
            println!("  Flow step viscosity (Pa.s):       {}", cell(cm.steady_viscosity));
            println!("  Frequency sweep viscosity (Pa.s): {}", cell(cm.dynamic_viscosity));
            println!("  Deviation (%):                    {}", cell(cm.deviation().map(to_percent)));
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::export::fixtures::full_export;
    use crate::analysis::export::{TIME, TS_LOSS, TS_STORAGE};
    use crate::database::table::Table;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_export_analysis() {
        let analysis = analyze_sample(&full_export(), TimeWindow::default(), &AnalysisTargets::default()).unwrap();
        assert_eq!(analysis.sample_id, "S1");

        // Window 0.5..=5.0 holds all 10 points
        let ts = analysis.time_sweep.unwrap();
        assert_eq!(ts.points, 10);
        assert_relative_eq!(ts.storage_mean, 2.05, epsilon = 1e-12);
        assert_relative_eq!(ts.storage_std, 0.05, epsilon = 1e-12);

        assert!(analysis.frequency_sweep.is_some());
        assert!(analysis.flow_step.is_some());
        assert!(analysis.cox_merz.is_some());

        let (d_storage, d_loss) = analysis.time_frequency_differences();
        assert_relative_eq!(d_storage.unwrap(), 100.0 * 0.05 / 2.025, epsilon = 1e-9);
        assert_relative_eq!(d_loss.unwrap(), 100.0 * 0.05 / 1.775, epsilon = 1e-9);
    }

    #[test]
    fn test_time_only_export() {
        let mut table = Table::new(&[TIME, TS_STORAGE, TS_LOSS]);
        table.push_row(vec![Some("1".into()), Some("3".into()), Some("1".into())]);
        let export = ExperimentExport::new("S4", table);
        let analysis = analyze_sample(&export, TimeWindow::default(), &AnalysisTargets::default()).unwrap();
        assert!(analysis.time_sweep.is_some());
        assert!(analysis.frequency_sweep.is_none());
        assert!(analysis.flow_step.is_none());
        assert!(analysis.cox_merz.is_none());
        assert_eq!(analysis.time_frequency_differences(), (None, None));
    }

    #[test]
    fn test_empty_window_keeps_series() {
        let window = TimeWindow::new(100.0, 200.0).unwrap();
        let analysis = analyze_sample(&full_export(), window, &AnalysisTargets::default()).unwrap();
        assert!(analysis.time_sweep.is_none());
        assert!(analysis.time_data.is_some());
    }
}
