//! Rheometer test analysis
//!
//! One module per test type, plus the Cross model fit and the Cox-Merz
//! check that combines two of them. `sample` drives them all for one export.

pub mod export;
pub mod time_sweep;
pub mod frequency_sweep;
pub mod cross_model;
pub mod flow_step;
pub mod cox_merz;
pub mod sample;

pub use export::{export_path, ExperimentExport, FlowStepData, FrequencySweepData, InstrumentCrossFit, TimeSweepData};
pub use time_sweep::{analyze_time_sweep, TimeSweepResult, TimeWindow};
pub use frequency_sweep::{analyze_frequency_sweep, find_crossover, Crossover, FrequencySweepResult, FrequencyTargets, Modulus};
pub use cross_model::{cross_viscosity, fit_cross_model, CrossFit, CrossFitConfig, CrossFitStats, CrossParameters};
pub use flow_step::{analyze_flow_step, CrossSource, FlowStepResult, FlowTargets};
pub use cox_merz::{analyze_cox_merz, CoxMerzResult};
pub use sample::{analyze_sample, AnalysisTargets, SampleAnalysis};
