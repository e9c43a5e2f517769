pub mod error;
pub mod utils;
pub mod records;
pub mod prompt;
pub mod database;
pub mod analysis;
pub mod report;
pub mod cohort;
pub mod config;

pub use error::{Result, RheoError};
pub use records::{SampleDescription, TestDescription, Choice};
pub use prompt::{Prompter, capture_sample, capture_tests, capture_time_window};
pub use database::{Table, SampleEntry, ExistingFile, create_database, append_sample, load_samples, find_sample, sample_columns, append_results, find_record, load_records, stat_columns, StatRecord, StatResults};
pub use analysis::{ExperimentExport, TimeWindow, TimeSweepResult, FrequencySweepResult, FrequencyTargets, FlowStepResult, FlowTargets, CoxMerzResult, CrossParameters, CrossFit, CrossFitConfig, fit_cross_model, find_crossover, analyze_sample, AnalysisTargets, SampleAnalysis};
pub use report::{ReportTemplate, SampleReport, ReportFigures, create_sample_report, ReportOutput};
pub use cohort::{run_cohort_analysis, CohortSummary, Cohorts, preprocess, PreprocessThresholds, CohortFilter, compare_groups, GroupComparison, validate_biomarkers, Biomarker, BiomarkerValidation, multivariate_normal_sampling, augment, LabeledDataset, logistic_regression, LogisticReport};
pub use config::LabConfig;
pub use utils::units;
