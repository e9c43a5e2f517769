//! Cohort-level statistics over the statistical database
//!
//! - `preprocess`: plausibility filtering and derived columns
//! - `selection`: cohort filters, log transform, long-format reshaping
//! - `ttest`: descriptive statistics and two-sample t-tests
//! - `biomarker`: threshold biomarkers against the OA diagnosis
//! - `monte_carlo`: multivariate normal augmentation
//! - `logistic`: healthy/OA logistic regression

pub mod preprocess;
pub mod selection;
pub mod ttest;
pub mod biomarker;
pub mod monte_carlo;
pub mod logistic;

pub use preprocess::{preprocess, PreprocessThresholds};
pub use selection::{log_transform, melt, relabel_yes_no, select, CohortFilter, MeltedRow, COMPARISON_COLUMNS};
pub use ttest::{compare_groups, two_sample_t_test, Describe, GroupComparison, Hypothesis};
pub use biomarker::{default_biomarkers, validate_biomarkers, Biomarker, BiomarkerValidation, Direction};
pub use monte_carlo::{augment, multivariate_normal_sampling, LabeledDataset, MonteCarloSettings};
pub use logistic::{logistic_regression, LogisticReport, LogisticSettings};

use std::path::Path;
use tracing::{info, warn};

use crate::config::LabConfig;
use crate::database::stat_db::{BLOOD, CONDITION, FREEZER, GENDER, ID};
use crate::database::table::Table;
use crate::error::{Result, RheoError};
use crate::records::choices::{Condition, Gender};
use crate::report::figures::box_plot_figure;
use selection::{CROSSOVER_COLUMNS, MODULI_COLUMNS, TAN_DELTA_COLUMNS, VISCOSITY_COLUMNS};

/// Cohorts built from the preprocessed database
#[derive(Debug, Clone)]
pub struct Cohorts {
    /// Clean knee samples (no blood, no tissue or clot in test)
    pub healthy: Table,
    pub oa: Table,
    pub healthy_blood: Table,
    pub oa_blood: Table,
    /// Clean plus blood cohorts (knee, no tissue or clot in test)
    pub healthy_total: Table,
    pub oa_total: Table,
}

impl Cohorts {
    pub fn build(preprocessed: &Table) -> Self {
        let clean = CohortFilter::clean_knee();
        let knee = CohortFilter::knee();
        Self {
            healthy: select(preprocessed, &clean.condition(Condition::Healthy)),
            oa: select(preprocessed, &clean.condition(Condition::Oa)),
            healthy_blood: select(preprocessed, &clean.condition(Condition::Healthy).blood(true)),
            oa_blood: select(preprocessed, &clean.condition(Condition::Oa).blood(true)),
            healthy_total: select(preprocessed, &knee.condition(Condition::Healthy)),
            oa_total: select(preprocessed, &knee.condition(Condition::Oa)),
        }
    }

    /// Every cohort with `log10(x + 1)` applied to the comparison columns
    pub fn log_transformed(&self) -> Result<Self> {
        let log = |t: &Table| log_transform(t, &COMPARISON_COLUMNS);
        Ok(Self {
            healthy: log(&self.healthy)?,
            oa: log(&self.oa)?,
            healthy_blood: log(&self.healthy_blood)?,
            oa_blood: log(&self.oa_blood)?,
            healthy_total: log(&self.healthy_total)?,
            oa_total: log(&self.oa_total)?,
        })
    }

    pub fn print_sizes(&self) {
        println!("Cohort sizes:");
        println!("  Healthy (clean):  {:>4}    OA (clean):  {:>4}", self.healthy.num_rows(), self.oa.num_rows());
        println!("  Healthy (blood):  {:>4}    OA (blood):  {:>4}", self.healthy_blood.num_rows(), self.oa_blood.num_rows());
        println!("  Healthy (total):  {:>4}    OA (total):  {:>4}", self.healthy_total.num_rows(), self.oa_total.num_rows());
    }
}

/// Everything the cohort run produced
#[derive(Debug, Clone)]
pub struct CohortSummary {
    /// (comparison name, per-column results)
    pub comparisons: Vec<(String, Vec<GroupComparison>)>,
    pub biomarkers: Vec<BiomarkerValidation>,
    pub logistic: Option<LogisticReport>,
}

/// Figure name, population and grouping column of each box plot set
///
/// Plots use the untransformed values.
pub fn figure_populations(cohorts: &Cohorts) -> [(&'static str, Table, &'static str); 4] {
    [
        ("condition", cohorts.healthy_total.concat(&cohorts.oa_total), CONDITION),
        ("oa_blood", cohorts.oa_total.clone(), BLOOD),
        ("oa_storage", cohorts.oa.clone(), FREEZER),
        ("gender", cohorts.oa_total.clone(), GENDER),
    ]
}

/// Long-format rows for one panel, yes/no groups relabelled for the legend
pub fn figure_rows(table: &Table, group_column: &str, columns: &[(&str, &str)]) -> Vec<MeltedRow> {
    let mut rows = melt(table, group_column, columns);
    match group_column {
        BLOOD => relabel_yes_no(&mut rows, "With", "Without"),
        FREEZER => relabel_yes_no(&mut rows, "Frozen", "Not Frozen"),
        _ => {}
    }
    rows
}

fn box_plots(dir: &Path, name: &str, table: &Table, group_column: &str) -> Result<()> {
    let panels: [(&str, &[(&str, &str)], &str); 4] = [
        ("moduli", &MODULI_COLUMNS, "G', G'' (Pa)"),
        ("viscosity", &VISCOSITY_COLUMNS, "η, |η*| (Pa s)"),
        ("crossover", &CROSSOVER_COLUMNS, "Cross-over point (rad/s)"),
        ("tan_delta", &TAN_DELTA_COLUMNS, "tan(δ)"),
    ];
    for (panel, columns, y_desc) in panels {
        let path = dir.join(format!("{}_{}.svg", name, panel));
        let rows = figure_rows(table, group_column, columns);
        box_plot_figure(&path, &format!("{} - {}", name, panel), y_desc, &rows)?;
    }
    Ok(())
}

fn save_comparison(dir: &Path, name: &str, results: &[GroupComparison]) -> Result<()> {
    println!("\n{}", name);
    ttest::print_comparison(results);
    ttest::comparison_table(results).save(dir.join(format!("{}_ttest.csv", name)))
}

/// Full cohort run: preprocessing, group comparisons, biomarker
/// validation, box plots, Monte Carlo augmentation and logistic regression
///
/// Tables and figures are written to `config.paths.cohort_dir`.
pub fn run_cohort_analysis(config: &LabConfig) -> Result<CohortSummary> {
    let dir = &config.paths.cohort_dir;
    std::fs::create_dir_all(dir)?;

    let table = Table::load(&config.paths.stat_database)?.dedup_by(ID)?;
    let preprocessed = preprocess(&table, &config.preprocess)?;
    preprocessed.save(dir.join("preprocessed.csv"))?;

    let cohorts = Cohorts::build(&preprocessed);
    cohorts.print_sizes();
    if cohorts.healthy.is_empty() || cohorts.oa.is_empty() {
        return Err(RheoError::EmptySelection(
            "cohort analysis needs clean healthy and OA knee samples".to_string(),
        ));
    }
    let log = cohorts.log_transformed()?;
    let alpha = config.cohort.alpha;

    // Group comparisons on log-transformed values
    let frozen = CohortFilter::default().freezer_storage(true);
    let not_frozen = CohortFilter::default().freezer_storage(false);
    let males = CohortFilter::default().gender(Gender::Male);
    let females = CohortFilter::default().gender(Gender::Female);
    let pairs: [(&str, Table, Table); 6] = [
        ("healthy_vs_oa", log.healthy.clone(), log.oa.clone()),
        ("healthy_total_vs_oa_total", log.healthy_total.clone(), log.oa_total.clone()),
        ("oa_vs_oa_blood", log.oa.clone(), log.oa_blood.clone()),
        ("healthy_vs_healthy_blood", log.healthy.clone(), log.healthy_blood.clone()),
        ("oa_frozen_vs_not_frozen", select(&log.oa, &frozen), select(&log.oa, &not_frozen)),
        ("oa_male_vs_female", select(&log.oa, &males), select(&log.oa, &females)),
    ];
    let mut comparisons = Vec::with_capacity(pairs.len());
    for (name, first, second) in &pairs {
        let results = compare_groups(first, second, &COMPARISON_COLUMNS, alpha)?;
        save_comparison(dir, name, &results)?;
        comparisons.push((name.to_string(), results));
    }

    // Biomarkers on the clean, untransformed values
    let clean = cohorts.healthy.concat(&cohorts.oa);
    let biomarkers = validate_biomarkers(&clean, &config.biomarkers)?;
    println!("\nBiomarker validation");
    biomarker::print_validation(&biomarkers);
    biomarker::validation_table(&biomarkers).save(dir.join("biomarkers.csv"))?;

    // Box plots
    for (name, table, group_column) in figure_populations(&cohorts) {
        box_plots(dir, name, &table, group_column)?;
    }
    info!(dir = %dir.display(), "cohort figures written");

    // Monte Carlo augmentation and logistic regression
    let logistic = match augmented_dataset(&log, &config.monte_carlo) {
        Ok(dataset) => {
            let report = logistic_regression(&dataset, &config.logistic)?;
            report.print_summary();
            report.roc_table().save(dir.join("roc_curve.csv"))?;
            Some(report)
        }
        Err(e) => {
            warn!(error = %e, "Monte Carlo augmentation skipped");
            None
        }
    };

    Ok(CohortSummary { comparisons, biomarkers, logistic })
}

/// Synthetic healthy and OA cohorts, labelled and shuffled
pub fn augmented_dataset(log: &Cohorts, settings: &MonteCarloSettings) -> Result<LabeledDataset> {
    let columns: Vec<&str> = settings.columns.iter().map(String::as_str).collect();
    let healthy = multivariate_normal_sampling(&log.healthy, &columns, settings.scale_factor, settings.samples, settings.seed)?;
    let oa = multivariate_normal_sampling(
        &log.oa,
        &columns,
        settings.scale_factor,
        settings.samples,
        settings.seed.wrapping_add(1),
    )?;
    info!(healthy = healthy.len(), oa = oa.len(), "Monte Carlo cohorts drawn");
    Ok(augment(&columns, healthy, oa, settings.seed))
}
