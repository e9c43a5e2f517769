//! Statistical database: one row per analysed sample
//!
//! Sample metadata needed for cohort selection followed by the derived
//! rheological parameters. Rows are only ever appended.

use std::path::Path;

use tracing::{info, warn};

use crate::analysis::export::{export_path, ExperimentExport};
use crate::analysis::sample::{analyze_sample, AnalysisTargets, SampleAnalysis};
use crate::analysis::time_sweep::TimeWindow;
use crate::database::sample_db::{load_samples, SampleEntry};
use crate::database::table::Table;
use crate::error::{Result, RheoError};
use crate::records::choices::{parse_yes_no, yes_no, Choice, Condition, Gender, Joint};
use crate::records::sample::{parse_count, sample_id};

pub const ID: &str = "ID";
pub const GENDER: &str = "Gender";
pub const AGE: &str = "Age";
pub const JOINT: &str = "Joint";
pub const CONDITION: &str = "Condition";
pub const BLOOD: &str = "Blood";
pub const CLOT: &str = "Clot";
pub const TISSUE: &str = "Tissue";
pub const TISSUE_OR_CLOT_IN_TEST: &str = "Tissue or Clot in Test";
pub const FREEZER: &str = "Storage in freezer";
pub const COVID: &str = "COVID 19";
pub const VACCINATED: &str = "Vaccined COVID 19";
pub const COVID_NOW: &str = "COVID 19 now";

pub const TS_STORAGE_MEAN: &str = "Time Sweep G' average (Pa)";
pub const TS_LOSS_MEAN: &str = "Time Sweep G'' average (Pa)";
pub const TS_STORAGE_STD: &str = "Time Sweep G' standard deviation (-)";
pub const TS_LOSS_STD: &str = "Time Sweep G'' standard deviation (-)";
pub const FS_STORAGE_LOW: &str = "Frequency Sweep G' at 0.68 rad/s (Pa)";
pub const FS_LOSS_LOW: &str = "Frequency Sweep G'' at 0.68 rad/s (Pa)";
pub const FS_STORAGE_REF: &str = "Frequency Sweep G' at 3.142 rad/s (Pa)";
pub const FS_LOSS_REF: &str = "Frequency Sweep G'' at 3.142 rad/s (Pa)";
pub const FS_STORAGE_HIGH: &str = "Frequency Sweep G' at 14.58 rad/s (Pa)";
pub const FS_LOSS_HIGH: &str = "Frequency Sweep G'' at 14.58 rad/s (Pa)";
pub const CROSSOVER: &str = "Cross Over Point (rad/s)";
pub const FS_VISCOSITY: &str = "Frequency Sweep Viscosity at 3.142 rad/s (Pa.s)";
pub const ZERO_RATE_VISCOSITY: &str = "Zero-rate Viscosity (Pa.s)";
pub const INFINITE_RATE_VISCOSITY: &str = "Infinite-rate Viscosity (Pa.s)";
pub const CONSISTENCY: &str = "Consistency (s)";
pub const RATE_INDEX: &str = "Rate Index (-)";
pub const STANDARD_ERROR: &str = "Standard Error (-)";
pub const FLOW_VISCOSITY: &str = "Flow Step Viscosity at 3.162 1/s (Pa.s)";

pub const METADATA_COLUMNS: [&str; 13] = [
    ID, GENDER, AGE, JOINT, CONDITION, BLOOD, CLOT, TISSUE, TISSUE_OR_CLOT_IN_TEST,
    FREEZER, COVID, VACCINATED, COVID_NOW,
];

pub const RESULT_COLUMNS: [&str; 18] = [
    TS_STORAGE_MEAN, TS_LOSS_MEAN, TS_STORAGE_STD, TS_LOSS_STD,
    FS_STORAGE_LOW, FS_LOSS_LOW, FS_STORAGE_REF, FS_LOSS_REF, FS_STORAGE_HIGH, FS_LOSS_HIGH,
    CROSSOVER, FS_VISCOSITY,
    ZERO_RATE_VISCOSITY, INFINITE_RATE_VISCOSITY, CONSISTENCY, RATE_INDEX, STANDARD_ERROR,
    FLOW_VISCOSITY,
];

/// All 31 columns in file order
pub fn stat_columns() -> Vec<&'static str> {
    METADATA_COLUMNS.iter().chain(RESULT_COLUMNS.iter()).copied().collect()
}

/// Derived parameters of one sample; `None` where a test was absent or a
/// reading could not be taken
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatResults {
    pub ts_storage_mean: Option<f64>,
    pub ts_loss_mean: Option<f64>,
    pub ts_storage_std: Option<f64>,
    pub ts_loss_std: Option<f64>,
    pub fs_storage_low: Option<f64>,
    pub fs_loss_low: Option<f64>,
    pub fs_storage_ref: Option<f64>,
    pub fs_loss_ref: Option<f64>,
    pub fs_storage_high: Option<f64>,
    pub fs_loss_high: Option<f64>,
    pub crossover: Option<f64>,
    pub fs_viscosity: Option<f64>,
    pub eta_0: Option<f64>,
    pub eta_inf: Option<f64>,
    pub consistency: Option<f64>,
    pub rate_index: Option<f64>,
    pub standard_error: Option<f64>,
    pub flow_viscosity: Option<f64>,
}

impl StatResults {
    pub fn from_analysis(analysis: &SampleAnalysis) -> Self {
        let mut r = Self::default();
        if let Some(ts) = &analysis.time_sweep {
            r.ts_storage_mean = Some(ts.storage_mean);
            r.ts_loss_mean = Some(ts.loss_mean);
            r.ts_storage_std = Some(ts.storage_std);
            r.ts_loss_std = Some(ts.loss_std);
        }
        if let Some(fs) = &analysis.frequency_sweep {
            r.fs_storage_low = fs.low.map(|m| m.storage);
            r.fs_loss_low = fs.low.map(|m| m.loss);
            r.fs_storage_ref = fs.reference.map(|m| m.storage);
            r.fs_loss_ref = fs.reference.map(|m| m.loss);
            r.fs_storage_high = fs.high.map(|m| m.storage);
            r.fs_loss_high = fs.high.map(|m| m.loss);
            r.crossover = fs.crossover_frequency();
            r.fs_viscosity = fs.complex_viscosity();
        }
        if let Some(flow) = &analysis.flow_step {
            r.eta_0 = flow.cross.map(|p| p.eta_0);
            r.eta_inf = flow.cross.map(|p| p.eta_inf);
            r.consistency = flow.cross.map(|p| p.consistency);
            r.rate_index = flow.cross.map(|p| p.rate_index);
            r.standard_error = flow.standard_error;
            r.flow_viscosity = flow.viscosity_at_target;
        }
        r
    }

    /// Values in `RESULT_COLUMNS` order
    pub fn values(&self) -> [Option<f64>; 18] {
        [
            self.ts_storage_mean, self.ts_loss_mean, self.ts_storage_std, self.ts_loss_std,
            self.fs_storage_low, self.fs_loss_low, self.fs_storage_ref, self.fs_loss_ref,
            self.fs_storage_high, self.fs_loss_high, self.crossover, self.fs_viscosity,
            self.eta_0, self.eta_inf, self.consistency, self.rate_index, self.standard_error,
            self.flow_viscosity,
        ]
    }

    pub fn from_values(v: [Option<f64>; 18]) -> Self {
        Self {
            ts_storage_mean: v[0],
            ts_loss_mean: v[1],
            ts_storage_std: v[2],
            ts_loss_std: v[3],
            fs_storage_low: v[4],
            fs_loss_low: v[5],
            fs_storage_ref: v[6],
            fs_loss_ref: v[7],
            fs_storage_high: v[8],
            fs_loss_high: v[9],
            crossover: v[10],
            fs_viscosity: v[11],
            eta_0: v[12],
            eta_inf: v[13],
            consistency: v[14],
            rate_index: v[15],
            standard_error: v[16],
            flow_viscosity: v[17],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub id: String,
    pub gender: Gender,
    pub age: u32,
    pub joint: Joint,
    pub condition: Condition,
    pub blood: bool,
    pub clot: bool,
    pub tissue: bool,
    pub tissue_or_clot_in_test: bool,
    pub freezer_storage: bool,
    pub covid: bool,
    pub vaccinated: bool,
    pub covid_now: bool,
    pub results: StatResults,
}

impl StatRecord {
    pub fn new(entry: &SampleEntry, results: StatResults) -> Self {
        let s = &entry.sample;
        Self {
            id: s.id(),
            gender: s.gender,
            age: s.age,
            joint: s.joint,
            condition: s.condition,
            blood: s.blood,
            clot: s.clot,
            tissue: s.tissue,
            tissue_or_clot_in_test: entry.tissue_or_clot_in_test(),
            freezer_storage: s.freezer_storage,
            covid: s.covid,
            vaccinated: s.vaccinated,
            covid_now: s.covid_now,
            results,
        }
    }

    /// Cells keyed by column name, metadata then results
    fn cells(&self) -> Vec<(&'static str, Option<String>)> {
        let text = |v: &str| Some(v.to_string());
        let mut cells = vec![
            (ID, text(&self.id)),
            (GENDER, text(self.gender.label())),
            (AGE, Some(self.age.to_string())),
            (JOINT, text(self.joint.label())),
            (CONDITION, text(self.condition.label())),
            (BLOOD, text(yes_no(self.blood))),
            (CLOT, text(yes_no(self.clot))),
            (TISSUE, text(yes_no(self.tissue))),
            (TISSUE_OR_CLOT_IN_TEST, text(yes_no(self.tissue_or_clot_in_test))),
            (FREEZER, text(yes_no(self.freezer_storage))),
            (COVID, text(yes_no(self.covid))),
            (VACCINATED, text(yes_no(self.vaccinated))),
            (COVID_NOW, text(yes_no(self.covid_now))),
        ];
        for (column, value) in RESULT_COLUMNS.iter().zip(self.results.values()) {
            cells.push((*column, value.filter(|v| v.is_finite()).map(crate::database::table::format_number)));
        }
        cells
    }

    /// Append as a new row of `table`, adding any missing column
    pub fn push_to(&self, table: &mut Table) {
        let cells = self.cells();
        for (column, _) in &cells {
            table.ensure_column(column);
        }
        let mut row = vec![None; table.headers().len()];
        for (column, value) in cells {
            if let Some(idx) = table.column_index(column) {
                row[idx] = value;
            }
        }
        table.push_row(row);
    }

    pub fn from_row(table: &Table, row: usize) -> Result<Self> {
        let flag = |column: &str| -> Result<bool> { parse_yes_no(required(table, row, column)?) };

        let mut results = [None; 18];
        for (slot, column) in results.iter_mut().zip(RESULT_COLUMNS) {
            *slot = table.number(row, column);
        }

        Ok(Self {
            id: required(table, row, ID)?.to_string(),
            gender: Gender::parse(required(table, row, GENDER)?)?,
            age: parse_count(required(table, row, AGE)?)?,
            joint: Joint::parse(required(table, row, JOINT)?)?,
            condition: Condition::parse(required(table, row, CONDITION)?)?,
            blood: flag(BLOOD)?,
            clot: flag(CLOT)?,
            tissue: flag(TISSUE)?,
            tissue_or_clot_in_test: flag(TISSUE_OR_CLOT_IN_TEST)?,
            freezer_storage: flag(FREEZER)?,
            covid: flag(COVID)?,
            vaccinated: flag(VACCINATED)?,
            covid_now: flag(COVID_NOW)?,
            results: StatResults::from_values(results),
        })
    }
}

fn required<'a>(table: &'a Table, row: usize, column: &str) -> Result<&'a str> {
    table
        .text(row, column)
        .ok_or_else(|| RheoError::MissingColumn(format!("{} (row {})", column, row + 1)))
}

/// Analyse samples from `S<start_number>` onward and append their rows
///
/// Samples are taken in sample-database order starting at the first row of
/// `S<start_number>`. A sample without an export file still gets a row,
/// with empty result columns.
///
/// # Returns
/// The records appended.
pub fn append_results(
    sample_db: &Path,
    experiment_dir: &Path,
    stat_db: &Path,
    start_number: u32,
    window: TimeWindow,
    targets: &AnalysisTargets,
) -> Result<Vec<StatRecord>> {
    let entries = load_samples(sample_db)?;
    let start_id = sample_id(start_number);
    let start = entries
        .iter()
        .position(|e| e.sample.id() == start_id)
        .ok_or_else(|| RheoError::UnknownSample(start_id.clone()))?;
    info!(start = %start_id, samples = entries.len() - start, "appending results");

    let mut records = Vec::with_capacity(entries.len() - start);
    for entry in &entries[start..] {
        let id = entry.sample.id();
        let results = if export_path(experiment_dir, &id).exists() {
            let export = ExperimentExport::load(experiment_dir, &id)?;
            let analysis = analyze_sample(&export, window, targets)?;
            analysis.print_summary();
            StatResults::from_analysis(&analysis)
        } else {
            warn!(sample = %id, "no export found, appending metadata only");
            StatResults::default()
        };
        records.push(StatRecord::new(entry, results));
    }

    let mut table = if stat_db.exists() {
        Table::load(stat_db)?
    } else {
        Table::new(&stat_columns())
    };
    for record in &records {
        record.push_to(&mut table);
    }
    table.save(stat_db)?;
    info!(rows = records.len(), path = %stat_db.display(), "statistical database updated");
    Ok(records)
}

/// Load every record of the statistical database
pub fn load_records(stat_db: &Path) -> Result<Vec<StatRecord>> {
    let table = Table::load(stat_db)?;
    (0..table.num_rows()).map(|row| StatRecord::from_row(&table, row)).collect()
}

/// Record of one sample (first occurrence)
pub fn find_record(stat_db: &Path, id: &str) -> Result<StatRecord> {
    let table = Table::load(stat_db)?;
    let row = table
        .find_row(ID, id)
        .ok_or_else(|| RheoError::UnknownSample(id.to_string()))?;
    StatRecord::from_row(&table, row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::export::fixtures::full_export;
    use crate::records::sample::fixtures::knee_oa_sample;

    fn entry(number: u32) -> SampleEntry {
        SampleEntry { sample: knee_oa_sample(number), tests: Vec::new() }
    }

    #[test]
    fn test_stat_columns() {
        let cols = stat_columns();
        assert_eq!(cols.len(), 31);
        assert_eq!(cols[8], "Tissue or Clot in Test");
        assert_eq!(cols[30], "Flow Step Viscosity at 3.162 1/s (Pa.s)");
    }

    #[test]
    fn test_results_from_full_analysis() {
        let analysis = analyze_sample(&full_export(), TimeWindow::default(), &AnalysisTargets::default()).unwrap();
        let r = StatResults::from_analysis(&analysis);
        assert_eq!(r.fs_storage_low, Some(0.4));
        assert_eq!(r.fs_storage_high, Some(3.9));
        assert_eq!(r.crossover, Some(3.142));
        assert!(r.ts_storage_mean.is_some());
        assert!(r.eta_0.is_some());
        assert!(r.flow_viscosity.is_some());
    }

    #[test]
    fn test_row_conversion_keeps_missing_results() {
        let results = StatResults {
            ts_storage_mean: Some(2.5),
            crossover: Some(3.142),
            ..Default::default()
        };
        let record = StatRecord::new(&entry(12), results);
        let mut table = Table::new(&stat_columns());
        record.push_to(&mut table);

        assert_eq!(table.text(0, TISSUE_OR_CLOT_IN_TEST), Some("no"));
        assert_eq!(table.text(0, FS_STORAGE_LOW), None);
        let back = StatRecord::from_row(&table, 0).unwrap();
        assert_eq!(back, record);
    }
}
