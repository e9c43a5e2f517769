//! Sample database: one row per (sample, test)
//!
//! The first 18 columns repeat the sample description on every row, the last
//! 5 describe one rheometer test.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::database::table::Table;
use crate::error::{Result, RheoError};
use crate::records::measurement::{TestDescription, TEST_FIELD_LABELS};
use crate::records::sample::{SampleDescription, SAMPLE_FIELD_COUNT, SAMPLE_FIELD_LABELS};

/// Column labels of the sample database
pub fn sample_columns() -> Vec<&'static str> {
    SAMPLE_FIELD_LABELS
        .iter()
        .chain(TEST_FIELD_LABELS.iter())
        .copied()
        .collect()
}

/// What to do when the database file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingFile {
    /// Overwrite with an empty table
    Replace,
    /// Leave it alone and create `<base>_<k>.<ext>` instead
    AddUnique,
    /// Fail with `AlreadyExists`
    Abort,
}

/// Smallest `<base>_<k>.<ext>` (k ≥ 1) that does not exist yet
pub fn unique_file_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
    let mut counter = 1;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Create an empty database file holding only the header row
///
/// # Returns
/// The path actually written (differs from `path` under `AddUnique`).
pub fn create_database<S: AsRef<str>>(
    path: &Path,
    columns: &[S],
    policy: ExistingFile,
) -> Result<PathBuf> {
    let target = if path.exists() {
        match policy {
            ExistingFile::Replace => {
                warn!(path = %path.display(), "replacing existing database");
                path.to_path_buf()
            }
            ExistingFile::AddUnique => unique_file_name(path),
            ExistingFile::Abort => return Err(RheoError::AlreadyExists(path.to_path_buf())),
        }
    } else {
        path.to_path_buf()
    };
    Table::new(columns).save(&target)?;
    info!(path = %target.display(), "created database");
    Ok(target)
}

/// Append a sample and its tests to the sample database
///
/// Writes one row per test with the sample columns repeated; a sample with
/// no tests gets a single row with empty test columns.
pub fn append_sample(path: &Path, sample: &SampleDescription, tests: &[TestDescription]) -> Result<()> {
    let mut table = if path.exists() {
        Table::load(path)?
    } else {
        Table::new(&sample_columns())
    };
    for label in sample_columns() {
        table.ensure_column(label);
    }

    let sample_values = sample.values();
    let mut push = |test: Option<&TestDescription>| {
        let mut row: Vec<Option<String>> = vec![None; table.headers().len()];
        for (label, value) in SAMPLE_FIELD_LABELS.iter().zip(&sample_values) {
            if let Some(idx) = table.column_index(label) {
                row[idx] = Some(value.clone());
            }
        }
        if let Some(test) = test {
            for (label, value) in TEST_FIELD_LABELS.iter().zip(test.values()) {
                if let Some(idx) = table.column_index(label) {
                    row[idx] = Some(value);
                }
            }
        }
        table.push_row(row);
    };

    if tests.is_empty() {
        push(None);
    } else {
        for test in tests {
            push(Some(test));
        }
    }

    table.save(path)?;
    info!(sample = %sample.id(), tests = tests.len(), path = %path.display(), "appended sample");
    Ok(())
}

/// A sample with the test rows recorded for it
#[derive(Debug, Clone)]
pub struct SampleEntry {
    pub sample: SampleDescription,
    pub tests: Vec<TestDescription>,
}

impl SampleEntry {
    /// Tissue or clot present during any test
    pub fn tissue_or_clot_in_test(&self) -> bool {
        self.sample.clot || self.tests.iter().any(|t| t.tissue_in_test)
    }
}

/// Load every sample, in file order, unique by ID (first occurrence wins)
pub fn load_samples(path: &Path) -> Result<Vec<SampleEntry>> {
    let table = Table::load(path)?;
    let id_col = SAMPLE_FIELD_LABELS[0];
    if !table.has_column(id_col) {
        return Err(RheoError::MissingColumn(id_col.to_string()));
    }

    let mut entries: Vec<SampleEntry> = Vec::new();
    for row in 0..table.num_rows() {
        let sample_cells: Vec<&str> = SAMPLE_FIELD_LABELS
            .iter()
            .map(|label| table.text(row, label).unwrap_or(""))
            .collect();
        let id = sample_cells[0];
        if id.is_empty() {
            continue;
        }

        let test_cells: Vec<&str> = TEST_FIELD_LABELS
            .iter()
            .map(|label| table.text(row, label).unwrap_or(""))
            .collect();
        let test = if test_cells[0].is_empty() {
            None
        } else {
            Some(TestDescription::from_values(&test_cells)?)
        };

        match entries.iter_mut().find(|e| e.sample.id() == id) {
            Some(entry) => {
                if let Some(test) = test {
                    entry.tests.push(test);
                }
            }
            None => {
                let sample = SampleDescription::from_values(&sample_cells[..SAMPLE_FIELD_COUNT])?;
                entries.push(SampleEntry {
                    sample,
                    tests: test.into_iter().collect(),
                });
            }
        }
    }
    Ok(entries)
}

/// Look up one sample by ID
pub fn find_sample(path: &Path, id: &str) -> Result<SampleEntry> {
    load_samples(path)?
        .into_iter()
        .find(|e| e.sample.id() == id)
        .ok_or_else(|| RheoError::UnknownSample(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::choices::{Temperature, TestType};
    use crate::records::sample::fixtures::knee_oa_sample;

    fn test_row(test_type: TestType, tissue: bool) -> TestDescription {
        TestDescription {
            test_type,
            temperature: Temperature::Body,
            tissue_in_test: tissue,
            bubbles_before: false,
            bubbles_after: false,
        }
    }

    #[test]
    fn test_sample_columns() {
        let cols = sample_columns();
        assert_eq!(cols.len(), 23);
        assert_eq!(cols[0], "ID");
        assert_eq!(cols[18], "Test Type");
        assert_eq!(cols[22], "Bubbles after Test");
    }

    #[test]
    fn test_unique_file_name_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Database.csv");
        assert_eq!(unique_file_name(&path), dir.path().join("Database_1.csv"));
        std::fs::write(dir.path().join("Database_1.csv"), "").unwrap();
        assert_eq!(unique_file_name(&path), dir.path().join("Database_2.csv"));
    }

    #[test]
    fn test_create_database_policies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Database.csv");
        let cols = sample_columns();

        assert_eq!(create_database(&path, &cols, ExistingFile::Abort).unwrap(), path);
        assert!(matches!(
            create_database(&path, &cols, ExistingFile::Abort),
            Err(RheoError::AlreadyExists(_))
        ));
        let unique = create_database(&path, &cols, ExistingFile::AddUnique).unwrap();
        assert_eq!(unique, dir.path().join("Database_1.csv"));
        assert_eq!(create_database(&path, &cols, ExistingFile::Replace).unwrap(), path);
        assert_eq!(Table::load(&path).unwrap().headers().len(), 23);
    }

    #[test]
    fn test_append_sample_repeats_sample_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Database.csv");
        create_database(&path, &sample_columns(), ExistingFile::Abort).unwrap();

        let sample = knee_oa_sample(5);
        let tests = vec![
            test_row(TestType::TimeSweep, false),
            test_row(TestType::FrequencySweep, true),
        ];
        append_sample(&path, &sample, &tests).unwrap();

        let table = Table::load(&path).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.text(1, "ID"), Some("S5"));
        assert_eq!(table.text(1, "Condition"), Some("oa"));
        assert_eq!(table.text(0, "Test Type"), Some("time sweep"));
        assert_eq!(table.text(1, "Tissue in Test"), Some("yes"));
    }

    #[test]
    fn test_load_samples_groups_tests_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Database.csv");
        let first = knee_oa_sample(1);
        let second = knee_oa_sample(2);
        append_sample(&path, &first, &[test_row(TestType::TimeSweep, false)]).unwrap();
        append_sample(&path, &second, &[]).unwrap();
        append_sample(&path, &first, &[test_row(TestType::FlowStep, true)]).unwrap();

        let entries = load_samples(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sample, first);
        assert_eq!(entries[0].tests.len(), 2);
        assert!(entries[0].tissue_or_clot_in_test());
        assert!(entries[1].tests.is_empty());
        assert!(!entries[1].tissue_or_clot_in_test());

        assert!(matches!(find_sample(&path, "S9"), Err(RheoError::UnknownSample(_))));
        assert_eq!(find_sample(&path, "S2").unwrap().sample.number, 2);
    }
}
