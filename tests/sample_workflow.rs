/// Bench-to-report workflow on temporary files
///
/// Creates the sample database, stores a described sample, drops an
/// instrument export next to it, fills the statistical database and writes
/// the sample report.
use approx::assert_relative_eq;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use rheolab::analysis::cross_model::cross_viscosity;
use rheolab::analysis::export::{
    ANGULAR_FREQUENCY, COMPLEX_VISCOSITY, FS_LOSS, FS_STORAGE, PHASE_ANGLE, SHEAR_RATE, TIME, TS_LOSS,
    TS_STORAGE, VISCOSITY,
};
use rheolab::records::{Color, Condition, Gender, Joint, Temperature, TestType, Texture, Transparency};
use rheolab::{
    append_results, append_sample, create_database, create_sample_report, find_record, find_sample,
    sample_columns, ExistingFile, LabConfig, RheoError, SampleDescription, Table, TestDescription,
    TimeWindow,
};

fn sample(number: u32) -> SampleDescription {
    SampleDescription {
        number,
        date: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
        gender: Gender::Male,
        age: 58,
        joint: Joint::Knee,
        condition: Condition::Oa,
        total_volume_ml: 3.0,
        color: Color::SoftYellow,
        transparency: Transparency::Transparent,
        texture: Texture::Viscous,
        blood: false,
        clot: false,
        tissue: false,
        freezer_storage: false,
        covid: false,
        vaccinated: true,
        covid_now: false,
        number_of_tests: 3,
    }
}

fn tests() -> Vec<TestDescription> {
    [TestType::TimeSweep, TestType::FrequencySweep, TestType::FlowStep]
        .into_iter()
        .map(|test_type| TestDescription {
            test_type,
            temperature: Temperature::Body,
            tissue_in_test: false,
            bubbles_before: false,
            bubbles_after: true,
        })
        .collect()
}

/// Export with all three tests: G' ≈ 2 Pa plateau, crossover at 3.142 rad/s,
/// Cross flow curve with η₀ = 2 Pa·s
fn write_export(dir: &Path, sid: &str) {
    let headers = [
        TIME, TS_STORAGE, TS_LOSS, ANGULAR_FREQUENCY, FS_STORAGE, FS_LOSS, COMPLEX_VISCOSITY, PHASE_ANGLE,
        SHEAR_RATE, VISCOSITY,
    ];
    let freqs: [f64; 6] = [0.1, 0.68, 1.5, 3.142, 6.8, 14.58];
    let storage: [f64; 6] = [0.05, 0.4, 1.1, 2.0, 3.0, 3.9];
    let loss: [f64; 6] = [0.3, 0.8, 1.3, 1.8, 2.2, 2.6];
    let rates = [0.1, 0.316, 1.0, 3.162, 10.0, 31.62, 100.0, 316.2];

    let mut table = Table::new(&headers);
    for i in 0..10 {
        let cell = |v: f64| Some(v.to_string());
        let mut row = vec![cell(0.5 * (i + 1) as f64), cell(2.0), cell(1.8)];
        if i < freqs.len() {
            let eta_star = (storage[i] * storage[i] + loss[i] * loss[i]).sqrt() / freqs[i];
            let delta = (loss[i] / storage[i]).atan().to_degrees();
            row.extend([cell(freqs[i]), cell(storage[i]), cell(loss[i]), cell(eta_star), cell(delta)]);
        } else {
            row.extend(std::iter::repeat(None).take(5));
        }
        if i < rates.len() {
            row.extend([cell(rates[i]), cell(cross_viscosity(rates[i], 2.0, 0.01, 0.5, 0.8))]);
        } else {
            row.extend([None, None]);
        }
        table.push_row(row);
    }
    table.save(dir.join(format!("{}.csv", sid))).unwrap();
}

fn lab(root: &TempDir) -> LabConfig {
    let mut config = LabConfig::default();
    let p = &mut config.paths;
    p.sample_database = root.path().join("Database.csv");
    p.experiment_dir = root.path().join("Experimental_Data");
    p.stat_database = root.path().join("Statistical_Analysis_Database.csv");
    p.report_dir = root.path().join("reports");
    p.report_template = root.path().join("report_template.txt");
    p.cohort_dir = root.path().join("cohort");
    config
}

#[test]
fn test_create_database_policies() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("Database.csv");

    let first = create_database(&path, &sample_columns(), ExistingFile::Abort).unwrap();
    assert_eq!(first, path);
    assert!(matches!(
        create_database(&path, &sample_columns(), ExistingFile::Abort),
        Err(RheoError::AlreadyExists(_))
    ));

    let second = create_database(&path, &sample_columns(), ExistingFile::AddUnique).unwrap();
    assert_ne!(second, path);
    assert!(second.exists());

    let replaced = create_database(&path, &sample_columns(), ExistingFile::Replace).unwrap();
    assert_eq!(replaced, path);
    assert!(Table::load(&path).unwrap().is_empty());
}

#[test]
fn test_sample_round_trip_through_database() {
    let root = TempDir::new().unwrap();
    let config = lab(&root);
    create_database(&config.paths.sample_database, &sample_columns(), ExistingFile::Abort).unwrap();

    append_sample(&config.paths.sample_database, &sample(12), &tests()).unwrap();
    append_sample(&config.paths.sample_database, &sample(13), &[]).unwrap();

    let entry = find_sample(&config.paths.sample_database, "S12").unwrap();
    assert_eq!(entry.sample, sample(12));
    assert_eq!(entry.tests, tests());
    assert!(!entry.tissue_or_clot_in_test());

    let empty = find_sample(&config.paths.sample_database, "S13").unwrap();
    assert!(empty.tests.is_empty());

    assert!(matches!(
        find_sample(&config.paths.sample_database, "S99"),
        Err(RheoError::UnknownSample(_))
    ));
}

#[test]
fn test_results_and_report() {
    let root = TempDir::new().unwrap();
    let config = lab(&root);
    let paths = &config.paths;
    fs::create_dir_all(&paths.experiment_dir).unwrap();

    append_sample(&paths.sample_database, &sample(1), &tests()).unwrap();
    append_sample(&paths.sample_database, &sample(2), &[]).unwrap();
    write_export(&paths.experiment_dir, "S1");

    let records = append_results(
        &paths.sample_database,
        &paths.experiment_dir,
        &paths.stat_database,
        1,
        TimeWindow::default(),
        &config.analysis.targets(),
    )
    .unwrap();
    // one record per sample, however many test rows it has
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["S1", "S2"]);

    let stored = find_record(&paths.stat_database, "S1").unwrap();
    let r = stored.results;
    assert_relative_eq!(r.ts_storage_mean.unwrap(), 2.0, epsilon = 1e-9);
    assert_relative_eq!(r.ts_loss_mean.unwrap(), 1.8, epsilon = 1e-9);
    assert_relative_eq!(r.ts_storage_std.unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(r.fs_storage_ref.unwrap(), 2.0, epsilon = 1e-9);
    assert_relative_eq!(r.fs_loss_high.unwrap(), 2.6, epsilon = 1e-9);
    assert_relative_eq!(r.crossover.unwrap(), 3.142, epsilon = 1e-9);
    assert_relative_eq!(r.eta_0.unwrap(), 2.0, max_relative = 0.1);
    assert!(r.flow_viscosity.is_some());

    let metadata_only = find_record(&paths.stat_database, "S2").unwrap();
    assert_eq!(metadata_only.results.ts_storage_mean, None);

    fs::write(
        &paths.report_template,
        "font = Arial\nauthor = A. Author\nsupervisor = B. Supervisor\ntest_temp = 37\n",
    )
    .unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let output = create_sample_report(&config, 1, TimeWindow::default(), date).unwrap();

    assert_eq!(output.html.file_name().unwrap(), "S1_Report_01_02_2024.html");
    let html = fs::read_to_string(&output.html).unwrap();
    assert!(html.contains("Report - HSF_S1"));
    assert!(html.contains("Author: A. Author"));
    assert!(html.contains("Frequency Sweep test"));
    assert!(html.contains("Cox-Merz rule at"));
    assert!(html.contains("S1_time_sweep.svg"));
    assert!(paths.report_dir.join("S1_flow_step.svg").exists());
    if let Some(pdf) = output.pdf {
        assert!(pdf.exists());
    }
}

#[test]
fn test_report_without_export_or_template() {
    let root = TempDir::new().unwrap();
    let config = lab(&root);
    append_sample(&config.paths.sample_database, &sample(4), &[]).unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let output = create_sample_report(&config, 4, TimeWindow::default(), date).unwrap();
    let html = fs::read_to_string(&output.html).unwrap();
    assert!(html.contains("2. Sample's Description"));
    assert!(!html.contains("Time Sweep test"));
    assert!(html.contains("4. Results"));

    assert!(matches!(
        create_sample_report(&config, 5, TimeWindow::default(), date),
        Err(RheoError::UnknownSample(_))
    ));
}
