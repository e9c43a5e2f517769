/// Cohort run over a synthetic statistical database
use chrono::NaiveDate;
use tempfile::TempDir;

use rheolab::cohort::Hypothesis;
use rheolab::database::stat_db::TS_STORAGE_MEAN;
use rheolab::records::{Color, Condition, Gender, Joint, Texture, Transparency};
use rheolab::{
    run_cohort_analysis, stat_columns, LabConfig, RheoError, SampleDescription, SampleEntry, StatRecord,
    StatResults, Table,
};

/// Deterministic spread in [1 - amplitude, 1 + amplitude], a different
/// frequency per column so the columns are not collinear
fn spread(i: usize, j: usize, amplitude: f64) -> f64 {
    let rate = 1.3 + 0.37 * j as f64;
    1.0 + amplitude * ((i as f64) * rate + j as f64).sin()
}

fn entry(number: u32, condition: Condition, blood: bool, gender: Gender) -> SampleEntry {
    SampleEntry {
        sample: SampleDescription {
            number,
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            gender,
            age: 40 + number % 30,
            joint: Joint::Knee,
            condition,
            total_volume_ml: 2.0,
            color: Color::Yellow,
            transparency: Transparency::Transparent,
            texture: Texture::Viscous,
            blood,
            clot: false,
            tissue: false,
            freezer_storage: number % 3 == 0,
            covid: false,
            vaccinated: true,
            covid_now: false,
            number_of_tests: 0,
        },
        tests: Vec::new(),
    }
}

/// Healthy fluid is stiffer and more viscous than OA fluid
fn results(i: usize, condition: Condition) -> StatResults {
    let scale = if condition == Condition::Healthy { 4.0 } else { 1.0 };
    let s = |j: usize| spread(i, j, 0.25);
    let storage = 2.0 * scale * s(0);
    let loss = 1.2 * scale * s(1);
    StatResults {
        ts_storage_mean: Some(storage),
        ts_loss_mean: Some(loss),
        ts_storage_std: Some(0.01),
        ts_loss_std: Some(0.01),
        fs_storage_low: Some(0.5 * scale * s(2)),
        fs_loss_low: Some(0.7 * scale * s(3)),
        fs_storage_ref: Some(storage * 1.05),
        fs_loss_ref: Some(loss * 0.97),
        fs_storage_high: Some(4.0 * scale * s(4)),
        fs_loss_high: Some(2.0 * scale * s(5)),
        crossover: Some(2.0 / scale * s(6) + 0.5),
        fs_viscosity: Some(0.8 * scale * s(7)),
        eta_0: Some(3.0 * scale * s(8)),
        eta_inf: Some(0.01),
        consistency: Some(0.5),
        rate_index: Some(0.8),
        standard_error: Some(1.0),
        flow_viscosity: Some(0.8 * scale * s(7) * 1.02),
    }
}

fn write_database(path: &std::path::Path, with_healthy: bool) {
    let mut table = Table::new(&stat_columns());
    let mut number = 1;
    for i in 0..14 {
        let gender = if i % 2 == 0 { Gender::Male } else { Gender::Female };
        for condition in [Condition::Healthy, Condition::Oa] {
            if condition == Condition::Healthy && !with_healthy {
                continue;
            }
            let blood = i >= 10;
            StatRecord::new(&entry(number, condition, blood, gender), results(i, condition)).push_to(&mut table);
            number += 1;
        }
    }
    table.save(path).unwrap();
}

fn lab(root: &TempDir) -> LabConfig {
    let mut config = LabConfig::default();
    config.paths.stat_database = root.path().join("Statistical_Analysis_Database.csv");
    config.paths.cohort_dir = root.path().join("cohort");
    config.monte_carlo.samples = 2_000;
    config
}

#[test]
fn test_full_cohort_run() {
    let root = TempDir::new().unwrap();
    let config = lab(&root);
    write_database(&config.paths.stat_database, true);

    let summary = run_cohort_analysis(&config).unwrap();

    let names: Vec<&str> = summary.comparisons.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names.len(), 6);
    assert_eq!(names[0], "healthy_vs_oa");

    let storage = summary.comparisons[0]
        .1
        .iter()
        .find(|c| c.column == TS_STORAGE_MEAN)
        .unwrap();
    assert_eq!(storage.first.count, 10);
    assert_eq!(storage.second.count, 10);
    assert_eq!(storage.hypothesis, Hypothesis::Reject);
    assert!(storage.p_value.unwrap() < 0.001);

    // Totals add the blood samples; the gender split stays within clean OA
    let count = |name: &str| {
        let (_, results) = summary.comparisons.iter().find(|(n, _)| n == name).unwrap();
        let c = results.iter().find(|c| c.column == TS_STORAGE_MEAN).unwrap();
        (c.first.count, c.second.count)
    };
    assert_eq!(count("healthy_total_vs_oa_total"), (14, 14));
    assert_eq!(count("oa_male_vs_female"), (5, 5));

    assert_eq!(summary.biomarkers.len(), config.biomarkers.len());
    assert!(summary.biomarkers.iter().all(|b| b.tp + b.tn + b.fp + b.fn_ <= 20));

    let logistic = summary.logistic.expect("augmentation should succeed");
    assert_eq!(logistic.train_size + logistic.test_size, 4_000);
    assert_eq!(logistic.cv_accuracies.len(), config.logistic.folds);
    assert!(logistic.test_accuracy > 0.9);
    assert!(logistic.auc > 0.9 && logistic.auc <= 1.0);

    let dir = &config.paths.cohort_dir;
    for file in [
        "preprocessed.csv",
        "healthy_vs_oa_ttest.csv",
        "oa_male_vs_female_ttest.csv",
        "biomarkers.csv",
        "roc_curve.csv",
        "condition_moduli.svg",
        "oa_blood_viscosity.svg",
        "oa_storage_crossover.svg",
        "gender_tan_delta.svg",
    ] {
        assert!(dir.join(file).exists(), "missing {}", file);
    }
}

#[test]
fn test_cohort_run_needs_both_conditions() {
    let root = TempDir::new().unwrap();
    let config = lab(&root);
    write_database(&config.paths.stat_database, false);

    assert!(matches!(run_cohort_analysis(&config), Err(RheoError::EmptySelection(_))));
}
