//! Biomarker validation against the OA diagnosis
//!
//! Each biomarker is a column, a threshold and a direction. A sample is
//! test-positive when its value lies on the OA side of the threshold;
//! comparing with the recorded condition (OA positive, anything else
//! negative) gives the confusion counts and the usual rates.

use serde::{Deserialize, Serialize};

use crate::cohort::preprocess::{TAN_DELTA_HIGH, TAN_DELTA_LOW, TAN_DELTA_REF};
use crate::database::stat_db::{
    CONDITION, FS_LOSS_HIGH, FS_LOSS_LOW, FS_STORAGE_HIGH, FS_STORAGE_LOW, FS_VISCOSITY, TS_LOSS_MEAN,
    TS_STORAGE_MEAN,
};
use crate::database::table::{format_number, Table};
use crate::error::Result;
use crate::records::choices::{Choice, Condition};

/// Which side of the threshold indicates OA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Healthy fluid is higher: value < threshold is positive
    Control,
    /// OA fluid is higher: value > threshold is positive
    Target,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Biomarker {
    pub name: String,
    pub column: String,
    pub threshold: f64,
    pub direction: Direction,
}

impl Biomarker {
    pub fn new(name: &str, column: &str, threshold: f64, direction: Direction) -> Self {
        Self { name: name.to_string(), column: column.to_string(), threshold, direction }
    }

    pub fn is_positive(&self, value: f64) -> bool {
        match self.direction {
            Direction::Control => value < self.threshold,
            Direction::Target => value > self.threshold,
        }
    }
}

pub fn default_biomarkers() -> Vec<Biomarker> {
    use Direction::{Control, Target};
    vec![
        Biomarker::new("G' at 0.68 rad/s", FS_STORAGE_LOW, 2.18, Control),
        Biomarker::new("G'' at 0.68 rad/s", FS_LOSS_LOW, 1.88, Control),
        Biomarker::new("G' at 3.142 rad/s", TS_STORAGE_MEAN, 4.34, Control),
        Biomarker::new("G'' at 3.142 rad/s", TS_LOSS_MEAN, 2.58, Control),
        Biomarker::new("G' at 14.58 rad/s", FS_STORAGE_HIGH, 7.28, Control),
        Biomarker::new("G'' at 14.58 rad/s", FS_LOSS_HIGH, 3.06, Control),
        Biomarker::new("Viscosity |η*| at 3.142 rad/s", FS_VISCOSITY, 1.65, Control),
        Biomarker::new("tan(δ) at 0.68 rad/s", TAN_DELTA_LOW, 0.88, Target),
        Biomarker::new("tan(δ) at 3.142 rad/s", TAN_DELTA_REF, 0.65, Target),
        Biomarker::new("tan(δ) at 14.58 rad/s", TAN_DELTA_HIGH, 0.48, Target),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    TruePositive,
    TrueNegative,
    FalsePositive,
    FalseNegative,
}

pub fn categorize(biomarker: &Biomarker, value: f64, has_oa: bool) -> Category {
    match (has_oa, biomarker.is_positive(value)) {
        (true, true) => Category::TruePositive,
        (true, false) => Category::FalseNegative,
        (false, true) => Category::FalsePositive,
        (false, false) => Category::TrueNegative,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiomarkerValidation {
    pub name: String,
    pub threshold: f64,
    pub tn: usize,
    pub tp: usize,
    pub fn_: usize,
    pub fp: usize,
}

impl BiomarkerValidation {
    fn rate(num: usize, den: usize) -> f64 {
        if den == 0 { f64::NAN } else { num as f64 / den as f64 }
    }

    pub fn sensitivity(&self) -> f64 {
        Self::rate(self.tp, self.tp + self.fn_)
    }

    pub fn specificity(&self) -> f64 {
        Self::rate(self.tn, self.tn + self.fp)
    }

    pub fn accuracy(&self) -> f64 {
        Self::rate(self.tp + self.tn, self.tp + self.tn + self.fp + self.fn_)
    }

    pub fn youden_index(&self) -> f64 {
        self.sensitivity() + self.specificity() - 1.0
    }
}

/// Confusion counts and rates for every biomarker
///
/// Rows without a value in the biomarker's column are left out of that
/// biomarker's counts.
pub fn validate_biomarkers(table: &Table, biomarkers: &[Biomarker]) -> Result<Vec<BiomarkerValidation>> {
    let oa = Condition::Oa.label();
    let condition = table.text_column(CONDITION)?;
    let mut out = Vec::with_capacity(biomarkers.len());
    for biomarker in biomarkers {
        let values = table.numeric_column(&biomarker.column)?;
        let mut v = BiomarkerValidation {
            name: biomarker.name.clone(),
            threshold: biomarker.threshold,
            tn: 0,
            tp: 0,
            fn_: 0,
            fp: 0,
        };
        for (value, cond) in values.iter().zip(&condition) {
            let Some(value) = value else { continue };
            match categorize(biomarker, *value, *cond == Some(oa)) {
                Category::TruePositive => v.tp += 1,
                Category::TrueNegative => v.tn += 1,
                Category::FalsePositive => v.fp += 1,
                Category::FalseNegative => v.fn_ += 1,
            }
        }
        out.push(v);
    }
    Ok(out)
}

pub const VALIDATION_HEADERS: [&str; 10] = [
    "Biomarker", "TN", "TP", "FN", "FP", "Threshold",
    "Sensitivity", "Specificity", "Accuracy", "Youden's Index",
];

pub fn validation_table(results: &[BiomarkerValidation]) -> Table {
    let mut table = Table::new(&VALIDATION_HEADERS);
    let num = |v: f64| if v.is_finite() { Some(format_number(v)) } else { None };
    for r in results {
        table.push_row(vec![
            Some(r.name.clone()),
            Some(r.tn.to_string()),
            Some(r.tp.to_string()),
            Some(r.fn_.to_string()),
            Some(r.fp.to_string()),
            num(r.threshold),
            num(r.sensitivity()),
            num(r.specificity()),
            num(r.accuracy()),
            num(r.youden_index()),
        ]);
    }
    table
}

pub fn print_validation(results: &[BiomarkerValidation]) {
    println!(
        "{:<32} {:>4} {:>4} {:>4} {:>4} {:>9} {:>8} {:>8} {:>8} {:>8}",
        "Biomarker", "TN", "TP", "FN", "FP", "Threshold", "Sens", "Spec", "Acc", "Youden"
    );
    for r in results {
        println!(
            "{:<32} {:>4} {:>4} {:>4} {:>4} {:>9.2} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
            r.name,
            r.tn,
            r.tp,
            r.fn_,
            r.fp,
            r.threshold,
            r.sensitivity(),
            r.specificity(),
            r.accuracy(),
            r.youden_index()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cohort(values: &[(&str, Option<f64>)]) -> Table {
        let mut t = Table::new(&[CONDITION, FS_STORAGE_LOW]);
        for (condition, value) in values {
            t.push_row(vec![Some(condition.to_string()), value.map(|v| v.to_string())]);
        }
        t
    }

    #[test]
    fn test_control_direction_counts() {
        let t = cohort(&[
            ("oa", Some(1.0)),      // TP
            ("oa", Some(3.0)),      // FN
            ("healthy", Some(1.0)), // FP
            ("healthy", Some(3.0)), // TN
            ("healthy", Some(4.0)), // TN
            ("oa", None),
        ]);
        let marker = Biomarker::new("G'", FS_STORAGE_LOW, 2.18, Direction::Control);
        let v = &validate_biomarkers(&t, &[marker]).unwrap()[0];
        assert_eq!((v.tn, v.tp, v.fn_, v.fp), (2, 1, 1, 1));
        assert_relative_eq!(v.sensitivity(), 0.5);
        assert_relative_eq!(v.specificity(), 2.0 / 3.0);
        assert_relative_eq!(v.accuracy(), 0.6);
        assert_relative_eq!(v.youden_index(), 0.5 + 2.0 / 3.0 - 1.0);
    }

    #[test]
    fn test_target_direction_and_empty_denominators() {
        let t = cohort(&[("oa", Some(1.0)), ("oa", Some(0.5))]);
        let marker = Biomarker::new("tan", FS_STORAGE_LOW, 0.88, Direction::Target);
        let v = &validate_biomarkers(&t, &[marker]).unwrap()[0];
        assert_eq!((v.tp, v.fn_), (1, 1));
        assert!(v.specificity().is_nan());
        assert!(v.youden_index().is_nan());

        let table = validation_table(&validate_biomarkers(&t, &[Biomarker::new("tan", FS_STORAGE_LOW, 0.88, Direction::Target)]).unwrap());
        assert_eq!(table.text(0, "Specificity"), None);
        assert_eq!(table.text(0, "Sensitivity"), Some("0.5"));
    }

    #[test]
    fn test_defaults() {
        let markers = default_biomarkers();
        assert_eq!(markers.len(), 10);
        assert_eq!(markers[2].column, TS_STORAGE_MEAN);
        assert_eq!(markers[9].direction, Direction::Target);
    }
}
