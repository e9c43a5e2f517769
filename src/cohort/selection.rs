//! Cohort selection and reshaping
//!
//! Filters rows of the (preprocessed) statistical database by categorical
//! columns, log-transforms the comparison columns, and melts wide tables
//! into long (variable, value) rows for box plots.

use crate::cohort::preprocess::{TAN_DELTA_HIGH, TAN_DELTA_LOW, TAN_DELTA_REF};
use crate::database::stat_db::{
    BLOOD, CONDITION, CROSSOVER, FLOW_VISCOSITY, FREEZER, FS_LOSS_HIGH, FS_LOSS_LOW, FS_STORAGE_HIGH,
    FS_STORAGE_LOW, FS_VISCOSITY, GENDER, JOINT, TISSUE_OR_CLOT_IN_TEST, TS_LOSS_MEAN, TS_STORAGE_MEAN,
};
use crate::database::table::Table;
use crate::error::Result;
use crate::records::choices::{yes_no, Choice, Condition, Gender, Joint};
use crate::utils::log10_plus_one;

/// Columns compared between cohorts (and log-transformed first)
pub const COMPARISON_COLUMNS: [&str; 12] = [
    FS_STORAGE_LOW, FS_LOSS_LOW, TS_STORAGE_MEAN, TS_LOSS_MEAN, FS_STORAGE_HIGH, FS_LOSS_HIGH,
    FLOW_VISCOSITY, FS_VISCOSITY, CROSSOVER, TAN_DELTA_LOW, TAN_DELTA_REF, TAN_DELTA_HIGH,
];

/// Moduli at the three reading frequencies (reference from the time sweep)
pub const MODULI_COLUMNS: [(&str, &str); 6] = [
    (FS_STORAGE_LOW, "G' at 0.68 rad/s"),
    (FS_LOSS_LOW, "G'' at 0.68 rad/s"),
    (TS_STORAGE_MEAN, "G' at 3.142 rad/s"),
    (TS_LOSS_MEAN, "G'' at 3.142 rad/s"),
    (FS_STORAGE_HIGH, "G' at 14.58 rad/s"),
    (FS_LOSS_HIGH, "G'' at 14.58 rad/s"),
];

pub const VISCOSITY_COLUMNS: [(&str, &str); 2] = [(FLOW_VISCOSITY, "η"), (FS_VISCOSITY, "|η*|")];

pub const CROSSOVER_COLUMNS: [(&str, &str); 1] = [(CROSSOVER, "Cross Over Point")];

pub const TAN_DELTA_COLUMNS: [(&str, &str); 3] = [
    (TAN_DELTA_LOW, "tan(δ) at 0.68 rad/s"),
    (TAN_DELTA_REF, "tan(δ) at 3.142 rad/s"),
    (TAN_DELTA_HIGH, "tan(δ) at 14.58 rad/s"),
];

/// Row filter over the categorical columns; unset fields match anything
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CohortFilter {
    pub joint: Option<Joint>,
    pub condition: Option<Condition>,
    pub blood: Option<bool>,
    pub tissue_or_clot_in_test: Option<bool>,
    pub gender: Option<Gender>,
    pub freezer_storage: Option<bool>,
}

impl CohortFilter {
    /// Knee samples without blood and without tissue or clot in the test
    pub fn clean_knee() -> Self {
        Self {
            joint: Some(Joint::Knee),
            blood: Some(false),
            tissue_or_clot_in_test: Some(false),
            ..Default::default()
        }
    }

    /// Knee samples without tissue or clot in the test, with or without blood
    pub fn knee() -> Self {
        Self {
            joint: Some(Joint::Knee),
            tissue_or_clot_in_test: Some(false),
            ..Default::default()
        }
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn blood(mut self, blood: bool) -> Self {
        self.blood = Some(blood);
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn freezer_storage(mut self, stored: bool) -> Self {
        self.freezer_storage = Some(stored);
        self
    }

    pub fn matches(&self, table: &Table, row: usize) -> bool {
        let is = |column: &str, expected: Option<&str>| match expected {
            Some(label) => table.text(row, column) == Some(label),
            None => true,
        };
        is(JOINT, self.joint.map(|j| j.label()))
            && is(CONDITION, self.condition.map(|c| c.label()))
            && is(BLOOD, self.blood.map(yes_no))
            && is(TISSUE_OR_CLOT_IN_TEST, self.tissue_or_clot_in_test.map(yes_no))
            && is(GENDER, self.gender.map(|g| g.label()))
            && is(FREEZER, self.freezer_storage.map(yes_no))
    }
}

pub fn select(table: &Table, filter: &CohortFilter) -> Table {
    table.filter_rows(|t, row| filter.matches(t, row))
}

/// Copy with log10(x + 1) applied to the named columns (missing stays missing)
pub fn log_transform(table: &Table, columns: &[&str]) -> Result<Table> {
    let mut t = table.clone();
    for column in columns {
        if !t.has_column(column) {
            continue;
        }
        for row in 0..t.num_rows() {
            let value = t.number(row, column).map(log10_plus_one);
            t.set_number(row, column, value)?;
        }
    }
    Ok(t)
}

/// One observation of a long-format table
#[derive(Debug, Clone, PartialEq)]
pub struct MeltedRow {
    pub group: String,
    pub variable: String,
    pub value: f64,
}

/// Long-format rows (group, variable, value), dropping missing values
///
/// `value_columns` pairs each source column with its display name.
pub fn melt(table: &Table, id_column: &str, value_columns: &[(&str, &str)]) -> Vec<MeltedRow> {
    let mut rows = Vec::new();
    for (column, display) in value_columns {
        for row in 0..table.num_rows() {
            if let Some(value) = table.number(row, column) {
                rows.push(MeltedRow {
                    group: table.text(row, id_column).unwrap_or_default().to_string(),
                    variable: display.to_string(),
                    value,
                });
            }
        }
    }
    rows
}

/// Replace yes/no group labels with readable legend labels
pub fn relabel_yes_no(rows: &mut [MeltedRow], yes: &str, no: &str) {
    for row in rows {
        match row.group.as_str() {
            "yes" => row.group = yes.to_string(),
            "no" => row.group = no.to_string(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::stat_db::{stat_columns, ID};
    use approx::assert_relative_eq;

    fn cohort() -> Table {
        let mut t = Table::new(&stat_columns());
        let rows = [
            ("S1", "knee", "oa", "no", "no", "female", Some(9.0)),
            ("S2", "knee", "healthy", "no", "no", "male", Some(99.0)),
            ("S3", "knee", "oa", "yes", "no", "male", None),
            ("S4", "hip", "oa", "no", "no", "male", Some(1.0)),
            ("S5", "knee", "oa", "no", "yes", "male", Some(3.0)),
        ];
        for (i, (id, joint, condition, blood, toc, gender, g)) in rows.iter().enumerate() {
            t.push_row(Vec::new());
            t.set_text(i, ID, Some(id.to_string())).unwrap();
            t.set_text(i, JOINT, Some(joint.to_string())).unwrap();
            t.set_text(i, CONDITION, Some(condition.to_string())).unwrap();
            t.set_text(i, BLOOD, Some(blood.to_string())).unwrap();
            t.set_text(i, TISSUE_OR_CLOT_IN_TEST, Some(toc.to_string())).unwrap();
            t.set_text(i, GENDER, Some(gender.to_string())).unwrap();
            t.set_number(i, FS_STORAGE_LOW, *g).unwrap();
        }
        t
    }

    #[test]
    fn test_clean_knee_selection() {
        let t = cohort();
        let oa = select(&t, &CohortFilter::clean_knee().condition(Condition::Oa));
        assert_eq!(oa.num_rows(), 1);
        assert_eq!(oa.text(0, ID), Some("S1"));

        let healthy = select(&t, &CohortFilter::clean_knee().condition(Condition::Healthy));
        assert_eq!(healthy.text(0, ID), Some("S2"));

        let oa_blood = select(
            &t,
            &CohortFilter::clean_knee().condition(Condition::Oa).blood(true),
        );
        assert_eq!(oa_blood.text(0, ID), Some("S3"));

        let males = select(&t, &CohortFilter::default().gender(Gender::Male));
        assert_eq!(males.num_rows(), 4);
    }

    #[test]
    fn test_knee_totals_exclude_tissue_or_clot() {
        let t = cohort();
        let oa_total = select(&t, &CohortFilter::knee().condition(Condition::Oa));
        let ids: Vec<_> = (0..oa_total.num_rows()).map(|r| oa_total.text(r, ID)).collect();
        assert_eq!(ids, vec![Some("S1"), Some("S3")]);

        // Clean plus blood cohorts make up the total
        let oa = select(&t, &CohortFilter::clean_knee().condition(Condition::Oa));
        let oa_blood = select(&t, &CohortFilter::clean_knee().condition(Condition::Oa).blood(true));
        assert_eq!(oa_total.num_rows(), oa.num_rows() + oa_blood.num_rows());
    }

    #[test]
    fn test_log_transform_keeps_missing() {
        let t = log_transform(&cohort(), &[FS_STORAGE_LOW, "not a column"]).unwrap();
        assert_relative_eq!(t.number(0, FS_STORAGE_LOW).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(t.number(1, FS_STORAGE_LOW).unwrap(), 2.0, epsilon = 1e-12);
        assert_eq!(t.number(2, FS_STORAGE_LOW), None);
    }

    #[test]
    fn test_melt_and_relabel() {
        let mut rows = melt(&cohort(), BLOOD, &MODULI_COLUMNS[..1]);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].variable, "G' at 0.68 rad/s");
        relabel_yes_no(&mut rows, "With", "Without");
        assert_eq!(rows[0].group, "Without");
        assert!(rows.iter().all(|r| r.group == "With" || r.group == "Without"));
    }
}
