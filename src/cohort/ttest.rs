/// Two-group comparison: descriptive statistics and Student's t-test
///
/// For each column, the non-missing values of both groups are summarised
/// (count, mean, sample std with ddof = 1, max, min) and compared with the
/// pooled-variance two-sample t-test:
///
/// ```text
/// s_p² = ((n₁-1)s₁² + (n₂-1)s₂²) / (n₁+n₂-2)
/// t    = (x̄₁ - x̄₂) / (s_p √(1/n₁ + 1/n₂))
/// p    = 2 (1 - F_t(|t|; n₁+n₂-2))
/// ```
///
/// The test is only run when both groups have a non-zero (population)
/// variance.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::database::table::{format_number, Table};
use crate::error::{Result, RheoError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); NaN for a single value
    pub std: f64,
    pub max: f64,
    pub min: f64,
}

impl Describe {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let ss = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        Some(Self {
            count: values.len(),
            mean,
            std: (ss / (n - 1.0)).sqrt(),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }

    fn population_variance(&self, values: &[f64]) -> f64 {
        values.iter().map(|v| (v - self.mean).powi(2)).sum::<f64>() / self.count as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hypothesis {
    /// p < α: the group means differ
    Reject,
    Accept,
    /// No test was run
    Undetermined,
}

impl Hypothesis {
    pub fn label(&self) -> &'static str {
        match self {
            Hypothesis::Reject => "Reject",
            Hypothesis::Accept => "Accept",
            Hypothesis::Undetermined => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupComparison {
    pub column: String,
    pub first: Describe,
    pub second: Describe,
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub hypothesis: Hypothesis,
}

/// Pooled-variance Student's t-test, returns (t, two-sided p)
pub fn two_sample_t_test(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let (a, b) = match (Describe::of(x), Describe::of(y)) {
        (Some(a), Some(b)) if a.count + b.count > 2 => (a, b),
        _ => {
            return Err(RheoError::EmptySelection(
                "t-test needs more than two observations".to_string(),
            ))
        }
    };
    let (n1, n2) = (a.count as f64, b.count as f64);
    let ss1 = if a.count > 1 { a.std.powi(2) * (n1 - 1.0) } else { 0.0 };
    let ss2 = if b.count > 1 { b.std.powi(2) * (n2 - 1.0) } else { 0.0 };
    let dof = n1 + n2 - 2.0;
    let pooled = ((ss1 + ss2) / dof).sqrt();
    let t = (a.mean - b.mean) / (pooled * (1.0 / n1 + 1.0 / n2).sqrt());

    let dist = StudentsT::new(0.0, 1.0, dof).map_err(|e| RheoError::Numerical(e.to_string()))?;
    let p = 2.0 * (1.0 - dist.cdf(t.abs()));
    Ok((t, p))
}

/// Compare every column between two groups
///
/// Columns where either group has no values are skipped.
pub fn compare_groups(first: &Table, second: &Table, columns: &[&str], alpha: f64) -> Result<Vec<GroupComparison>> {
    let mut results = Vec::new();
    for column in columns {
        let x: Vec<f64> = first.numeric_column(column)?.into_iter().flatten().collect();
        let y: Vec<f64> = second.numeric_column(column)?.into_iter().flatten().collect();
        let (Some(a), Some(b)) = (Describe::of(&x), Describe::of(&y)) else {
            continue;
        };

        let (t_statistic, p_value, hypothesis) =
            if a.population_variance(&x) > 0.0 && b.population_variance(&y) > 0.0 {
                let (t, p) = two_sample_t_test(&x, &y)?;
                let hypothesis = if p < alpha { Hypothesis::Reject } else { Hypothesis::Accept };
                (Some(t), Some(p), hypothesis)
            } else {
                (None, None, Hypothesis::Undetermined)
            };

        results.push(GroupComparison {
            column: column.to_string(),
            first: a,
            second: b,
            t_statistic,
            p_value,
            hypothesis,
        });
    }
    Ok(results)
}

pub const COMPARISON_HEADERS: [&str; 14] = [
    "Column", "Count 1", "Mean 1", "Std 1", "Max 1", "Min 1",
    "Count 2", "Mean 2", "Std 2", "Max 2", "Min 2",
    "t-statistic", "p-value", "Hypothesis",
];

/// Results as a table, one row per column compared
pub fn comparison_table(results: &[GroupComparison]) -> Table {
    let mut table = Table::new(&COMPARISON_HEADERS);
    let num = |v: f64| if v.is_finite() { Some(format_number(v)) } else { None };
    for r in results {
        table.push_row(vec![
            Some(r.column.clone()),
            Some(r.first.count.to_string()),
            num(r.first.mean),
            num(r.first.std),
            num(r.first.max),
            num(r.first.min),
            Some(r.second.count.to_string()),
            num(r.second.mean),
            num(r.second.std),
            num(r.second.max),
            num(r.second.min),
            r.t_statistic.and_then(num),
            r.p_value.and_then(num),
            Some(r.hypothesis.label().to_string()).filter(|s| !s.is_empty()),
        ]);
    }
    table
}

pub fn print_comparison(results: &[GroupComparison]) {
    println!("{:<50} {:>5} {:>9} {:>5} {:>9} {:>9} {:>9}  {}", "Column", "n1", "mean1", "n2", "mean2", "t", "p", "H0");
    for r in results {
        let opt = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<50} {:>5} {:>9.4} {:>5} {:>9.4} {:>9} {:>9}  {}",
            r.column,
            r.first.count,
            r.first.mean,
            r.second.count,
            r.second.mean,
            opt(r.t_statistic),
            opt(r.p_value),
            r.hypothesis.label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_describe_sample_std() {
        let d = Describe::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(d.count, 8);
        assert_relative_eq!(d.mean, 5.0);
        assert_relative_eq!(d.std, (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_eq!(d.max, 9.0);
        assert_eq!(d.min, 2.0);
        assert!(Describe::of(&[]).is_none());
    }

    #[test]
    fn test_t_test_matches_reference_values() {
        // scipy.stats.ttest_ind([1,2,3,4,5], [3,4,5,6,7]) -> t = -2.0, p = 0.0805
        let (t, p) = two_sample_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        assert_relative_eq!(t, -2.0, epsilon = 1e-12);
        assert_relative_eq!(p, 0.08051623795726258, epsilon = 1e-6);
    }

    #[test]
    fn test_compare_groups_skips_and_flags() {
        let mut a = Table::new(&["x", "const", "empty"]);
        let mut b = Table::new(&["x", "const", "empty"]);
        for v in [1.0, 2.0, 3.0] {
            a.push_row(vec![Some(v.to_string()), Some("1".into()), None]);
            b.push_row(vec![Some((v + 10.0).to_string()), Some("1".into()), None]);
        }
        let results = compare_groups(&a, &b, &["x", "const", "empty"], 0.05).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].hypothesis, Hypothesis::Reject);
        assert!(results[0].p_value.unwrap() < 1e-3);
        assert_eq!(results[1].hypothesis, Hypothesis::Undetermined);
        assert_eq!(results[1].t_statistic, None);

        let table = comparison_table(&results);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.text(0, "Hypothesis"), Some("Reject"));
        assert_eq!(table.text(1, "Hypothesis"), None);
    }
}
