/// L2-regularised logistic regression for healthy/OA classification
///
/// Minimises
///
/// ```text
/// J(w, b) = ½‖w‖² + C Σᵢ [ log(1 + e^{zᵢ}) - yᵢ zᵢ ],    zᵢ = b + w·xᵢ
/// ```
///
/// with Newton's method (the intercept b is not penalised). Gradient and
/// Hessian are accumulated over rows with rayon fold/reduce, and each
/// Newton step is damped by backtracking until J decreases.
///
/// # Evaluation
/// 1. Shuffled train/test split
/// 2. Stratified k-fold cross-validated accuracy on the training rows
/// 3. Final model on all training rows; accuracy, ROC curve and AUC on the test rows

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cohort::monte_carlo::LabeledDataset;
use crate::database::stat_db::{TS_LOSS_MEAN, TS_STORAGE_MEAN};
use crate::database::table::{format_number, Table};
use crate::error::{Result, RheoError};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogisticSettings {
    /// Share of rows held out for testing
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Cross-validation folds
    #[serde(default = "default_folds")]
    pub folds: usize,
    #[serde(default)]
    pub seed: u64,
    /// Inverse regularisation strength
    #[serde(default = "default_c")]
    pub c: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Convergence tolerance on the Newton decrement
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_predictors")]
    pub predictors: Vec<String>,
}

fn default_test_fraction() -> f64 { 0.4 }
fn default_folds() -> usize { 5 }
fn default_c() -> f64 { 1.0 }
fn default_max_iterations() -> usize { 100 }
fn default_tolerance() -> f64 { 1e-10 }
fn default_predictors() -> Vec<String> {
    vec![TS_STORAGE_MEAN.to_string(), TS_LOSS_MEAN.to_string()]
}

impl Default for LogisticSettings {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            folds: default_folds(),
            seed: 0,
            c: default_c(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            predictors: default_predictors(),
        }
    }
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticModel {
    pub fn decision(&self, x: &[f64]) -> f64 {
        self.intercept + self.coefficients.iter().zip(x).map(|(w, v)| w * v).sum::<f64>()
    }

    /// P(y = 1 | x)
    pub fn probability(&self, x: &[f64]) -> f64 {
        sigmoid(self.decision(x))
    }

    pub fn predict(&self, x: &[f64]) -> u8 {
        u8::from(self.decision(x) > 0.0)
    }

    pub fn accuracy(&self, x: &[Vec<f64>], y: &[u8]) -> f64 {
        if y.is_empty() {
            return f64::NAN;
        }
        let correct = x.par_iter().zip(y).filter(|(row, label)| self.predict(row) == **label).count();
        correct as f64 / y.len() as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogisticFitStats {
    pub iterations: usize,
    pub converged: bool,
    pub objective: f64,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// log(1 + e^z) without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 { z + (-z).exp().ln_1p() } else { z.exp().ln_1p() }
}

/// Augmented parameter vector θ = [b, w₁, …, w_p]
fn decision(theta: &DVector<f64>, x: &[f64]) -> f64 {
    theta[0] + x.iter().enumerate().map(|(j, v)| theta[j + 1] * v).sum::<f64>()
}

fn objective(theta: &DVector<f64>, x: &[Vec<f64>], y: &[u8], c: f64) -> f64 {
    let penalty = 0.5 * theta.rows(1, theta.len() - 1).norm_squared();
    let loss: f64 = x
        .par_iter()
        .zip(y)
        .map(|(row, &label)| {
            let z = decision(theta, row);
            softplus(z) - f64::from(label) * z
        })
        .sum();
    penalty + c * loss
}

fn gradient_and_hessian(theta: &DVector<f64>, x: &[Vec<f64>], y: &[u8], c: f64) -> (DVector<f64>, DMatrix<f64>) {
    let dim = theta.len();
    let (mut grad, mut hess) = x
        .par_iter()
        .zip(y)
        .fold(
            || (DVector::zeros(dim), DMatrix::zeros(dim, dim)),
            |(mut g, mut h): (DVector<f64>, DMatrix<f64>), (row, &label)| {
                let p = sigmoid(decision(theta, row));
                let weight = p * (1.0 - p);
                let residual = p - f64::from(label);
                let xi = |j: usize| if j == 0 { 1.0 } else { row[j - 1] };
                for a in 0..dim {
                    g[a] += residual * xi(a);
                    for b in 0..=a {
                        h[(a, b)] += weight * xi(a) * xi(b);
                    }
                }
                (g, h)
            },
        )
        .reduce(
            || (DVector::zeros(dim), DMatrix::zeros(dim, dim)),
            |(g1, h1), (g2, h2)| (g1 + g2, h1 + h2),
        );

    grad *= c;
    hess *= c;
    for a in 0..dim {
        for b in 0..a {
            hess[(b, a)] = hess[(a, b)];
        }
    }
    for j in 1..dim {
        grad[j] += theta[j];
        hess[(j, j)] += 1.0;
    }
    (grad, hess)
}

/// Fit by damped Newton iterations
///
/// # Arguments
/// * `x` - Feature rows (all the same length)
/// * `y` - Labels, 0 or 1
///
/// # Returns
/// Model and iteration statistics
pub fn fit_logistic(x: &[Vec<f64>], y: &[u8], settings: &LogisticSettings) -> Result<(LogisticModel, LogisticFitStats)> {
    if x.is_empty() || x.len() != y.len() {
        return Err(RheoError::EmptySelection(format!(
            "logistic regression needs matching, non-empty rows ({} features, {} labels)",
            x.len(),
            y.len()
        )));
    }
    let p = x[0].len();
    if x.iter().any(|row| row.len() != p) {
        return Err(RheoError::InvalidInput("feature rows differ in length".to_string()));
    }

    let c = settings.c;
    let mut theta = DVector::zeros(p + 1);
    let mut stats = LogisticFitStats { objective: objective(&theta, x, y, c), ..Default::default() };

    for iter in 0..settings.max_iterations {
        stats.iterations = iter + 1;
        let (grad, hess) = gradient_and_hessian(&theta, x, y, c);
        let step = hess
            .cholesky()
            .map(|chol| chol.solve(&grad))
            .ok_or_else(|| RheoError::Numerical("logistic Hessian is not positive definite".to_string()))?;

        // Newton decrement, scaled by the number of rows
        let decrement = grad.dot(&step) / x.len() as f64;
        if decrement < settings.tolerance {
            stats.converged = true;
            break;
        }

        let mut alpha = 1.0;
        loop {
            let candidate = &theta - &step * alpha;
            let value = objective(&candidate, x, y, c);
            if value <= stats.objective || alpha < 1e-8 {
                theta = candidate;
                stats.objective = value;
                break;
            }
            alpha *= 0.5;
        }
    }

    debug!(iterations = stats.iterations, converged = stats.converged, objective = stats.objective, "logistic fit");
    let model = LogisticModel { intercept: theta[0], coefficients: theta.iter().skip(1).copied().collect() };
    Ok((model, stats))
}

// ============================================================================
// Evaluation
// ============================================================================

/// Shuffled (train, test) row indices; the test share is rounded up
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);
    let n_test = ((n as f64 * test_fraction).ceil() as usize).min(n);
    let train = idx.split_off(n_test);
    (train, idx)
}

/// Fold index of every row, keeping class proportions in each fold
pub fn stratified_folds(labels: &[u8], folds: usize) -> Vec<usize> {
    let mut assignment = vec![0; labels.len()];
    for class in [0u8, 1] {
        let members = labels.iter().enumerate().filter(|(_, l)| **l == class).map(|(i, _)| i);
        for (k, i) in members.enumerate() {
            assignment[i] = k % folds;
        }
    }
    assignment
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RocPoint {
    pub threshold: f64,
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
}

/// ROC curve over every distinct score, starting at (0, 0)
pub fn roc_curve(scores: &[f64], labels: &[u8]) -> Vec<RocPoint> {
    let positives = labels.iter().filter(|&&l| l == 1).count() as f64;
    let negatives = labels.len() as f64 - positives;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = vec![RocPoint { threshold: f64::INFINITY, false_positive_rate: 0.0, true_positive_rate: 0.0 }];
    let (mut tp, mut fp) = (0.0, 0.0);
    for (k, &i) in order.iter().enumerate() {
        if labels[i] == 1 { tp += 1.0 } else { fp += 1.0 }
        let last_of_tie = order.get(k + 1).map_or(true, |&next| scores[next] != scores[i]);
        if last_of_tie {
            curve.push(RocPoint {
                threshold: scores[i],
                false_positive_rate: if negatives > 0.0 { fp / negatives } else { f64::NAN },
                true_positive_rate: if positives > 0.0 { tp / positives } else { f64::NAN },
            });
        }
    }
    curve
}

/// Trapezoidal area under a ROC curve
pub fn auc(curve: &[RocPoint]) -> f64 {
    curve
        .windows(2)
        .map(|w| {
            (w[1].false_positive_rate - w[0].false_positive_rate)
                * (w[1].true_positive_rate + w[0].true_positive_rate)
                / 2.0
        })
        .sum()
}

#[derive(Debug, Clone)]
pub struct LogisticReport {
    pub predictors: Vec<String>,
    pub model: LogisticModel,
    pub stats: LogisticFitStats,
    pub train_size: usize,
    pub test_size: usize,
    pub cv_accuracies: Vec<f64>,
    pub test_accuracy: f64,
    pub roc: Vec<RocPoint>,
    pub auc: f64,
}

impl LogisticReport {
    pub fn mean_cv_accuracy(&self) -> f64 {
        self.cv_accuracies.iter().sum::<f64>() / self.cv_accuracies.len() as f64
    }

    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════");
        println!("  Logistic Regression");
        println!("═══════════════════════════════════════════════════════════");
        println!("  Predictors:     {}", self.predictors.join(", "));
        println!("  Train / test:   {} / {}", self.train_size, self.test_size);
        println!("  Intercept:      {:.6}", self.model.intercept);
        for (name, w) in self.predictors.iter().zip(&self.model.coefficients) {
            println!("  β[{}]: {:.6}", name, w);
        }
        println!("  Newton:         {} iterations (converged: {})", self.stats.iterations, self.stats.converged);
        let folds: Vec<String> = self.cv_accuracies.iter().map(|a| format!("{:.4}", a)).collect();
        println!("  CV accuracy:    [{}]", folds.join(", "));
        println!("  Mean CV:        {:.4}", self.mean_cv_accuracy());
        println!("  Test accuracy:  {:.4}", self.test_accuracy);
        println!("  AUC:            {:.4}", self.auc);
        println!("═══════════════════════════════════════════════════════════");
    }

    /// ROC curve as a table (threshold, FPR, TPR)
    pub fn roc_table(&self) -> Table {
        let mut table = Table::new(&["Threshold", "False Positive Rate", "True Positive Rate"]);
        for point in &self.roc {
            let threshold = Some(point.threshold).filter(|t| t.is_finite()).map(format_number);
            table.push_row(vec![
                threshold,
                Some(format_number(point.false_positive_rate)),
                Some(format_number(point.true_positive_rate)),
            ]);
        }
        table
    }
}

fn gather<T: Clone>(values: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| values[i].clone()).collect()
}

/// Split, cross-validate, fit and score on the held-out rows
pub fn logistic_regression(dataset: &LabeledDataset, settings: &LogisticSettings) -> Result<LogisticReport> {
    let predictors: Vec<&str> = settings.predictors.iter().map(String::as_str).collect();
    let features = dataset.select(&predictors)?;
    let (train_idx, test_idx) = train_test_split(dataset.len(), settings.test_fraction, settings.seed);
    let (x_train, y_train) = (gather(&features, &train_idx), gather(&dataset.labels, &train_idx));
    let (x_test, y_test) = (gather(&features, &test_idx), gather(&dataset.labels, &test_idx));
    if settings.folds < 2 {
        return Err(RheoError::InvalidInput(format!("need at least 2 folds, got {}", settings.folds)));
    }

    let assignment = stratified_folds(&y_train, settings.folds);
    let mut cv_accuracies = Vec::with_capacity(settings.folds);
    for fold in 0..settings.folds {
        let (fit_idx, held_idx): (Vec<usize>, Vec<usize>) =
            (0..y_train.len()).partition(|&i| assignment[i] != fold);
        let (model, _) = fit_logistic(&gather(&x_train, &fit_idx), &gather(&y_train, &fit_idx), settings)?;
        let accuracy = model.accuracy(&gather(&x_train, &held_idx), &gather(&y_train, &held_idx));
        debug!(fold, accuracy, "cross-validation fold");
        cv_accuracies.push(accuracy);
    }

    let (model, stats) = fit_logistic(&x_train, &y_train, settings)?;
    let test_accuracy = model.accuracy(&x_test, &y_test);
    let scores: Vec<f64> = x_test.par_iter().map(|row| model.probability(row)).collect();
    let roc = roc_curve(&scores, &y_test);
    let area = auc(&roc);
    info!(test_accuracy, auc = area, "logistic regression evaluated");

    Ok(LogisticReport {
        predictors: settings.predictors.clone(),
        model,
        stats,
        train_size: train_idx.len(),
        test_size: test_idx.len(),
        cv_accuracies,
        test_accuracy,
        roc,
        auc: area,
    })
}
