/// Multivariate normal augmentation of small cohorts
///
/// The complete cases of a cohort give a mean vector μ and a sample
/// covariance Σ; synthetic samples are drawn from N(μ, sΣ) with a scale
/// factor s ≥ 1 to widen the spread:
///
/// ```text
/// x = μ + L z,    L Lᵀ = s Σ,    z ~ N(0, I)
/// ```
///
/// Draws are generated in parallel chunks, each with its own RNG seeded from
/// the run seed and the chunk index, so the output only depends on the seed.
/// When Σ is only semidefinite (collinear columns, fewer samples than
/// columns) a growing diagonal jitter is added until the Cholesky
/// factorisation succeeds.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::database::stat_db::{
    FS_LOSS_HIGH, FS_LOSS_LOW, FS_STORAGE_HIGH, FS_STORAGE_LOW, FS_VISCOSITY, TS_LOSS_MEAN, TS_STORAGE_MEAN,
};
use crate::database::table::Table;
use crate::error::{Result, RheoError};

const CHUNK_SIZE: usize = 16_384;
const MAX_JITTER_ATTEMPTS: usize = 12;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonteCarloSettings {
    /// Draws per cohort
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Multiplier applied to the covariance matrix
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Columns sampled jointly
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
}

fn default_samples() -> usize { 1_000_000 }
fn default_scale_factor() -> f64 { 2.0 }
fn default_seed() -> u64 { 42 }
fn default_columns() -> Vec<String> {
    [
        FS_STORAGE_LOW, FS_LOSS_LOW, TS_STORAGE_MEAN, TS_LOSS_MEAN, FS_STORAGE_HIGH, FS_LOSS_HIGH,
        FS_VISCOSITY,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            scale_factor: default_scale_factor(),
            seed: default_seed(),
            columns: default_columns(),
        }
    }
}

/// Complete cases of `columns`, one row per sample
pub fn complete_cases(table: &Table, columns: &[&str]) -> Result<Vec<Vec<f64>>> {
    let cols = table.complete_numeric(columns)?;
    let n = cols.first().map_or(0, |c| c.len());
    Ok((0..n).map(|i| cols.iter().map(|c| c[i]).collect()).collect())
}

/// Mean vector and sample covariance (ddof = 1)
pub fn mean_and_covariance(rows: &[Vec<f64>]) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let n = rows.len();
    let p = rows.first().map_or(0, |r| r.len());
    if n < 2 || p == 0 {
        return Err(RheoError::EmptySelection(format!(
            "covariance needs at least 2 complete rows, got {}",
            n
        )));
    }
    let data = DMatrix::from_fn(n, p, |i, j| rows[i][j]);
    let mean = DVector::from_fn(p, |j, _| data.column(j).mean());
    let centered = DMatrix::from_fn(n, p, |i, j| data[(i, j)] - mean[j]);
    let cov = centered.transpose() * &centered / (n as f64 - 1.0);
    Ok((mean, cov))
}

/// Lower Cholesky factor, adding diagonal jitter when needed
pub fn cholesky_with_jitter(cov: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if let Some(chol) = cov.clone().cholesky() {
        return Ok(chol.l());
    }
    let p = cov.nrows();
    let scale = (cov.trace() / p.max(1) as f64).abs().max(f64::EPSILON);
    let mut jitter = scale * 1e-10;
    for _ in 0..MAX_JITTER_ATTEMPTS {
        let shifted = cov + DMatrix::identity(p, p) * jitter;
        if let Some(chol) = shifted.cholesky() {
            warn!(jitter, "covariance not positive definite, added diagonal jitter");
            return Ok(chol.l());
        }
        jitter *= 10.0;
    }
    Err(RheoError::Numerical("covariance matrix is not positive semidefinite".to_string()))
}

fn chunk_seed(seed: u64, chunk: usize) -> u64 {
    seed ^ (chunk as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Draw `n` samples from N(mean, L Lᵀ)
pub fn sample_multivariate_normal(mean: &DVector<f64>, l: &DMatrix<f64>, n: usize, seed: u64) -> Vec<Vec<f64>> {
    let p = mean.len();
    let chunks = n.div_ceil(CHUNK_SIZE);
    (0..chunks)
        .into_par_iter()
        .flat_map_iter(|chunk| {
            let mut rng = StdRng::seed_from_u64(chunk_seed(seed, chunk));
            let count = CHUNK_SIZE.min(n - chunk * CHUNK_SIZE);
            (0..count)
                .map(|_| {
                    let z = DVector::<f64>::from_fn(p, |_, _| rng.sample(StandardNormal));
                    let x = mean + l * z;
                    x.iter().copied().collect::<Vec<f64>>()
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Synthetic cohort drawn from the complete cases of `table`
pub fn multivariate_normal_sampling(
    table: &Table,
    columns: &[&str],
    scale_factor: f64,
    samples: usize,
    seed: u64,
) -> Result<Vec<Vec<f64>>> {
    let rows = complete_cases(table, columns)?;
    let (mean, cov) = mean_and_covariance(&rows)?;
    let l = cholesky_with_jitter(&(cov * scale_factor))?;
    debug!(complete = rows.len(), samples, "multivariate normal sampling");
    Ok(sample_multivariate_normal(&mean, &l, samples, seed))
}

/// Feature rows with binary labels (1 = OA)
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    pub columns: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature rows restricted to the named columns
    pub fn select(&self, columns: &[&str]) -> Result<Vec<Vec<f64>>> {
        let idx: Vec<usize> = columns
            .iter()
            .map(|c| {
                self.columns
                    .iter()
                    .position(|h| h == c)
                    .ok_or_else(|| RheoError::MissingColumn(c.to_string()))
            })
            .collect::<Result<_>>()?;
        Ok(self.features.iter().map(|row| idx.iter().map(|&j| row[j]).collect()).collect())
    }
}

/// Label healthy rows 0 and OA rows 1, concatenate and shuffle
pub fn augment(columns: &[&str], healthy: Vec<Vec<f64>>, oa: Vec<Vec<f64>>, seed: u64) -> LabeledDataset {
    let mut labeled: Vec<(Vec<f64>, u8)> = healthy
        .into_iter()
        .map(|r| (r, 0))
        .chain(oa.into_iter().map(|r| (r, 1)))
        .collect();
    let mut rng = StdRng::seed_from_u64(seed);
    labeled.shuffle(&mut rng);
    let (features, labels) = labeled.into_iter().unzip();
    LabeledDataset {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        features,
        labels,
    }
}
