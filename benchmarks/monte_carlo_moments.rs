/// Validation Benchmark: Multivariate Normal Sampling Moments
///
/// **Problem Setup:**
/// - Known 3×3 covariance with strong correlations, plus a rank-deficient
///   variant that needs diagonal jitter
/// - Draw 10⁴ … 10⁶ samples in parallel chunks
///
/// **Expected:**
/// Sample mean → μ and sample covariance → Σ at rate 1/√n
///
/// **Success Criteria:**
/// - Max |Σ̂ - Σ| / max|Σ| < 1% at 10⁶ samples
/// - Identical draws for identical seeds

use nalgebra::{DMatrix, DVector};
use rheolab::cohort::monte_carlo::{cholesky_with_jitter, mean_and_covariance, sample_multivariate_normal};
use std::time::Instant;

fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    (a - b).iter().fold(0.0, |m, v| m.max(v.abs()))
}

fn main() {
    println!("═══════════════════════════════════════════════════════");
    println!("  Monte Carlo: Multivariate Normal Moments");
    println!("═══════════════════════════════════════════════════════\n");

    let mean = DVector::from_vec(vec![0.45, 0.30, 0.12]);
    let cov: DMatrix<f64> = DMatrix::from_row_slice(3, 3, &[
        0.040, 0.030, 0.010,
        0.030, 0.036, 0.008,
        0.010, 0.008, 0.020,
    ]);
    let scale = cov.iter().fold(0.0f64, |m, v| m.max(v.abs()));

    let l = match cholesky_with_jitter(&cov) {
        Ok(l) => l,
        Err(e) => {
            println!("  ✗ FAIL: Cholesky factorisation failed: {}", e);
            return;
        }
    };

    println!("  {:>10} {:>14} {:>14} {:>10}", "samples", "mean error", "cov error", "time (ms)");
    let mut final_error = f64::INFINITY;
    for n in [10_000, 100_000, 1_000_000] {
        let start = Instant::now();
        let draws = sample_multivariate_normal(&mean, &l, n, 42);
        let elapsed = start.elapsed().as_secs_f64() * 1e3;

        let (m, c) = match mean_and_covariance(&draws) {
            Ok(moments) => moments,
            Err(e) => {
                println!("  moments failed: {}", e);
                return;
            }
        };
        let mean_error = (&m - &mean).amax();
        let cov_error = max_abs_diff(&c, &cov) / scale;
        final_error = cov_error;
        println!("  {:>10} {:>14.3e} {:>13.3}% {:>10.1}", n, mean_error, cov_error * 100.0, elapsed);
    }

    // Reproducibility
    let a = sample_multivariate_normal(&mean, &l, 50_000, 7);
    let b = sample_multivariate_normal(&mean, &l, 50_000, 7);
    let reproducible = a == b;
    println!("\n  Same seed, same draws: {}", if reproducible { "✓" } else { "✗" });

    // Rank-deficient covariance (third variable = sum of the first two)
    let singular = DMatrix::from_row_slice(3, 3, &[
        1.0, 0.5, 1.5,
        0.5, 1.0, 1.5,
        1.5, 1.5, 3.0,
    ]);
    let jitter_ok = cholesky_with_jitter(&singular).is_ok();
    println!("  Rank-deficient covariance factorised with jitter: {}", if jitter_ok { "✓" } else { "✗" });

    println!("\n═══════════════════════════════════════════════════════");
    if final_error < 0.01 && reproducible && jitter_ok {
        println!("  ✓ PASS: covariance error {:.3}% at 10⁶ samples", final_error * 100.0);
    } else {
        println!("  ✗ FAIL: covariance error {:.3}%", final_error * 100.0);
    }
    println!("═══════════════════════════════════════════════════════");
}
