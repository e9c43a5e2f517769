/// Validation Benchmark: Cross Model Parameter Recovery
///
/// **Problem Setup:**
/// - Synthetic flow curves η(γ̇) from known Cross parameters, sampled at
///   the shear rates of a typical flow step (0.1 … 1000 1/s, 5 per decade)
/// - Multiplicative Gaussian noise at 0%, 1% and 3%
///
/// **Model:**
/// η(γ̇) = η∞ + (η₀ - η∞) / (1 + (C γ̇)^m)
///
/// **Success Criteria:**
/// - Noise-free data: every parameter within 0.1%
/// - 3% noise: η₀ within 10%, standard error close to the noise level

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rheolab::{fit_cross_model, CrossFitConfig, CrossParameters};

fn shear_rates() -> Vec<f64> {
    (0..=20).map(|k| 10f64.powf(-1.0 + k as f64 * 0.2)).collect()
}

fn relative_error(estimate: f64, exact: f64) -> f64 {
    ((estimate - exact) / exact).abs() * 100.0
}

fn main() {
    println!("═══════════════════════════════════════════════════════");
    println!("  Cross Model: Parameter Recovery from Flow Curves");
    println!("═══════════════════════════════════════════════════════\n");

    let cases = [
        ("Healthy-like", CrossParameters { eta_0: 12.0, eta_inf: 0.005, consistency: 2.0, rate_index: 0.75 }),
        ("OA-like", CrossParameters { eta_0: 1.5, eta_inf: 0.002, consistency: 0.4, rate_index: 0.6 }),
        ("Near-Newtonian", CrossParameters { eta_0: 0.05, eta_inf: 0.001, consistency: 0.02, rate_index: 0.9 }),
    ];
    let noise_levels: [f64; 3] = [0.0, 0.01, 0.03];
    let rates = shear_rates();
    let config = CrossFitConfig::default();
    let mut rng = StdRng::seed_from_u64(7);

    let mut all_pass = true;
    for (name, exact) in &cases {
        println!("Case: {}", name);
        println!("  Exact: η₀ = {:.4}, η∞ = {:.4}, C = {:.4}, m = {:.4}",
                 exact.eta_0, exact.eta_inf, exact.consistency, exact.rate_index);

        for &noise in &noise_levels {
            let normal = match Normal::new(0.0, noise.max(f64::MIN_POSITIVE)) {
                Ok(n) => n,
                Err(e) => {
                    println!("  invalid noise level {}: {}", noise, e);
                    continue;
                }
            };
            let viscosity: Vec<f64> = rates
                .iter()
                .map(|&r| exact.viscosity(r) * (1.0 + if noise > 0.0 { normal.sample(&mut rng) } else { 0.0 }))
                .collect();

            let fit = match fit_cross_model(&rates, &viscosity, &config) {
                Ok(fit) => fit,
                Err(e) => {
                    println!("  noise {:>4.1}%: fit failed: {}", noise * 100.0, e);
                    all_pass = false;
                    continue;
                }
            };
            let p = fit.parameters;
            let err_eta_0 = relative_error(p.eta_0, exact.eta_0);
            let err_c = relative_error(p.consistency, exact.consistency);
            let err_m = relative_error(p.rate_index, exact.rate_index);

            println!("  noise {:>4.1}%: η₀ err {:>7.3}%  C err {:>7.3}%  m err {:>7.3}%  std err {:>6.3}%  ({} its)",
                     noise * 100.0, err_eta_0, err_c, err_m, fit.standard_error, fit.stats.iterations);

            let pass = if noise == 0.0 {
                err_eta_0 < 0.1 && err_c < 0.1 && err_m < 0.1
            } else {
                err_eta_0 < 10.0 && fit.standard_error < 3.0 * noise * 100.0
            };
            if !pass {
                all_pass = false;
            }
        }
        println!();
    }

    println!("═══════════════════════════════════════════════════════");
    if all_pass {
        println!("  ✓ PASS: Cross parameters recovered within tolerance");
    } else {
        println!("  ✗ FAIL: at least one case outside tolerance");
    }
    println!("═══════════════════════════════════════════════════════");
}
