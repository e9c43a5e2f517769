/// Validation Benchmark: Crossover Frequency of a Maxwell Fluid
///
/// **Problem Setup:**
/// - Single-mode Maxwell fluid, relaxation time λ, modulus G
/// - Frequency sweep sampled like the instrument (10 points per decade)
///
/// **Analytical Solution:**
/// G'(ω)  = G (ωλ)² / (1 + (ωλ)²)
/// G''(ω) = G ωλ / (1 + (ωλ)²)
/// Crossover at ω_c = 1/λ
///
/// **Success Criteria:**
/// - Reported crossover is the first sampled frequency above ω_c
/// - G'' dominates before the crossover

use rheolab::analysis::frequency_sweep::Modulus;
use rheolab::find_crossover;

fn maxwell(omega: f64, modulus: f64, lambda: f64) -> (f64, f64) {
    let wl = omega * lambda;
    let denom = 1.0 + wl * wl;
    (modulus * wl * wl / denom, modulus * wl / denom)
}

fn main() {
    println!("═══════════════════════════════════════════════════════");
    println!("  Frequency Sweep: Maxwell Crossover Detection");
    println!("═══════════════════════════════════════════════════════\n");

    let frequencies: Vec<f64> = (0..=30).map(|k| 10f64.powf(-1.0 + k as f64 * 0.1)).collect();
    let relaxation_times = [4.0, 0.8, 0.25, 0.07];
    let modulus = 4.0;

    println!("  {:>10} {:>14} {:>14} {:>10}", "λ (s)", "1/λ (rad/s)", "found (rad/s)", "status");
    let mut all_pass = true;
    for &lambda in &relaxation_times {
        let (storage, loss): (Vec<f64>, Vec<f64>) =
            frequencies.iter().map(|&w| maxwell(w, modulus, lambda)).unzip();
        let exact = 1.0 / lambda;
        let expected = frequencies.iter().copied().find(|&w| w > exact);

        let found = find_crossover(&frequencies, &storage, &loss);
        let pass = match (&found, expected) {
            (Some(c), Some(w)) => {
                (c.frequency - w).abs() < 1e-12 && c.dominant_before == Modulus::Loss
            }
            (None, None) => true,
            _ => false,
        };
        all_pass &= pass;

        println!("  {:>10.3} {:>14.4} {:>14} {:>10}",
                 lambda,
                 exact,
                 found.map(|c| format!("{:.4}", c.frequency)).unwrap_or_else(|| "-".into()),
                 if pass { "✓" } else { "✗" });
    }

    // A fluid that never crosses over within the sweep
    let (storage, loss): (Vec<f64>, Vec<f64>) =
        frequencies.iter().map(|&w| maxwell(w, modulus, 1e-4)).unzip();
    let none = find_crossover(&frequencies, &storage, &loss);
    println!("\n  λ = 1e-4 s (crossover outside sweep): {}",
             if none.is_none() { "no crossover ✓" } else { "unexpected crossover ✗" });
    all_pass &= none.is_none();

    println!("\n═══════════════════════════════════════════════════════");
    if all_pass {
        println!("  ✓ PASS: first-flip crossover matches 1/λ sampling");
    } else {
        println!("  ✗ FAIL: crossover detection mismatch");
    }
    println!("═══════════════════════════════════════════════════════");
}
