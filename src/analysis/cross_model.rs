/// Cross model for shear-thinning viscosity
///
/// ```text
/// η(γ̇) = (η₀ - η∞) / (1 + (K γ̇)ⁿ) + η∞
/// ```
///
/// where:
/// - η₀ = zero-rate viscosity (Pa·s), the low-rate Newtonian plateau
/// - η∞ = infinite-rate viscosity (Pa·s), the high-rate plateau
/// - K  = consistency (s), 1/K is the rate at which thinning sets in
/// - n  = rate index (-)
///
/// **Fit**: Levenberg-Marquardt on log-viscosity residuals
///
/// ```text
/// r_i = ln η_model(γ̇_i) - ln η_i
/// ```
///
/// The parameters are carried as logarithms, which keeps all four positive
/// without constraints and makes the problem well scaled across the decades
/// a flow curve spans.
///
/// # References
/// - Cross (1965), "Rheology of non-Newtonian fluids: a new flow equation
///   for pseudoplastic systems", J. Colloid Sci. 20
/// - Marquardt (1963), "An algorithm for least-squares estimation of
///   nonlinear parameters", SIAM J. Appl. Math. 11

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RheoError};

/// Shear rates prepended / appended to the measured ones when drawing the
/// model curve, so the plateaus are visible
pub const CURVE_LOW_RATES: [f64; 6] = [1e-4, 5e-4, 1e-3, 5e-3, 0.01, 0.05];
pub const CURVE_HIGH_RATES: [f64; 8] = [5e3, 1e4, 2e4, 5e4, 1e5, 2e5, 5e5, 1e6];

/// Evaluate the Cross model at one shear rate
#[inline]
pub fn cross_viscosity(shear_rate: f64, eta_0: f64, eta_inf: f64, consistency: f64, rate_index: f64) -> f64 {
    (eta_0 - eta_inf) / (1.0 + (shear_rate * consistency).powf(rate_index)) + eta_inf
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CrossParameters {
    pub eta_0: f64,
    pub eta_inf: f64,
    pub consistency: f64,
    pub rate_index: f64,
}

impl CrossParameters {
    pub fn viscosity(&self, shear_rate: f64) -> f64 {
        cross_viscosity(shear_rate, self.eta_0, self.eta_inf, self.consistency, self.rate_index)
    }

    /// Model curve over the measured rates extended by the plateau rates
    pub fn curve(&self, measured_rates: &[f64]) -> Vec<(f64, f64)> {
        let mut rates: Vec<f64> = CURVE_LOW_RATES
            .iter()
            .chain(measured_rates)
            .chain(CURVE_HIGH_RATES.iter())
            .copied()
            .collect();
        rates.sort_by(|a, b| a.total_cmp(b));
        rates.into_iter().map(|s| (s, self.viscosity(s))).collect()
    }

    fn to_log(self) -> SVector<f64, 4> {
        SVector::<f64, 4>::new(
            self.eta_0.ln(),
            self.eta_inf.ln(),
            self.consistency.ln(),
            self.rate_index.ln(),
        )
    }

    fn from_log(theta: &SVector<f64, 4>) -> Self {
        Self {
            eta_0: theta[0].exp(),
            eta_inf: theta[1].exp(),
            consistency: theta[2].exp(),
            rate_index: theta[3].exp(),
        }
    }
}

/// Configuration for the Levenberg-Marquardt fit
#[derive(Debug, Clone)]
pub struct CrossFitConfig {
    /// Maximum number of accepted + rejected steps
    pub max_iterations: usize,
    /// Stop when the relative cost decrease of an accepted step is below this
    pub tolerance: f64,
    /// Initial damping λ
    pub lambda_init: f64,
    /// Factor applied to λ after a rejected step
    pub lambda_increase: f64,
    /// Factor applied to λ after an accepted step
    pub lambda_decrease: f64,
}

impl Default for CrossFitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-12,
            lambda_init: 1e-3,
            lambda_increase: 10.0,
            lambda_decrease: 0.1,
        }
    }
}

/// Statistics from the fit
#[derive(Debug, Clone)]
pub struct CrossFitStats {
    pub iterations: usize,
    pub converged: bool,
    /// Final ½ Σ r²
    pub final_cost: f64,
}

#[derive(Debug, Clone)]
pub struct CrossFit {
    pub parameters: CrossParameters,
    /// Root-mean-square relative residual, in percent
    pub standard_error: f64,
    pub stats: CrossFitStats,
}

/// RMS of (model - data) / data, in percent
pub fn relative_rms_error(params: &CrossParameters, shear_rate: &[f64], viscosity: &[f64]) -> f64 {
    let n = shear_rate.len().max(1) as f64;
    let sum: f64 = shear_rate
        .iter()
        .zip(viscosity)
        .map(|(s, eta)| ((params.viscosity(*s) - eta) / eta).powi(2))
        .sum();
    100.0 * (sum / n).sqrt()
}

/// Starting point read off the flow curve
///
/// η₀ from the low-rate plateau, η∞ below the lowest reading, K from the
/// rate where viscosity has dropped halfway, n = 1.
pub fn initial_guess(shear_rate: &[f64], viscosity: &[f64]) -> CrossParameters {
    let eta_max = viscosity.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let eta_min = viscosity.iter().copied().fold(f64::INFINITY, f64::min);
    let eta_0 = eta_max * 1.05;
    let eta_inf = (eta_min * 0.5).min(eta_0 * 0.1);
    let half = 0.5 * (eta_0 + eta_inf);

    let mut order: Vec<usize> = (0..shear_rate.len()).collect();
    order.sort_by(|&a, &b| shear_rate[a].total_cmp(&shear_rate[b]));
    let half_rate = order
        .iter()
        .find(|&&i| viscosity[i] <= half)
        .map(|&i| shear_rate[i])
        .unwrap_or_else(|| shear_rate[order[order.len() / 2]]);

    CrossParameters {
        eta_0,
        eta_inf,
        consistency: 1.0 / half_rate,
        rate_index: 1.0,
    }
}

fn residuals_and_jacobian(
    theta: &SVector<f64, 4>,
    shear_rate: &[f64],
    log_viscosity: &[f64],
) -> (Vec<f64>, Vec<SVector<f64, 4>>) {
    let p = CrossParameters::from_log(theta);
    let (a, b, k, n) = (p.eta_0, p.eta_inf, p.consistency, p.rate_index);
    let mut residuals = Vec::with_capacity(shear_rate.len());
    let mut rows = Vec::with_capacity(shear_rate.len());
    for (&s, &log_eta) in shear_rate.iter().zip(log_viscosity) {
        let ks = k * s;
        let x = ks.powf(n);
        let denom = 1.0 + x;
        let m = (a - b) / denom + b;
        residuals.push(m.ln() - log_eta);

        // d(ln m)/d(ln θ_j) = θ_j/m · ∂m/∂θ_j
        let d_a = a / denom / m;
        let d_b = b * x / denom / m;
        let d_k = -(a - b) * n * x / (denom * denom) / m;
        let d_n = -(a - b) * x * ks.ln() * n / (denom * denom) / m;
        rows.push(SVector::<f64, 4>::new(d_a, d_b, d_k, d_n));
    }
    (residuals, rows)
}

fn cost(residuals: &[f64]) -> f64 {
    0.5 * residuals.iter().map(|r| r * r).sum::<f64>()
}

/// Fit the Cross model to a flow curve
///
/// # Arguments
/// * `shear_rate` - Shear rates (1/s); non-positive points are ignored
/// * `viscosity` - Steady-shear viscosities (Pa·s); non-positive points are ignored
/// * `config` - Damping schedule and stopping rule
///
/// # Errors
/// `EmptySelection` with fewer than four usable points, `Numerical` when the
/// normal equations break down.
pub fn fit_cross_model(shear_rate: &[f64], viscosity: &[f64], config: &CrossFitConfig) -> Result<CrossFit> {
    let (rates, etas): (Vec<f64>, Vec<f64>) = shear_rate
        .iter()
        .zip(viscosity)
        .filter(|(s, eta)| **s > 0.0 && **eta > 0.0 && s.is_finite() && eta.is_finite())
        .map(|(s, eta)| (*s, *eta))
        .unzip();
    if rates.len() < 4 {
        return Err(RheoError::EmptySelection(format!(
            "Cross fit needs at least 4 positive points, got {}",
            rates.len()
        )));
    }
    let log_eta: Vec<f64> = etas.iter().map(|e| e.ln()).collect();

    let mut theta = initial_guess(&rates, &etas).to_log();
    let (mut r, mut jac) = residuals_and_jacobian(&theta, &rates, &log_eta);
    let mut current_cost = cost(&r);
    let mut lambda = config.lambda_init;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        // Normal equations JᵀJ δ = -Jᵀr
        let mut jtj = SMatrix::<f64, 4, 4>::zeros();
        let mut jtr = SVector::<f64, 4>::zeros();
        for (row, ri) in jac.iter().zip(&r) {
            jtj += row * row.transpose();
            jtr += row * *ri;
        }

        let mut damped = jtj;
        for i in 0..4 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }
        let delta = match damped.cholesky() {
            Some(chol) => chol.solve(&(-jtr)),
            None => {
                lambda *= config.lambda_increase;
                if lambda > 1e16 {
                    return Err(RheoError::Numerical("Cross fit normal equations are singular".into()));
                }
                continue;
            }
        };

        let candidate = theta + delta;
        let (r_new, jac_new) = residuals_and_jacobian(&candidate, &rates, &log_eta);
        let new_cost = cost(&r_new);

        if new_cost.is_finite() && new_cost < current_cost {
            let improvement = (current_cost - new_cost) / current_cost.max(f64::MIN_POSITIVE);
            theta = candidate;
            r = r_new;
            jac = jac_new;
            current_cost = new_cost;
            lambda = (lambda * config.lambda_decrease).max(1e-15);
            if improvement < config.tolerance || current_cost < 1e-20 {
                converged = true;
                break;
            }
        } else {
            lambda *= config.lambda_increase;
            if lambda > 1e16 {
                // No descent direction left: we are at a minimum to machine precision
                converged = true;
                break;
            }
        }
    }

    let parameters = CrossParameters::from_log(&theta);
    if !(parameters.eta_0.is_finite() && parameters.eta_inf.is_finite()) {
        return Err(RheoError::Numerical("Cross fit diverged".into()));
    }
    let standard_error = relative_rms_error(&parameters, &rates, &etas);
    debug!(
        iterations,
        converged,
        eta_0 = parameters.eta_0,
        eta_inf = parameters.eta_inf,
        k = parameters.consistency,
        n = parameters.rate_index,
        "Cross fit finished"
    );

    Ok(CrossFit {
        parameters,
        standard_error,
        stats: CrossFitStats {
            iterations,
            converged,
            final_cost: current_cost,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn log_rates(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10f64.powf(-2.0 + 6.0 * i as f64 / (n - 1) as f64)).collect()
    }

    #[test]
    fn test_cross_limits() {
        let p = CrossParameters { eta_0: 2.0, eta_inf: 0.01, consistency: 0.5, rate_index: 0.8 };
        assert_relative_eq!(p.viscosity(0.0), 2.0);
        assert!((p.viscosity(1e9) - 0.01).abs() < 1e-4);
        // At γ̇ = 1/K the viscosity is halfway between the plateaus
        assert_relative_eq!(p.viscosity(2.0), 0.5 * (2.0 + 0.01), epsilon = 1e-12);
    }

    #[test]
    fn test_fit_recovers_exact_parameters() {
        let truth = CrossParameters { eta_0: 3.5, eta_inf: 0.002, consistency: 1.7, rate_index: 0.75 };
        let rates = log_rates(30);
        let etas: Vec<f64> = rates.iter().map(|s| truth.viscosity(*s)).collect();

        let fit = fit_cross_model(&rates, &etas, &CrossFitConfig::default()).unwrap();
        assert!(fit.stats.converged);
        assert_relative_eq!(fit.parameters.eta_0, truth.eta_0, max_relative = 1e-4);
        assert_relative_eq!(fit.parameters.consistency, truth.consistency, max_relative = 1e-3);
        assert_relative_eq!(fit.parameters.rate_index, truth.rate_index, max_relative = 1e-3);
        assert_relative_eq!(fit.parameters.eta_inf, truth.eta_inf, max_relative = 1e-2);
        assert!(fit.standard_error < 1e-3);
    }

    #[test]
    fn test_fit_with_noise_stays_close() {
        let truth = CrossParameters { eta_0: 0.8, eta_inf: 0.003, consistency: 1.0, rate_index: 0.6 };
        let rates = log_rates(25);
        // Deterministic ±2% zig-zag
        let etas: Vec<f64> = rates
            .iter()
            .enumerate()
            .map(|(i, s)| truth.viscosity(*s) * if i % 2 == 0 { 1.02 } else { 0.98 })
            .collect();
        let fit = fit_cross_model(&rates, &etas, &CrossFitConfig::default()).unwrap();
        assert_relative_eq!(fit.parameters.eta_0, truth.eta_0, max_relative = 0.1);
        assert_relative_eq!(fit.parameters.rate_index, truth.rate_index, max_relative = 0.15);
        assert!(fit.standard_error > 0.5 && fit.standard_error < 3.0);
    }

    #[test]
    fn test_fit_needs_four_points() {
        let err = fit_cross_model(&[1.0, 2.0, 3.0, -1.0], &[1.0, 0.9, 0.8, 0.7], &CrossFitConfig::default());
        assert!(matches!(err, Err(RheoError::EmptySelection(_))));
    }

    #[test]
    fn test_curve_extends_measured_range() {
        let p = CrossParameters { eta_0: 1.0, eta_inf: 0.01, consistency: 1.0, rate_index: 1.0 };
        let curve = p.curve(&[10.0, 1.0]);
        assert_eq!(curve.len(), CURVE_LOW_RATES.len() + 2 + CURVE_HIGH_RATES.len());
        assert_eq!(curve[0].0, 1e-4);
        assert_eq!(curve.last().unwrap().0, 1e6);
        assert!(curve.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_initial_guess_is_ordered() {
        let rates = log_rates(10);
        let p = CrossParameters { eta_0: 1.0, eta_inf: 0.01, consistency: 1.0, rate_index: 1.0 };
        let etas: Vec<f64> = rates.iter().map(|s| p.viscosity(*s)).collect();
        let guess = initial_guess(&rates, &etas);
        assert!(guess.eta_0 > guess.eta_inf);
        assert!(guess.consistency > 0.0);
    }
}
