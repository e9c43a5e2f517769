/// Cox-Merz cross-check
///
/// For many polymer solutions the steady-shear viscosity η(γ̇) matches the
/// complex viscosity |η*(ω)| at γ̇ = ω. Compares the flow-step viscosity at
/// 3.162 1/s with the frequency-sweep |η*| at 3.142 rad/s, using only rows
/// where all four quantities were recorded.
///
/// # References
/// - Cox & Merz (1958), "Correlation of dynamic and steady flow
///   viscosities", J. Polym. Sci. 28

use crate::analysis::export::{ExperimentExport, ANGULAR_FREQUENCY, COMPLEX_VISCOSITY, SHEAR_RATE, VISCOSITY};
use crate::analysis::flow_step::FlowTargets;
use crate::analysis::frequency_sweep::{nearest_row, FrequencyTargets};
use crate::error::Result;
use crate::utils::relative_deviation;

#[derive(Debug, Clone, PartialEq)]
pub struct CoxMerzResult {
    pub shear_rate: Vec<f64>,
    pub viscosity: Vec<f64>,
    pub frequency: Vec<f64>,
    pub complex_viscosity: Vec<f64>,
    /// η at the target shear rate (Pa·s)
    pub steady_viscosity: Option<f64>,
    /// |η*| at the reference frequency (Pa·s)
    pub dynamic_viscosity: Option<f64>,
}

impl CoxMerzResult {
    /// |η - |η*|| / mean, when both readings exist
    pub fn deviation(&self) -> Option<f64> {
        Some(relative_deviation(self.steady_viscosity?, self.dynamic_viscosity?))
    }
}

pub fn analyze_cox_merz(
    export: &ExperimentExport,
    frequency_targets: &FrequencyTargets,
    flow_targets: &FlowTargets,
) -> Result<CoxMerzResult> {
    let mut cols = export
        .table()
        .complete_numeric(&[SHEAR_RATE, VISCOSITY, ANGULAR_FREQUENCY, COMPLEX_VISCOSITY])?
        .into_iter();
    let shear_rate = cols.next().unwrap_or_default();
    let viscosity = cols.next().unwrap_or_default();
    let frequency = cols.next().unwrap_or_default();
    let complex_viscosity = cols.next().unwrap_or_default();

    let steady_viscosity =
        nearest_row(&shear_rate, flow_targets.shear_rate, flow_targets.tolerance).map(|i| viscosity[i]);
    let dynamic_viscosity = nearest_row(&frequency, frequency_targets.reference, frequency_targets.tolerance)
        .map(|i| complex_viscosity[i]);

    Ok(CoxMerzResult {
        shear_rate,
        viscosity,
        frequency,
        complex_viscosity,
        steady_viscosity,
        dynamic_viscosity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cross_model::cross_viscosity;
    use crate::analysis::export::fixtures::full_export;
    use approx::assert_relative_eq;

    #[test]
    fn test_cox_merz_on_shared_rows() {
        let result = analyze_cox_merz(&full_export(), &FrequencyTargets::default(), &FlowTargets::default()).unwrap();
        // Frequency sweep has 7 rows, flow step 8: only 7 complete
        assert_eq!(result.shear_rate.len(), 7);

        let eta = cross_viscosity(3.162, 2.0, 0.01, 0.5, 0.8);
        let eta_star = (2.0f64 * 2.0 + 1.8 * 1.8).sqrt() / 3.142;
        assert_relative_eq!(result.steady_viscosity.unwrap(), eta, max_relative = 1e-9);
        assert_relative_eq!(result.dynamic_viscosity.unwrap(), eta_star, max_relative = 1e-9);
        assert_relative_eq!(
            result.deviation().unwrap(),
            (eta - eta_star).abs() / ((eta + eta_star) / 2.0),
            max_relative = 1e-9
        );
    }
}
