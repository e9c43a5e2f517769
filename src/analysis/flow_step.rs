/// Flow step analysis
///
/// Steady-shear viscosity curve: the viscosity at the reference shear rate
/// and the Cross model parameters. The instrument software usually exports
/// its own Cross fit next to the data; when it does, those values are the
/// sample's parameters and no local fit is made. The model curve is drawn
/// from whichever parameters are reported.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::cross_model::{fit_cross_model, CrossFitConfig, CrossParameters};
use crate::analysis::export::{FlowStepData, InstrumentCrossFit};
use crate::analysis::frequency_sweep::nearest_row;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FlowTargets {
    /// Shear rate at which viscosity is read (1/s)
    #[serde(default = "default_shear_rate")]
    pub shear_rate: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_shear_rate() -> f64 { 3.162 }
fn default_tolerance() -> f64 { 0.05 }

impl Default for FlowTargets {
    fn default() -> Self {
        Self { shear_rate: default_shear_rate(), tolerance: default_tolerance() }
    }
}

/// Origin of the reported Cross parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossSource {
    Instrument,
    Fitted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowStepResult {
    /// Viscosity at the target shear rate (Pa·s)
    pub viscosity_at_target: Option<f64>,
    pub cross: Option<CrossParameters>,
    pub standard_error: Option<f64>,
    pub source: CrossSource,
    /// Model curve over the extended shear-rate range
    pub curve: Vec<(f64, f64)>,
}

pub fn analyze_flow_step(
    data: &FlowStepData,
    instrument: Option<InstrumentCrossFit>,
    targets: &FlowTargets,
) -> FlowStepResult {
    let viscosity_at_target =
        nearest_row(&data.shear_rate, targets.shear_rate, targets.tolerance).map(|i| data.viscosity[i]);

    let (cross, standard_error, source) = match instrument {
        Some(inst) => (
            Some(CrossParameters {
                eta_0: inst.eta_0,
                eta_inf: inst.eta_inf,
                consistency: inst.consistency,
                rate_index: inst.rate_index,
            }),
            inst.standard_error,
            CrossSource::Instrument,
        ),
        None => match fit_cross_model(&data.shear_rate, &data.viscosity, &CrossFitConfig::default()) {
            Ok(fit) => (Some(fit.parameters), Some(fit.standard_error), CrossSource::Fitted),
            Err(e) => {
                warn!(error = %e, "Cross fit skipped");
                (None, None, CrossSource::Fitted)
            }
        },
    };
    debug!(?source, ?cross, "flow step parameters");

    let curve = cross
        .map(|p| p.curve(&data.shear_rate))
        .unwrap_or_default();

    FlowStepResult {
        viscosity_at_target,
        cross,
        standard_error,
        source,
        curve,
    }
}
