//! Turbulence correction

use super::node::{NodeId, PowerId};
use super::{CorrectionChain, CorrectionError};
use crate::calculators::TurbulencePowerCalculator;
use crate::collaborators::TurbulencePowerCurve;
use crate::dataset::Dataset;

/// Power from a turbulence-aware power curve at the parent's wind speed and
/// the measured turbulence intensity.
#[derive(Debug, Clone, Copy)]
pub struct TurbulenceCorrection {
    pub node: PowerId,
}

impl TurbulenceCorrection {
    pub const LABEL: &'static str = "Turbulence";

    pub fn apply(
        chain: &mut CorrectionChain,
        dataset: &mut Dataset,
        parent: impl Into<NodeId>,
        hub_turbulence_column: &str,
        power_curve: &dyn TurbulencePowerCurve,
    ) -> Result<Self, CorrectionError> {
        let parent = parent.into();
        let source_column = chain.parent_wind_speed_column(Self::LABEL, parent)?;
        let node = chain.power_correction(Self::LABEL, parent)?;

        let mut calculator =
            TurbulencePowerCalculator::new(power_curve, &source_column, hub_turbulence_column);
        chain.finalise_power(node, dataset, &mut calculator)?;

        Ok(Self { node })
    }
}
