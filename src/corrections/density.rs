//! Density-equivalent wind speed correction

use super::node::{NodeId, WindSpeedId};
use super::{CorrectionChain, CorrectionError};
use crate::calculators::DensityCorrectionCalculator;
use crate::collaborators::PowerCurve;
use crate::dataset::Dataset;

/// Normalises the parent's wind speed to a reference air density.
///
/// Writes `"<name> Wind Speed"` and, given a power curve, `"<name> Power"`.
#[derive(Debug, Clone, Copy)]
pub struct DensityEquivalentWindSpeed {
    pub node: WindSpeedId,
    /// kg/m^3
    pub reference_density: f64,
}

impl DensityEquivalentWindSpeed {
    pub const LABEL: &'static str = "Density";

    pub fn apply(
        chain: &mut CorrectionChain,
        dataset: &mut Dataset,
        parent: impl Into<NodeId>,
        reference_density: f64,
        hub_density_column: &str,
        power_curve: Option<&dyn PowerCurve>,
    ) -> Result<Self, CorrectionError> {
        let parent = parent.into();
        let source_column = chain.parent_wind_speed_column(Self::LABEL, parent)?;
        let node = chain.wind_speed_correction(Self::LABEL, parent)?;

        chain.diagnostics_mut().add(format!(
            "Correcting to reference density of {reference_density:.4} kg/m^3"
        ));

        let calculator =
            DensityCorrectionCalculator::new(reference_density, &source_column, hub_density_column);
        let values = dataset.map_rows(|row| calculator.density_corrected_wind_speed(row))?;

        let target = chain.node(node).wind_speed_column().unwrap_or_default().to_string();
        dataset.insert_column(target, values)?;

        chain.finalise_wind_speed(node, dataset, power_curve)?;

        Ok(Self {
            node,
            reference_density,
        })
    }
}
