//! Production-by-height correction

use tracing::debug;

use super::node::PowerId;
use super::{CorrectionChain, CorrectionError};
use crate::collaborators::{OriginalDataset, PowerCurve};
use crate::dataset::{Dataset, Series};

/// Power blended from the production each original dataset estimates at
/// several measurement heights.
///
/// Does not read a wind-speed column, so it roots itself on a fresh
/// column-less source.
#[derive(Debug, Clone, Copy)]
pub struct ProductionByHeightCorrection {
    pub node: PowerId,
}

impl ProductionByHeightCorrection {
    pub const LABEL: &'static str = "Production by Height";

    pub fn apply(
        chain: &mut CorrectionChain,
        dataset: &mut Dataset,
        original_datasets: &[&dyn OriginalDataset],
        power_curve: &dyn PowerCurve,
    ) -> Result<Self, CorrectionError> {
        let source = chain.columnless_source();
        let node = chain.power_correction(Self::LABEL, source)?;

        let estimates = original_datasets
            .iter()
            .map(|original| original.calculate_production_by_height(power_curve))
            .collect::<Result<Vec<Series>, _>>()?;
        let joined = Series::inner_join(&estimates);

        let column = chain.node(node).power_column().unwrap_or_default().to_string();
        debug!(column = %column, rows = joined.len(), "Joined production by height");
        dataset.insert_series(column, &joined);

        chain
            .diagnostics_mut()
            .add(format!("{} Correction Complete.", Self::LABEL));

        Ok(Self { node })
    }
}
