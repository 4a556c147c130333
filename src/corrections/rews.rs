//! Rotor-equivalent wind speed correction
//!
//! Hub-height wind speed is scaled by the ratio of rotor-equivalent to hub
//! wind speed that each original dataset computes from its profile
//! measurements:
//!
//! - exponent 3.0: energy-flux equivalent (REWS)
//! - exponent 2.0: momentum-flux equivalent (RAWS)
//! - anything else: generic `REWS-Exponent=<value>`

use tracing::debug;

use super::node::{NodeId, WindSpeedId};
use super::{display_number, CorrectionChain, CorrectionError};
use crate::collaborators::{DeviationMatrixDefinition, OriginalDataset, PowerCurve};
use crate::config::RewsConfig;
use crate::dataset::{Dataset, Series};

/// Column holding the joined REWS-to-hub ratios
pub const REWS_TO_HUB_RATIO_COLUMN: &str = "REWS to Hub Ratio";

/// Column name reserved for the ratio deviation
pub const REWS_TO_HUB_DEVIATION_COLUMN: &str = "REWS To Hub Ratio Deviation";

/// Correction label for a REWS model, e.g. `REWS (Speed+Veer)`.
pub fn rews_label(exponent: f64, veer: bool, upflow: bool) -> String {
    #[allow(clippy::float_cmp)]
    let exponent_type = if exponent == 3.0 {
        "REWS".to_string()
    } else if exponent == 2.0 {
        "RAWS".to_string()
    } else {
        format!("REWS-Exponent={}", display_number(exponent))
    };

    let mut rews_type = String::from("Speed");
    if veer {
        rews_type.push_str("+Veer");
    }
    if upflow {
        rews_type.push_str("+Upflow");
    }

    format!("{exponent_type} ({rews_type})")
}

/// Rotor-equivalent wind speed stage.
///
/// Keeps the deviation matrix comparing the REWS ratio against the parent's
/// wind speed for later reporting.
#[derive(Debug)]
pub struct RotorEquivalentWindSpeed<M> {
    pub node: WindSpeedId,
    pub model: RewsConfig,
    pub rews_matrix: M,
}

impl<M> RotorEquivalentWindSpeed<M> {
    pub const fn ratio_column(&self) -> &'static str {
        REWS_TO_HUB_RATIO_COLUMN
    }

    pub const fn deviation_column(&self) -> &'static str {
        REWS_TO_HUB_DEVIATION_COLUMN
    }

    #[allow(clippy::too_many_arguments)]
    pub fn apply<D>(
        chain: &mut CorrectionChain,
        dataset: &mut Dataset,
        parent: impl Into<NodeId>,
        original_datasets: &[&dyn OriginalDataset],
        model: &RewsConfig,
        deviation_matrix_definition: &D,
        power_curve: Option<&dyn PowerCurve>,
    ) -> Result<Self, CorrectionError>
    where
        D: DeviationMatrixDefinition<Matrix = M>,
    {
        let parent = parent.into();
        let label = rews_label(model.exponent, model.veer, model.upflow);
        let source_column = chain.parent_wind_speed_column(&label, parent)?;
        let node = chain.wind_speed_correction(&label, parent)?;

        let ratios = original_datasets
            .iter()
            .map(|original| original.calculate_rews(model.veer, model.upflow, model.exponent))
            .collect::<Result<Vec<Series>, _>>()?;
        let joined = Series::inner_join(&ratios);
        debug!(
            datasets = original_datasets.len(),
            rows = joined.len(),
            "Joined REWS to hub ratios"
        );
        dataset.insert_series(REWS_TO_HUB_RATIO_COLUMN, &joined);

        let speeds = dataset.column(&source_column)?;
        let ratio = dataset.column(REWS_TO_HUB_RATIO_COLUMN)?;
        let values: Vec<f64> = speeds.iter().zip(ratio).map(|(v, r)| v * r).collect();

        let target = chain.node(node).wind_speed_column().unwrap_or_default().to_string();
        dataset.insert_column(target, values)?;

        chain.diagnostics_mut().add("Calculating REWS Deviation Matrix...");
        let rews_matrix = deviation_matrix_definition.new_deviation_matrix(
            dataset,
            REWS_TO_HUB_RATIO_COLUMN,
            &source_column,
        )?;
        chain.diagnostics_mut().add("REWS Deviation Matrix Complete.");

        chain.finalise_wind_speed(node, dataset, power_curve)?;

        Ok(Self {
            node,
            model: model.clone(),
            rews_matrix,
        })
    }
}
