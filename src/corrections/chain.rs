//! Append-only arena of correction nodes
//!
//! Nodes refer to their parent by [`NodeId`]. Every node's ancestry is a
//! linear path back to a source; several corrections may branch from the
//! same wind-speed-based parent (e.g. Turbulence and a deviation matrix both
//! built on Density).

use tracing::debug;

use super::node::{compose_name, CorrectionNode, NodeId, NodeKind, PowerId, Produces, SourceId, WindSpeedId};
use super::CorrectionError;
use crate::calculators::{PowerCalculator, RowCalculator};
use crate::collaborators::PowerCurve;
use crate::dataset::Dataset;
use crate::status::{Diagnostics, SeverityBands};

/// Correction nodes plus the diagnostics they reported.
#[derive(Debug, Clone)]
pub struct CorrectionChain {
    nodes: Vec<CorrectionNode>,
    diagnostics: Diagnostics,
    bands: SeverityBands,
}

impl Default for CorrectionChain {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrectionChain {
    /// Empty chain using the configured severity bands.
    pub fn new() -> Self {
        Self::with_bands(SeverityBands::from_config())
    }

    pub fn with_bands(bands: SeverityBands) -> Self {
        Self {
            nodes: Vec::new(),
            diagnostics: Diagnostics::new(),
            bands,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node metadata.
    ///
    /// # Panics
    ///
    /// Panics if `id` was handed out by a different chain and lies past the
    /// end of this one. Use [`get`](Self::get) for ids of unknown origin.
    pub fn node(&self, id: impl Into<NodeId>) -> &CorrectionNode {
        &self.nodes[id.into().0]
    }

    /// Node metadata, or `None` if `id` does not belong to this chain.
    pub fn get(&self, id: impl Into<NodeId>) -> Option<&CorrectionNode> {
        self.nodes.get(id.into().0)
    }

    /// `id` followed by each of its ancestors, ending at the source.
    ///
    /// # Panics
    ///
    /// Panics on an id from another chain, as [`node`](Self::node) does.
    pub fn ancestry(&self, id: impl Into<NodeId>) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id.into()), move |&current| self.nodes[current.0].parent)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub const fn bands(&self) -> &SeverityBands {
        &self.bands
    }

    fn push(&mut self, node: CorrectionNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    // ========================================================================
    // Source
    // ========================================================================

    /// Root a chain at a measured wind-speed column.
    pub fn source(&mut self, wind_speed_column: impl Into<String>) -> SourceId {
        self.push_source(Some(wind_speed_column.into()))
    }

    /// Root for estimators that do not start from a wind-speed column.
    pub fn columnless_source(&mut self) -> SourceId {
        self.push_source(None)
    }

    fn push_source(&mut self, wind_speed_column: Option<String>) -> SourceId {
        SourceId(self.push(CorrectionNode {
            parent: None,
            kind: NodeKind::Source,
            stages: Vec::new(),
            correction_name: None,
            wind_speed_column,
            power_column: None,
        }))
    }

    /// Write `"<wind speed column> Power"` when a power curve is given.
    pub fn finalise_source(
        &mut self,
        id: SourceId,
        dataset: &mut Dataset,
        power_curve: Option<&dyn PowerCurve>,
    ) -> Result<(), CorrectionError> {
        let Some(wind_speed_column) = self.node(id).wind_speed_column.clone() else {
            debug!("Column-less source has nothing to finalise");
            return Ok(());
        };

        self.write_power_from_curve(id.id(), dataset, power_curve, &wind_speed_column, &wind_speed_column)?;
        self.diagnostics
            .add(format!("{wind_speed_column} Power Complete."));
        Ok(())
    }

    // ========================================================================
    // Correction base
    // ========================================================================

    /// Whether a correction may be built on `parent`.
    pub fn can_chain(&self, parent: impl Into<NodeId>) -> bool {
        self.node(parent).is_wind_speed_based()
    }

    /// Provenance name a correction labelled `label` would get on `parent`.
    pub fn calculate_name(&self, parent: impl Into<NodeId>, label: &str) -> String {
        compose_name(&self.stages_after(parent.into(), label))
    }

    fn stages_after(&self, parent: NodeId, label: &str) -> Vec<String> {
        let mut stages = self.nodes[parent.0].stages.clone();
        stages.push(label.to_string());
        stages
    }

    /// Validate `parent`, name the new correction and announce it.
    fn begin(
        &mut self,
        label: &str,
        parent: NodeId,
        produces: Produces,
    ) -> Result<NodeId, CorrectionError> {
        if !self.can_chain(parent) {
            return Err(CorrectionError::CannotChain {
                correction: label.to_string(),
                parent: self.node(parent).display_name(),
            });
        }

        let stages = self.stages_after(parent, label);
        let name = compose_name(&stages);

        let (wind_speed_column, power_column) = match produces {
            Produces::WindSpeed => (Some(format!("{name} Wind Speed")), None),
            Produces::Power => (None, Some(format!("{name} Power"))),
        };

        self.diagnostics.add(format!("Performing {name} Correction..."));

        Ok(self.push(CorrectionNode {
            parent: Some(parent),
            kind: NodeKind::Correction(produces),
            stages,
            correction_name: Some(name),
            wind_speed_column,
            power_column,
        }))
    }

    // ========================================================================
    // Wind-speed based
    // ========================================================================

    /// Start a correction that produces `"<name> Wind Speed"`.
    pub fn wind_speed_correction(
        &mut self,
        label: &str,
        parent: impl Into<NodeId>,
    ) -> Result<WindSpeedId, CorrectionError> {
        self.begin(label, parent.into(), Produces::WindSpeed)
            .map(WindSpeedId)
    }

    /// Write `"<name> Power"` when a power curve is given, then report
    /// completion. The wind-speed column must already be written.
    pub fn finalise_wind_speed(
        &mut self,
        id: WindSpeedId,
        dataset: &mut Dataset,
        power_curve: Option<&dyn PowerCurve>,
    ) -> Result<(), CorrectionError> {
        let node = self.node(id);
        let name = node.correction_name.clone().unwrap_or_default();
        let wind_speed_column = node.wind_speed_column.clone().unwrap_or_default();

        self.write_power_from_curve(id.id(), dataset, power_curve, &name, &wind_speed_column)?;
        self.diagnostics.add(format!("{name} Correction Complete."));
        Ok(())
    }

    fn write_power_from_curve(
        &mut self,
        node: NodeId,
        dataset: &mut Dataset,
        power_curve: Option<&dyn PowerCurve>,
        name: &str,
        wind_speed_column: &str,
    ) -> Result<(), CorrectionError> {
        let Some(curve) = power_curve else {
            self.nodes[node.0].power_column = None;
            return Ok(());
        };

        let power_column = format!("{name} Power");
        let mut calculator = PowerCalculator::new(curve, wind_speed_column);
        let values = dataset.map_rows(|row| calculator.power(row))?;
        dataset.insert_column(power_column.clone(), values)?;
        debug!(column = %power_column, rows = dataset.len(), "Power column written");

        self.nodes[node.0].power_column = Some(power_column);
        Ok(())
    }

    // ========================================================================
    // Power based
    // ========================================================================

    /// Start a correction that produces `"<name> Power"`.
    pub fn power_correction(
        &mut self,
        label: &str,
        parent: impl Into<NodeId>,
    ) -> Result<PowerId, CorrectionError> {
        self.begin(label, parent.into(), Produces::Power).map(PowerId)
    }

    /// Map `calculator` over every row into the node's power column.
    pub fn finalise_power<C: RowCalculator + ?Sized>(
        &mut self,
        id: PowerId,
        dataset: &mut Dataset,
        calculator: &mut C,
    ) -> Result<(), CorrectionError> {
        let node = self.node(id);
        let name = node.correction_name.clone().unwrap_or_default();
        let power_column = node.power_column.clone().unwrap_or_default();

        let values = dataset.map_rows(|row| calculator.power(row))?;
        dataset.insert_column(power_column.as_str(), values)?;
        debug!(column = %power_column, rows = dataset.len(), "Power column written");

        self.diagnostics.add(format!("{name} Correction Complete."));
        Ok(())
    }

    /// Wind-speed column of `parent`, as read by the correction `label`.
    ///
    /// Stages resolve this before constructing their node, so a parent that
    /// cannot feed them leaves the chain and its diagnostics untouched.
    pub(crate) fn parent_wind_speed_column(
        &self,
        label: &str,
        parent: NodeId,
    ) -> Result<String, CorrectionError> {
        let node = self.node(parent);
        if !node.is_wind_speed_based() {
            return Err(CorrectionError::CannotChain {
                correction: label.to_string(),
                parent: node.display_name(),
            });
        }
        node.wind_speed_column
            .clone()
            .ok_or_else(|| CorrectionError::MissingWindSpeed {
                correction: label.to_string(),
                parent: node.display_name(),
            })
    }
}
