//! Power deviation matrix correction
//!
//! Scales power-curve output by the empirical deviation the matrix holds for
//! each row's parameter values, then reports how many lookups fell outside
//! the matrix's calibrated range. Out-of-range lookups never fail the
//! correction; they are graded against the chain's severity bands:
//!
//! - `> critical_fraction` (0.20): critical
//! - `> warning_fraction` (0.05): warning
//! - otherwise: info

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::{NodeId, PowerId};
use super::{display_number, CorrectionChain, CorrectionError};
use crate::calculators::PowerDeviationMatrixPowerCalculator;
use crate::collaborators::{DeviationMatrix, PowerCurve};
use crate::dataset::Dataset;
use crate::status::{Severity, SeverityBands};

/// Range coverage of one matrix dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionRangeReport {
    pub parameter: String,
    pub out_of_range_fraction: f64,
    pub below_fraction: f64,
    pub above_fraction: f64,
    pub center_of_first_bin: f64,
    pub center_of_last_bin: f64,
    /// This dimension's own grade. Status lines use the overall grade.
    pub severity: Severity,
}

/// Range coverage of a whole matrix after a correction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfRangeReport {
    pub out_of_range_fraction: f64,
    pub severity: Severity,
    pub dimensions: Vec<DimensionRangeReport>,
}

impl OutOfRangeReport {
    /// Read the matrix's counters for the lookups made since its last reset.
    pub fn collect<M: DeviationMatrix + ?Sized>(matrix: &M, bands: &SeverityBands) -> Self {
        let overall = matrix.out_of_range_fraction(None);
        let dimensions = matrix
            .dimensions()
            .iter()
            .map(|dimension| {
                let fraction = matrix.out_of_range_fraction(Some(&dimension.parameter));
                DimensionRangeReport {
                    parameter: dimension.parameter.clone(),
                    out_of_range_fraction: fraction,
                    below_fraction: matrix.below_fraction(&dimension.parameter),
                    above_fraction: matrix.above_fraction(&dimension.parameter),
                    center_of_first_bin: dimension.center_of_first_bin,
                    center_of_last_bin: dimension.center_of_last_bin,
                    severity: bands.classify(fraction),
                }
            })
            .collect();

        Self {
            out_of_range_fraction: overall,
            severity: bands.classify(overall),
            dimensions,
        }
    }

    /// Status lines for this report. Every line carries the overall grade,
    /// dimension lines included.
    pub fn messages(&self) -> Vec<(String, Severity)> {
        let mut lines = vec![(
            format!(
                "Fraction of PDM values out of range {:.2}%",
                self.out_of_range_fraction * 100.0
            ),
            self.severity,
        )];

        for d in &self.dimensions {
            lines.push((
                format!(
                    "-{} values out of range {:.2}% [{} to {}]",
                    d.parameter,
                    d.out_of_range_fraction * 100.0,
                    display_number(d.center_of_first_bin),
                    display_number(d.center_of_last_bin),
                ),
                self.severity,
            ));
            lines.push((
                format!("--{:.2}% values below", d.below_fraction * 100.0),
                self.severity,
            ));
            lines.push((
                format!("--{:.2}% values above", d.above_fraction * 100.0),
                self.severity,
            ));
        }

        lines
    }
}

/// Power curve output adjusted by an N-dimensional deviation matrix.
#[derive(Debug, Clone)]
pub struct PowerDeviationMatrixCorrection {
    pub node: PowerId,
    pub report: OutOfRangeReport,
}

impl PowerDeviationMatrixCorrection {
    /// `"<N>D Power Deviation Matrix"`
    pub fn label(dimensions: usize) -> String {
        format!("{dimensions}D Power Deviation Matrix")
    }

    /// `parameter_columns` maps each matrix parameter to the dataset column
    /// holding its values.
    pub fn apply<M: DeviationMatrix + ?Sized>(
        chain: &mut CorrectionChain,
        dataset: &mut Dataset,
        parent: impl Into<NodeId>,
        power_deviation_matrix: &mut M,
        parameter_columns: &BTreeMap<String, String>,
        power_curve: &dyn PowerCurve,
    ) -> Result<Self, CorrectionError> {
        let parent = parent.into();
        let label = Self::label(power_deviation_matrix.dimensions().len());
        let source_column = chain.parent_wind_speed_column(&label, parent)?;

        power_deviation_matrix.reset_out_of_range_count();

        let node = {
            let mut calculator = PowerDeviationMatrixPowerCalculator::new(
                power_curve,
                &mut *power_deviation_matrix,
                &source_column,
                parameter_columns,
            )?;
            let node = chain.power_correction(&label, parent)?;
            chain.finalise_power(node, dataset, &mut calculator)?;
            node
        };

        let report = OutOfRangeReport::collect(&*power_deviation_matrix, chain.bands());
        for (message, severity) in report.messages() {
            chain.diagnostics_mut().add_with_severity(message, severity);
        }

        Ok(Self { node, report })
    }
}
