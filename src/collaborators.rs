//! Interfaces of the models a correction chain consumes
//!
//! Power curves, deviation matrices and original datasets are built
//! elsewhere; corrections only rely on the operations below.

use std::collections::BTreeMap;

use crate::corrections::CorrectionError;
use crate::dataset::{Dataset, Series};

/// Power as a function of hub wind speed.
pub trait PowerCurve {
    /// Power at `wind_speed` (m/s).
    fn power(&self, wind_speed: f64) -> f64;

    /// Nameplate output of the turbine.
    fn rated_power(&self) -> f64;
}

/// Power curve that also accounts for turbulence intensity.
pub trait TurbulencePowerCurve: PowerCurve {
    fn turbulence_power(&self, wind_speed: f64, turbulence_intensity: f64) -> f64;
}

/// One axis of a deviation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixDimension {
    /// Name of the parameter binned along this axis
    pub parameter: String,
    pub center_of_first_bin: f64,
    pub center_of_last_bin: f64,
}

/// Empirical table of fractional power deviations, keyed by one value
/// per dimension.
///
/// Lookups outside the calibrated range are counted by the matrix itself;
/// the fraction accessors report against the lookups made since the last
/// reset.
pub trait DeviationMatrix {
    fn dimensions(&self) -> &[MatrixDimension];

    /// Deviation fraction at the given parameter values.
    fn deviation(&mut self, parameters: &BTreeMap<String, f64>) -> f64;

    fn reset_out_of_range_count(&mut self);

    /// Fraction of lookups out of range, overall (`None`) or along one
    /// dimension.
    fn out_of_range_fraction(&self, dimension: Option<&str>) -> f64;

    fn below_fraction(&self, dimension: &str) -> f64;

    fn above_fraction(&self, dimension: &str) -> f64;
}

/// Builds a deviation matrix comparing two dataset columns.
pub trait DeviationMatrixDefinition {
    type Matrix;

    /// Bin `value_column` against `bin_column` over the whole dataset.
    fn new_deviation_matrix(
        &self,
        dataset: &Dataset,
        value_column: &str,
        bin_column: &str,
    ) -> Result<Self::Matrix, CorrectionError>;
}

/// A measurement dataset before it was merged into the analysis table.
///
/// Returned series are indexed by the analysis dataset's row labels.
pub trait OriginalDataset {
    /// Ratio of rotor-equivalent to hub wind speed, per row.
    fn calculate_rews(
        &self,
        veer: bool,
        upflow: bool,
        exponent: f64,
    ) -> Result<Series, CorrectionError>;

    /// Production estimate blended from several measurement heights, per row.
    fn calculate_production_by_height(
        &self,
        power_curve: &dyn PowerCurve,
    ) -> Result<Series, CorrectionError>;
}
