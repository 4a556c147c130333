//! Row-wise calculators
//!
//! Each calculator is a pure function of one dataset row, carrying only the
//! column names and models it needs. Power calculators implement
//! [`RowCalculator`] so a power-based correction can map any of them (or an
//! external estimator) over the dataset.

use std::collections::BTreeMap;

use crate::collaborators::{DeviationMatrix, PowerCurve, TurbulencePowerCurve};
use crate::corrections::CorrectionError;
use crate::dataset::Row;

/// Anything that can produce a power value for a dataset row.
pub trait RowCalculator {
    fn power(&mut self, row: &Row<'_>) -> Result<f64, CorrectionError>;
}

/// Power straight from a power curve at the row's wind speed.
pub struct PowerCalculator<'a> {
    power_curve: &'a dyn PowerCurve,
    wind_speed_column: &'a str,
}

impl<'a> PowerCalculator<'a> {
    pub fn new(power_curve: &'a dyn PowerCurve, wind_speed_column: &'a str) -> Self {
        Self {
            power_curve,
            wind_speed_column,
        }
    }
}

impl RowCalculator for PowerCalculator<'_> {
    fn power(&mut self, row: &Row<'_>) -> Result<f64, CorrectionError> {
        Ok(self.power_curve.power(row.get(self.wind_speed_column)?))
    }
}

/// Density-equivalent wind speed
///
/// Scales the measured speed so that the kinetic energy flux at the
/// reference density equals the flux at the measured density.
///
/// Formula: `V_ref = V × (ρ / ρ_ref)^(1/3)`
#[derive(Debug, Clone)]
pub struct DensityCorrectionCalculator<'a> {
    reference_density: f64,
    wind_speed_column: &'a str,
    density_column: &'a str,
}

impl<'a> DensityCorrectionCalculator<'a> {
    pub fn new(reference_density: f64, wind_speed_column: &'a str, density_column: &'a str) -> Self {
        Self {
            reference_density,
            wind_speed_column,
            density_column,
        }
    }

    pub fn density_corrected_wind_speed(&self, row: &Row<'_>) -> Result<f64, CorrectionError> {
        let wind_speed = row.get(self.wind_speed_column)?;
        let density = row.get(self.density_column)?;
        Ok(density_equivalent_wind_speed(
            wind_speed,
            density,
            self.reference_density,
        ))
    }
}

/// `wind_speed × (density / reference_density)^(1/3)`
pub fn density_equivalent_wind_speed(wind_speed: f64, density: f64, reference_density: f64) -> f64 {
    wind_speed * (density / reference_density).powf(1.0 / 3.0)
}

/// Power from a turbulence-aware curve at the row's wind speed and
/// turbulence intensity.
pub struct TurbulencePowerCalculator<'a> {
    power_curve: &'a dyn TurbulencePowerCurve,
    rated_power: f64,
    wind_speed_column: &'a str,
    turbulence_column: &'a str,
}

impl<'a> TurbulencePowerCalculator<'a> {
    pub fn new(
        power_curve: &'a dyn TurbulencePowerCurve,
        wind_speed_column: &'a str,
        turbulence_column: &'a str,
    ) -> Self {
        Self {
            rated_power: power_curve.rated_power(),
            power_curve,
            wind_speed_column,
            turbulence_column,
        }
    }

    pub const fn rated_power(&self) -> f64 {
        self.rated_power
    }
}

impl RowCalculator for TurbulencePowerCalculator<'_> {
    fn power(&mut self, row: &Row<'_>) -> Result<f64, CorrectionError> {
        let wind_speed = row.get(self.wind_speed_column)?;
        let turbulence = row.get(self.turbulence_column)?;
        Ok(self.power_curve.turbulence_power(wind_speed, turbulence))
    }
}

/// Power curve output scaled by the deviation matrix entry for the row's
/// parameter values.
///
/// Formula: `P = P_curve(V) × (1 + deviation)`
pub struct PowerDeviationMatrixPowerCalculator<'a, M: DeviationMatrix + ?Sized> {
    power_curve: &'a dyn PowerCurve,
    matrix: &'a mut M,
    wind_speed_column: &'a str,
    /// Column holding each dimension's parameter, in dimension order
    columns: Vec<(String, &'a str)>,
}

impl<'a, M: DeviationMatrix + ?Sized> PowerDeviationMatrixPowerCalculator<'a, M> {
    /// Fails if a matrix dimension has no entry in `parameter_columns`.
    pub fn new(
        power_curve: &'a dyn PowerCurve,
        matrix: &'a mut M,
        wind_speed_column: &'a str,
        parameter_columns: &'a BTreeMap<String, String>,
    ) -> Result<Self, CorrectionError> {
        let columns = matrix
            .dimensions()
            .iter()
            .map(|dimension| {
                parameter_columns
                    .get(&dimension.parameter)
                    .map(|column| (dimension.parameter.clone(), column.as_str()))
                    .ok_or_else(|| CorrectionError::UnmappedParameter(dimension.parameter.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            power_curve,
            matrix,
            wind_speed_column,
            columns,
        })
    }
}

impl<M: DeviationMatrix + ?Sized> RowCalculator for PowerDeviationMatrixPowerCalculator<'_, M> {
    fn power(&mut self, row: &Row<'_>) -> Result<f64, CorrectionError> {
        let mut parameters = BTreeMap::new();
        for (parameter, column) in &self.columns {
            parameters.insert(parameter.clone(), row.get(column)?);
        }

        let deviation = self.matrix.deviation(&parameters);
        let wind_speed = row.get(self.wind_speed_column)?;
        Ok(self.power_curve.power(wind_speed) * (1.0 + deviation))
    }
}
