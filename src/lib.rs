//! PCWG Corrections: corrected wind speed and power for power-curve analysis
//!
//! Measured hub wind speed and power are adjusted for physical effects by
//! chaining named corrections over a shared dataset. Each correction writes
//! a new column named after the corrections applied so far, e.g.
//! `"Density Wind Speed"` or `"Density & Turbulence Power"`.
//!
//! ## Architecture
//!
//! - **Dataset**: row-indexed table of named columns, appended to by each stage
//! - **Calculators**: pure row-wise formulas (density scaling, deviation-adjusted power)
//! - **Corrections**: chain arena, naming rules and the concrete stages
//! - **Collaborators**: traits for power curves, deviation matrices and original datasets
//! - **Status**: severity-graded diagnostics log
//! - **Config**: TOML settings for reference density, REWS model and severity bands

pub mod calculators;
pub mod collaborators;
pub mod config;
pub mod corrections;
pub mod dataset;
pub mod status;

// Re-export configuration
pub use config::CorrectionConfig;

// Re-export the chain and its stages
pub use corrections::{
    CorrectionChain, CorrectionError, CorrectionNode, DensityEquivalentWindSpeed, NodeId,
    PowerDeviationMatrixCorrection, ProductionByHeightCorrection, RotorEquivalentWindSpeed,
    TurbulenceCorrection, WebServiceCorrection,
};

// Re-export collaborator interfaces
pub use calculators::RowCalculator;
pub use collaborators::{
    DeviationMatrix, DeviationMatrixDefinition, MatrixDimension, OriginalDataset, PowerCurve,
    TurbulencePowerCurve,
};

// Re-export data and diagnostics
pub use dataset::{Dataset, DatasetError, Row, Series};
pub use status::{Diagnostic, Diagnostics, Severity, SeverityBands};
