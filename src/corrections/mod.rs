//! Correction Chains
//!
//! A chain starts at a [`Source`](chain::CorrectionChain::source) wrapping a
//! measured wind-speed column and is extended one correction at a time. Each
//! correction derives a new column from its parent's output and names it
//! after the corrections applied so far:
//!
//! ```text
//! Source("Hub Wind Speed")
//!   -> Density                 "Density Wind Speed"
//!   -> Turbulence              "Density & Turbulence Power"
//! ```
//!
//! ## Stage kinds
//!
//! - **Wind-speed based** (Density, REWS): produce `"<name> Wind Speed"` and,
//!   given a power curve, `"<name> Power"`. May be followed by further
//!   corrections.
//! - **Power based** (Turbulence, deviation matrix, production by height,
//!   web service): produce `"<name> Power"` only. Nothing may follow them.
//!
//! Building a correction on a power-based parent fails with
//! [`CorrectionError::CannotChain`].

pub mod chain;
pub mod density;
pub mod deviation_matrix;
pub mod node;
pub mod production_by_height;
pub mod rews;
pub mod turbulence;
pub mod web_service;

pub use chain::CorrectionChain;
pub use density::DensityEquivalentWindSpeed;
pub use deviation_matrix::{DimensionRangeReport, OutOfRangeReport, PowerDeviationMatrixCorrection};
pub use node::{compose_name, CorrectionNode, NodeId, NodeKind, PowerId, Produces, SourceId, WindSpeedId};
pub use production_by_height::ProductionByHeightCorrection;
pub use rews::{rews_label, RotorEquivalentWindSpeed};
pub use turbulence::TurbulenceCorrection;
pub use web_service::WebServiceCorrection;

use thiserror::Error;

use crate::dataset::DatasetError;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("{correction} cannot follow {parent}")]
    CannotChain { correction: String, parent: String },

    #[error("{correction} needs a wind speed column but {parent} has none")]
    MissingWindSpeed { correction: String, parent: String },

    #[error("No column mapped for deviation matrix parameter: {0}")]
    UnmappedParameter(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },
}

/// Render a number the way status messages show parameters: whole numbers
/// keep one decimal place (`3.0`), others print in full (`2.5`).
pub(crate) fn display_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
