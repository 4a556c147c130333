//! Correction Configuration Module
//!
//! Analysis-wide settings for correction chains (reference density, REWS
//! model, deviation-matrix severity bands, default column names), loaded
//! from TOML.
//!
//! ## Loading Order
//!
//! 1. `PCWG_CONFIG` environment variable (path to TOML file)
//! 2. `corrections.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! config::init(CorrectionConfig::load());
//!
//! let reference = config::get().density.reference_density;
//! ```

mod correction_config;
pub mod validation;

pub use correction_config::*;

use std::sync::OnceLock;

/// Active configuration, initialised once at startup.
static CORRECTION_CONFIG: OnceLock<CorrectionConfig> = OnceLock::new();

/// Initialise the active configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: CorrectionConfig) {
    if CORRECTION_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Active configuration, or the built-in defaults if `init()` has not run.
pub fn get() -> &'static CorrectionConfig {
    static DEFAULTS: OnceLock<CorrectionConfig> = OnceLock::new();
    CORRECTION_CONFIG
        .get()
        .unwrap_or_else(|| DEFAULTS.get_or_init(CorrectionConfig::default))
}

/// Whether `init()` has been called.
pub fn is_initialized() -> bool {
    CORRECTION_CONFIG.get().is_some()
}
