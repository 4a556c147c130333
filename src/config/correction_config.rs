//! Correction Configuration - operator-tunable settings as TOML values
//!
//! Each section implements `Default` so that an empty or missing file
//! reproduces the standard analysis settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::status::{DEFAULT_CRITICAL_FRACTION, DEFAULT_WARNING_FRACTION};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PCWG_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "corrections.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a correction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// Density normalisation
    #[serde(default)]
    pub density: DensityConfig,

    /// Rotor-equivalent wind speed model
    #[serde(default)]
    pub rews: RewsConfig,

    /// Deviation-matrix range reporting
    #[serde(default)]
    pub deviation_matrix: DeviationMatrixConfig,

    /// Default dataset column names
    #[serde(default)]
    pub columns: ColumnConfig,
}

impl CorrectionConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PCWG_CONFIG`
    /// 2. `./corrections.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded correction config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded correction config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys are logged, not rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML text.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every setting for physical sense.
    ///
    /// Rules:
    /// - All values finite
    /// - Reference density and REWS exponent positive
    /// - Severity fractions within [0, 1], warning below critical
    /// - Column names non-empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let density = self.density.reference_density;
        if !density.is_finite() || density <= 0.0 {
            errors.push(format!(
                "density.reference_density must be a positive number (got {density})"
            ));
        }

        let exponent = self.rews.exponent;
        if !exponent.is_finite() || exponent <= 0.0 {
            errors.push(format!("rews.exponent must be a positive number (got {exponent})"));
        }

        let dm = &self.deviation_matrix;
        for (name, value) in [
            ("warning_fraction", dm.warning_fraction),
            ("critical_fraction", dm.critical_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!(
                    "deviation_matrix.{name} must be within [0, 1] (got {value})"
                ));
            }
        }
        if dm.critical_fraction <= dm.warning_fraction {
            errors.push(format!(
                "deviation_matrix.critical_fraction ({:.3}) must be > warning_fraction ({:.3})",
                dm.critical_fraction, dm.warning_fraction
            ));
        }

        for (name, value) in [
            ("hub_wind_speed", &self.columns.hub_wind_speed),
            ("hub_density", &self.columns.hub_density),
            ("hub_turbulence", &self.columns.hub_turbulence),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("columns.{name} must not be empty"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// Density normalisation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Reference air density (kg/m^3)
    pub reference_density: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            reference_density: 1.225,
        }
    }
}

/// Rotor-equivalent wind speed model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewsConfig {
    /// 3.0 energy-flux (REWS), 2.0 momentum-flux (RAWS)
    pub exponent: f64,
    pub veer: bool,
    pub upflow: bool,
}

impl Default for RewsConfig {
    fn default() -> Self {
        Self {
            exponent: 3.0,
            veer: false,
            upflow: false,
        }
    }
}

/// Severity bands for out-of-range deviation-matrix lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviationMatrixConfig {
    pub warning_fraction: f64,
    pub critical_fraction: f64,
}

impl Default for DeviationMatrixConfig {
    fn default() -> Self {
        Self {
            warning_fraction: DEFAULT_WARNING_FRACTION,
            critical_fraction: DEFAULT_CRITICAL_FRACTION,
        }
    }
}

/// Default names of the measured hub-height columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub hub_wind_speed: String,
    pub hub_density: String,
    pub hub_turbulence: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            hub_wind_speed: "Hub Wind Speed".to_string(),
            hub_density: "Hub Density".to_string(),
            hub_turbulence: "Hub Turbulence".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
