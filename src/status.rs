//! Diagnostics log for correction chains
//!
//! Every stage reports progress and range warnings here instead of to a
//! process-wide status bar. The chain owns the log; callers decide how to
//! surface it. Each entry is also emitted as a `tracing` event at a level
//! matching its severity.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Severity Bands (defaults, overridden by corrections.toml)
// ============================================================================

/// Out-of-range fraction above which a report is a warning
pub const DEFAULT_WARNING_FRACTION: f64 = 0.05;

/// Out-of-range fraction above which a report is critical
pub const DEFAULT_CRITICAL_FRACTION: f64 = 0.20;

/// Severity of a diagnostic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    /// Shown orange by status displays
    Warning,
    /// Shown red by status displays
    Critical,
}

impl Severity {
    pub const fn is_orange(self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }

    pub const fn is_red(self) -> bool {
        matches!(self, Self::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Fraction bands used to grade out-of-range reports.
///
/// Both bounds are exclusive: a fraction exactly on a bound stays in the
/// lower band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBands {
    pub warning_fraction: f64,
    pub critical_fraction: f64,
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            warning_fraction: DEFAULT_WARNING_FRACTION,
            critical_fraction: DEFAULT_CRITICAL_FRACTION,
        }
    }
}

impl SeverityBands {
    /// Bands from the active config, or the built-in defaults if no config
    /// has been initialised.
    pub fn from_config() -> Self {
        if crate::config::is_initialized() {
            let dm = &crate::config::get().deviation_matrix;
            Self {
                warning_fraction: dm.warning_fraction,
                critical_fraction: dm.critical_fraction,
            }
        } else {
            Self::default()
        }
    }

    /// Grade an out-of-range fraction.
    pub fn classify(&self, fraction: f64) -> Severity {
        if fraction > self.critical_fraction {
            Severity::Critical
        } else if fraction > self.warning_fraction {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

/// One entry in the diagnostics log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Append-only diagnostics log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an informational entry.
    pub fn add(&mut self, message: impl Into<String>) {
        self.add_with_severity(message, Severity::Info);
    }

    /// Append an entry with an explicit severity.
    pub fn add_with_severity(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        match severity {
            Severity::Info => info!(target: "pcwg::status", "{}", message),
            Severity::Warning => warn!(target: "pcwg::status", "{}", message),
            Severity::Critical => error!(target: "pcwg::status", "{}", message),
        }
        self.entries.push(Diagnostic { severity, message });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most severe entry in the log, if any.
    pub fn worst(&self) -> Option<Severity> {
        self.entries.iter().map(|d| d.severity).max()
    }

    /// Whether any entry's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }

    /// Render the log as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}
