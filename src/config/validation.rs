//! Unknown-key detection for correction config files.
//!
//! The raw TOML is walked as a `toml::Value` tree before serde sees it.
//! Keys that do not belong to `CorrectionConfig` produce warnings with a
//! closest-match suggestion. Warnings never reject a file.

use std::collections::HashSet;

/// Largest edit distance still offered as a suggestion
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// A non-fatal config warning.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Every valid dotted key path of `CorrectionConfig`.
///
/// Kept by hand in step with `correction_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        "density",
        "density.reference_density",
        "rews",
        "rews.exponent",
        "rews.veer",
        "rews.upflow",
        "deviation_matrix",
        "deviation_matrix.warning_fraction",
        "deviation_matrix.critical_fraction",
        "columns",
        "columns.hub_wind_speed",
        "columns.hub_density",
        "columns.hub_turbulence",
    ]
    .into_iter()
    .collect()
}

/// Collect dotted paths of every key (tables included) under `value`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let Some(table) = value.as_table() else {
        return Vec::new();
    };

    let mut keys = Vec::new();
    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if child.is_table() {
            keys.extend(walk_toml_keys(child, &path));
        }
        keys.push(path);
    }
    keys
}

/// Edit distance between two strings, counted in chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }

    row[b.len()]
}

/// Closest known key within `MAX_SUGGESTION_DISTANCE` edits.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, edit_distance(unknown, k)))
        .filter(|&(_, d)| d <= MAX_SUGGESTION_DISTANCE)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.to_string())
}

/// Warn about every key the config does not define.
///
/// Unparseable text yields no warnings; serde reports the parse error.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    let mut found = walk_toml_keys(&value, "");
    found.sort();

    found
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}
