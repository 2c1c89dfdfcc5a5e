//! Simulation file loader
//!
//! Pipeline: read file, strip BOM, parse YAML, validate, collect warnings.

use std::path::{Path, PathBuf};

use crate::config::schema::SimulationConfig;
use crate::config::validation::validate_simulation;
use crate::error::ConfigError;

/// Largest simulation file accepted, in bytes.
pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Ratio of poll interval to shortest phase above which a warning is issued.
const COARSE_POLL_RATIO: u32 = 10;

/// Result of loading a simulation file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: SimulationConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Non-fatal finding during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Loads and validates a simulation file from disk.
///
/// # Errors
///
/// Returns [`ConfigError::MissingFile`] if the file cannot be read,
/// [`ConfigError::InvalidValue`] if it is too large,
/// [`ConfigError::ParseError`] on malformed YAML, and
/// [`ConfigError::ValidationError`] if any rule is violated.
pub fn load_simulation(path: &Path) -> Result<LoadResult, ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;

    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(ConfigError::InvalidValue {
            field: "file_size".to_owned(),
            value: format!("{} bytes", metadata.len()),
            expected: format!("at most {MAX_CONFIG_SIZE} bytes"),
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;

    parse_simulation(&raw, path)
}

/// Parses and validates simulation YAML; `origin` is used in error messages.
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] on malformed YAML and
/// [`ConfigError::ValidationError`] if any rule is violated.
pub fn parse_simulation(raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let config: SimulationConfig =
        serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from(origin),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

    let errors = validate_simulation(&config);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationError {
            path: origin.display().to_string(),
            errors,
        });
    }

    let warnings = collect_warnings(&config);
    Ok(LoadResult { config, warnings })
}

fn collect_warnings(config: &SimulationConfig) -> Vec<LoadWarning> {
    let mut warnings = Vec::new();

    for (i, light) in config.lights.iter().enumerate() {
        if light.poll_interval.saturating_mul(COARSE_POLL_RATIO) > light.min_cycle {
            warnings.push(LoadWarning {
                message: format!(
                    "poll_interval {} is coarse relative to min_cycle {}; toggles may lag",
                    humantime::format_duration(light.poll_interval),
                    humantime::format_duration(light.min_cycle)
                ),
                location: Some(format!("lights[{i}].poll_interval")),
            });
        }
    }

    if config.simulation.observers_per_light == 0 {
        warnings.push(LoadWarning {
            message: "no observers configured; phase changes will queue unconsumed".to_owned(),
            location: Some("simulation.observers_per_light".to_owned()),
        });
    }

    warnings
}
