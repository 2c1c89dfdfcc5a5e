//! `validate` command
//!
//! Loads a simulation file, reports warnings, and prints a summary.

use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::load_simulation;
use crate::error::{ConfigError, TrafficLightError, ValidationIssue};

/// Validate a simulation file without running it.
///
/// # Errors
///
/// Returns a config error if the file is missing, malformed, or invalid,
/// or if `--strict` is set and any warning was produced.
pub fn run(args: &ValidateArgs) -> Result<(), TrafficLightError> {
    tracing::info!(file = %args.file.display(), "validating simulation file");
    let result = load_simulation(&args.file)?;

    for warning in &result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    if args.strict && !result.warnings.is_empty() {
        return Err(ConfigError::ValidationError {
            path: args.file.display().to_string(),
            errors: result
                .warnings
                .iter()
                .map(|w| ValidationIssue {
                    path: w.location.clone().unwrap_or_default(),
                    message: w.message.clone(),
                })
                .collect(),
        }
        .into());
    }

    let names: Vec<&str> = result.config.lights.iter().map(|l| l.name.as_str()).collect();
    match args.format {
        OutputFormat::Human => {
            println!(
                "{}: valid ({} light{}: {})",
                args.file.display(),
                names.len(),
                if names.len() == 1 { "" } else { "s" },
                names.join(", ")
            );
        }
        OutputFormat::Json => {
            let warnings: Vec<_> = result
                .warnings
                .iter()
                .map(|w| json!({ "location": w.location, "message": w.message }))
                .collect();
            let report = json!({
                "file": args.file.display().to_string(),
                "valid": true,
                "lights": names,
                "observers_per_light": result.config.simulation.observers_per_light,
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
