//! Error types for `trafficlight`
//!
//! One enum per concern (channel, light lifecycle, configuration) plus a
//! top-level error that the binary maps onto process exit codes.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `trafficlight` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Light lifecycle or channel error
    pub const LIGHT_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `trafficlight` operations.
///
/// Aggregates the domain errors and provides exit code mapping for the
/// command-line driver.
#[derive(Debug, Error)]
pub enum TrafficLightError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Light lifecycle error
    #[error(transparent)]
    Light(#[from] LightError),

    /// Blocking channel error
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrafficLightError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Light(_) | Self::Channel(_) => ExitCode::LIGHT_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Channel Errors
// ============================================================================

/// Receive-side failures of a [`BlockingChannel`](crate::channel::BlockingChannel).
///
/// Sending only fails on a closed channel; that case is reported through
/// [`SendError`](crate::channel::SendError) so the value is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel is closed and every queued item has been received
    #[error("channel closed")]
    Closed,

    /// No item arrived before the timeout elapsed
    #[error("timed out waiting for an item")]
    Timeout,

    /// Nothing is queued right now (non-blocking receive only)
    #[error("channel empty")]
    Empty,
}

// ============================================================================
// Light Errors
// ============================================================================

/// Lifecycle and observation errors of a [`TrafficLight`](crate::phase::TrafficLight).
#[derive(Debug, Error)]
pub enum LightError {
    /// `start()` was called on a light that is already running
    #[error("light '{0}' is already running")]
    AlreadyStarted(String),

    /// The light has been stopped; its phase channel is closed
    #[error("light '{0}' is stopped")]
    Stopped(String),

    /// A bounded wait elapsed without observing the requested phase
    #[error("light '{name}' did not turn {phase} within {timeout:?}")]
    Timeout {
        /// Light name
        name: String,
        /// Phase that was awaited
        phase: crate::phase::Phase,
        /// Wait bound that elapsed
        timeout: std::time::Duration,
    },

    /// The background thread could not be spawned
    #[error("failed to spawn worker for light '{name}': {source}")]
    Spawn {
        /// Light name
        name: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The background thread panicked before it could be joined
    #[error("worker thread of light '{0}' panicked")]
    WorkerPanicked(String),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", format_issues(.errors))]
    ValidationError {
        /// Path to the configuration file (or `<inline>`)
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "lights[1].max_cycle")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        let cases: Vec<(TrafficLightError, i32)> = vec![
            (
                ConfigError::MissingFile {
                    path: PathBuf::from("/x"),
                }
                .into(),
                ExitCode::CONFIG_ERROR,
            ),
            (
                LightError::AlreadyStarted("north".into()).into(),
                ExitCode::LIGHT_ERROR,
            ),
            (ChannelError::Closed.into(), ExitCode::LIGHT_ERROR),
            (
                TrafficLightError::Usage("bad flag".into()),
                ExitCode::USAGE_ERROR,
            ),
            (
                std::io::Error::new(std::io::ErrorKind::NotFound, "x").into(),
                ExitCode::IO_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.exit_code(), expected, "Wrong exit code for {err}");
        }
    }

    #[test]
    fn test_validation_error_lists_issues() {
        let err = ConfigError::ValidationError {
            path: "sim.yaml".into(),
            errors: vec![
                ValidationIssue {
                    path: "lights[0].min_cycle".into(),
                    message: "must be greater than zero".into(),
                },
                ValidationIssue {
                    path: "lights[1].name".into(),
                    message: "duplicate light name 'north'".into(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("sim.yaml"));
        assert!(msg.contains("must be greater than zero at lights[0].min_cycle"));
        assert!(msg.contains("duplicate light name 'north' at lights[1].name"));
    }

    #[test]
    fn test_light_timeout_message() {
        let err = LightError::Timeout {
            name: "north".into(),
            phase: crate::phase::Phase::Green,
            timeout: std::time::Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "light 'north' did not turn green within 250ms"
        );
    }
}
