//! Logging initialization.
//!
//! `-v` flags raise this crate's own level first and leave dependencies
//! one step quieter. `TRAFFICLIGHT_LOG_LEVEL` replaces the whole filter.
//! Light workers (`light-<name>`) and observers (`observer-<name>-<i>`)
//! run on named threads, so thread names are shown from `-v` up.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable that overrides the verbosity flag.
pub const LOG_LEVEL_ENV: &str = "TRAFFICLIGHT_LOG_LEVEL";

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable, optionally colored.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

/// Filter directive for a `-v` count.
#[must_use]
pub fn verbosity_directive(verbosity: u8) -> String {
    let (crate_level, deps_level) = match verbosity {
        0 => return "warn".to_owned(),
        1 => ("info", "warn"),
        2 => ("debug", "info"),
        _ => ("trace", "debug"),
    };
    format!("{deps_level},{}={crate_level}", env!("CARGO_CRATE_NAME"))
}

/// Builds the filter from `env_override` or, failing that, `verbosity`.
///
/// Returns the rejected override text alongside the fallback filter so
/// the caller can report it once logging is up.
fn build_filter(verbosity: u8, env_override: Option<&str>) -> (EnvFilter, Option<String>) {
    let fallback = || EnvFilter::new(verbosity_directive(verbosity));
    match env_override {
        None => (fallback(), None),
        Some(raw) => EnvFilter::try_new(raw).map_or_else(
            |_| (fallback(), Some(raw.to_owned())),
            |filter| (filter, None),
        ),
    }
}

const fn use_ansi(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_terminal && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Installs the global subscriber writing to stderr.
///
/// Later calls are ignored, which keeps tests that initialize logging
/// more than once safe.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let env_override = std::env::var(LOG_LEVEL_ENV).ok();
    let (filter, rejected) = build_filter(verbosity, env_override.as_deref());

    let show_threads = verbosity >= 1;
    let show_target = verbosity >= 2;

    let installed = match format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi(
                color,
                std::io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            ))
            .with_target(show_target)
            .with_thread_names(show_threads)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(show_target)
            .with_thread_names(show_threads)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if let (Ok(()), Some(raw)) = (installed, rejected) {
        tracing::warn!(
            value = %raw,
            "ignoring invalid {}, using -v level",
            LOG_LEVEL_ENV
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(verbosity_directive(0), "warn");
    }

    #[test]
    fn verbose_raises_crate_before_dependencies() {
        assert_eq!(verbosity_directive(1), "warn,trafficlight=info");
        assert_eq!(verbosity_directive(2), "info,trafficlight=debug");
        assert_eq!(verbosity_directive(3), "debug,trafficlight=trace");
        assert_eq!(verbosity_directive(u8::MAX), verbosity_directive(3));
    }

    #[test]
    fn every_directive_parses() {
        for v in 0..=4 {
            assert!(EnvFilter::try_new(verbosity_directive(v)).is_ok(), "-v x{v}");
        }
    }

    #[test]
    fn env_override_wins() {
        let (filter, rejected) = build_filter(0, Some("trafficlight::phase=trace"));
        assert!(rejected.is_none());
        assert!(filter.to_string().contains("trafficlight::phase=trace"));
    }

    #[test]
    fn invalid_override_falls_back_to_verbosity() {
        let (filter, rejected) = build_filter(1, Some("north=loud"));
        assert_eq!(rejected.as_deref(), Some("north=loud"));
        assert!(filter.to_string().contains("trafficlight=info"));
    }

    #[test]
    fn color_resolution() {
        assert!(use_ansi(ColorChoice::Auto, true, false));
        assert!(!use_ansi(ColorChoice::Auto, true, true));
        assert!(!use_ansi(ColorChoice::Auto, false, false));
        assert!(use_ansi(ColorChoice::Always, false, true));
        assert!(!use_ansi(ColorChoice::Never, true, false));
    }

    #[test]
    fn init_logging_twice_is_harmless() {
        init_logging(LogFormat::Human, 0, ColorChoice::Never);
        init_logging(LogFormat::Json, 3, ColorChoice::Never);
    }
}
