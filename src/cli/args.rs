//! CLI argument definitions
//!
//! All Clap derive structs for `trafficlight` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Randomized traffic lights observed through blocking channels.
#[derive(Parser, Debug)]
#[command(name = "trafficlight", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TRAFFICLIGHT_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run lights and observers until the duration elapses or Ctrl+C.
    Run(RunArgs),

    /// Validate a simulation file without running it.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Run Command
// ============================================================================

/// Arguments for `run`.
///
/// Either a simulation file or the inline light flags describe the lights;
/// `--observers` and `--duration` override the file's settings.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a YAML simulation file.
    #[arg(short, long, env = "TRAFFICLIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of lights to run.
    #[arg(long, default_value_t = 1, conflicts_with = "config")]
    pub lights: usize,

    /// Shortest phase (e.g. `4s`, `4500ms`).
    #[arg(long, value_parser = humantime::parse_duration, conflicts_with = "config")]
    pub min_cycle: Option<Duration>,

    /// Longest phase (e.g. `6s`).
    #[arg(long, value_parser = humantime::parse_duration, conflicts_with = "config")]
    pub max_cycle: Option<Duration>,

    /// Sleep between two elapsed-time checks of each light.
    #[arg(long, value_parser = humantime::parse_duration, conflicts_with = "config")]
    pub poll_interval: Option<Duration>,

    /// Base RNG seed; light `i` uses `seed + i`.
    #[arg(long, conflicts_with = "config")]
    pub seed: Option<u64>,

    /// Observer threads waiting for green on each light.
    #[arg(long)]
    pub observers: Option<usize>,

    /// Stop after this long (e.g. `30s`); runs until interrupted otherwise.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Write JSONL events to this file (`-` for stdout).
    #[arg(long, env = "TRAFFICLIGHT_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on 127.0.0.1:<PORT>.
    #[arg(long, env = "TRAFFICLIGHT_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

// ============================================================================
// Validate Command
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Simulation file to validate.
    #[arg(required = true)]
    pub file: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Version Command
// ============================================================================

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}
