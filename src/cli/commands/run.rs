//! `run` command
//!
//! Builds the simulation from a file or inline flags, runs it until the
//! duration elapses or a shutdown signal arrives, then stops and joins
//! every thread.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::config::schema::{LightConfig, SimulationConfig, SimulationSettings};
use crate::config::{load_simulation, validate_simulation};
use crate::error::{ConfigError, TrafficLightError};
use crate::observability::events::{EventEmitter, StopReason};
use crate::simulation::Simulation;

/// Run lights and observers.
///
/// # Errors
///
/// Returns a usage or config error for bad input, an I/O error if the
/// events file or metrics endpoint cannot be opened, or a light error if
/// a light fails to start or stop.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), TrafficLightError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let config = build_config(args)?;
    let events = Arc::new(open_events(args.events_file.as_deref())?);

    let sim = Simulation::start(&config, events)?;

    let reason = match config.simulation.duration {
        Some(duration) => {
            tokio::select! {
                () = cancel.cancelled() => StopReason::Interrupted,
                () = tokio::time::sleep(duration) => StopReason::Completed,
            }
        }
        None => {
            cancel.cancelled().await;
            StopReason::Interrupted
        }
    };
    tracing::info!(?reason, "stopping simulation");

    // Joining worker and observer threads blocks.
    let summary = tokio::task::spawn_blocking(move || sim.shutdown(reason))
        .await
        .map_err(|e| TrafficLightError::Io(std::io::Error::other(e.to_string())))??;

    eprintln!("{summary}");
    Ok(())
}

/// Builds the simulation from `--config` or the inline light flags and
/// applies the `--observers` / `--duration` overrides.
///
/// # Errors
///
/// Returns a usage error for `--lights 0`, or a config error if loading
/// or validation fails.
pub fn build_config(args: &RunArgs) -> Result<SimulationConfig, TrafficLightError> {
    let mut config = if let Some(path) = &args.config {
        tracing::info!(config = %path.display(), "loading simulation file");
        let result = load_simulation(path)?;
        for warning in &result.warnings {
            tracing::warn!(
                location = warning.location.as_deref().unwrap_or("<unknown>"),
                "{}",
                warning.message
            );
        }
        result.config
    } else {
        if args.lights == 0 {
            return Err(TrafficLightError::Usage(
                "--lights must be at least 1".to_owned(),
            ));
        }
        SimulationConfig {
            simulation: SimulationSettings::default(),
            lights: inline_lights(args),
        }
    };

    if let Some(observers) = args.observers {
        config.simulation.observers_per_light = observers;
    }
    if let Some(duration) = args.duration {
        config.simulation.duration = Some(duration);
    }

    let errors = validate_simulation(&config);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationError {
            path: "<command line>".to_owned(),
            errors,
        }
        .into());
    }
    Ok(config)
}

fn inline_lights(args: &RunArgs) -> Vec<LightConfig> {
    let defaults = LightConfig::default();
    (0..args.lights)
        .zip(0_u64..)
        .map(|(i, offset)| LightConfig {
            name: if args.lights == 1 {
                defaults.name.clone()
            } else {
                format!("{}-{}", defaults.name, i + 1)
            },
            min_cycle: args.min_cycle.unwrap_or(defaults.min_cycle),
            max_cycle: args.max_cycle.unwrap_or(defaults.max_cycle),
            poll_interval: args.poll_interval.unwrap_or(defaults.poll_interval),
            seed: args.seed.map(|seed| seed.wrapping_add(offset)),
        })
        .collect()
}

fn open_events(path: Option<&Path>) -> std::io::Result<EventEmitter> {
    match path {
        None => Ok(EventEmitter::noop()),
        Some(p) if p == Path::new("-") => Ok(EventEmitter::stdout()),
        Some(p) => EventEmitter::from_file(p),
    }
}
