//! Multi-light simulation driver
//!
//! Starts a set of lights, attaches observer threads that repeatedly wait
//! for green on each, and tears everything down in order: stop and join
//! every light, then join the observers its closed channel released.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::schema::SimulationConfig;
use crate::error::{LightError, TrafficLightError};
use crate::observability::events::{Event, EventEmitter, RunSummary, StopReason};
use crate::phase::TrafficLight;

/// A running set of lights and their observers.
#[derive(Debug)]
pub struct Simulation {
    lights: Vec<Arc<TrafficLight>>,
    observers: Vec<JoinHandle<()>>,
    released: Arc<AtomicU64>,
    events: Arc<EventEmitter>,
    started: Instant,
}

impl Simulation {
    /// Builds and starts every light in `config` plus its observers.
    ///
    /// Lights that already started are stopped again if a later one fails.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid light, a light error if
    /// a worker cannot be spawned, or an I/O error if an observer thread
    /// cannot be spawned.
    pub fn start(
        config: &SimulationConfig,
        events: Arc<EventEmitter>,
    ) -> Result<Self, TrafficLightError> {
        let mut sim = Self {
            lights: Vec::with_capacity(config.lights.len()),
            observers: Vec::new(),
            released: Arc::new(AtomicU64::new(0)),
            events,
            started: Instant::now(),
        };

        for light_config in &config.lights {
            let light = TrafficLight::new(light_config.clone())?.with_events(Arc::clone(&sim.events));
            let light = Arc::new(light);
            light.start()?;
            sim.lights.push(light);
        }

        let observers_per_light = config.simulation.observers_per_light;
        for light in &sim.lights {
            for index in 0..observers_per_light {
                let handle = spawn_observer(
                    Arc::clone(light),
                    index,
                    Arc::clone(&sim.released),
                    Arc::clone(&sim.events),
                )?;
                sim.observers.push(handle);
            }
        }

        sim.events.emit(Event::SimulationStarted {
            timestamp: Utc::now(),
            lights: sim.lights.iter().map(|l| l.name().to_owned()).collect(),
            observers_per_light,
        });
        info!(
            lights = sim.lights.len(),
            observers_per_light, "simulation started"
        );

        Ok(sim)
    }

    /// Returns the running lights.
    #[must_use]
    pub fn lights(&self) -> &[Arc<TrafficLight>] {
        &self.lights
    }

    /// Returns how many observer waits have completed so far.
    #[must_use]
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Stops every light, joins every thread, and emits the run summary.
    ///
    /// Blocks until all threads have exited.
    ///
    /// # Errors
    ///
    /// Returns the first [`LightError`] reported while stopping; every light
    /// is still stopped and every observer joined.
    pub fn shutdown(mut self, reason: StopReason) -> Result<RunSummary, TrafficLightError> {
        let first_error = self.stop_all();
        let summary = self.summary();

        self.events.emit(Event::SimulationStopped {
            timestamp: Utc::now(),
            reason,
            summary: Some(summary.clone()),
        });
        self.events.flush();
        info!(%summary, ?reason, "simulation stopped");

        first_error.map_or(Ok(summary), |e| Err(e.into()))
    }

    fn stop_all(&mut self) -> Option<LightError> {
        let mut first_error = None;
        for light in &self.lights {
            if let Err(e) = light.stop() {
                warn!(light = %light.name(), error = %e, "light did not stop cleanly");
                first_error.get_or_insert(e);
            }
        }
        for handle in self.observers.drain(..) {
            if handle.join().is_err() {
                warn!("observer thread panicked");
            }
        }
        first_error
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            lights: self.lights.len(),
            phase_transitions: self.lights.iter().map(|l| l.transitions()).sum(),
            observers_released: self.released(),
            uptime_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Only does work if `shutdown` was skipped.
        let _ = self.stop_all();
    }
}

fn spawn_observer(
    light: Arc<TrafficLight>,
    index: usize,
    released: Arc<AtomicU64>,
    events: Arc<EventEmitter>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("observer-{}-{index}", light.name()))
        .spawn(move || {
            loop {
                let waiting_since = Instant::now();
                match light.wait_for_green() {
                    Ok(()) => {
                        let waited = waiting_since.elapsed();
                        released.fetch_add(1, Ordering::SeqCst);
                        info!(light = %light.name(), observer = index, ?waited, "green, proceeding");
                        events.emit(Event::ObserverReleased {
                            timestamp: Utc::now(),
                            light: light.name().to_owned(),
                            observer: index,
                            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    Err(e) => {
                        debug!(light = %light.name(), observer = index, reason = %e, "observer exiting");
                        break;
                    }
                }
            }
        })
}
