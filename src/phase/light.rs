//! Traffic light actor
//!
//! A [`TrafficLight`] owns its current phase and a private
//! [`BlockingChannel`] of phase changes. [`start`](TrafficLight::start)
//! spawns a worker thread that toggles the phase whenever a randomly drawn
//! cycle elapses and publishes every new phase to the channel; observers
//! block in [`wait_for_green`](TrafficLight::wait_for_green) draining it.
//!
//! Each published phase is consumed by exactly one waiter. Several
//! observers on one light therefore compete for green deliveries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::channel::BlockingChannel;
use crate::config::schema::LightConfig;
use crate::config::validation::validate_light;
use crate::error::{ChannelError, ConfigError, LightError};
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;

use super::cycle::{CycleSource, UniformCycle};
use super::state::{Phase, PhaseState};

/// Lifecycle of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightStatus {
    /// Created, worker not yet started.
    Idle,
    /// Worker thread is toggling the phase.
    Running,
    /// Stopped; the phase channel is closed. Terminal.
    Stopped,
}

/// State shared between the light handle and its worker.
#[derive(Debug)]
struct Shared {
    state: PhaseState,
    channel: BlockingChannel<Phase>,
}

struct Lifecycle {
    status: LightStatus,
    /// Moved into the worker on start.
    source: Option<Box<dyn CycleSource>>,
    worker: Option<JoinHandle<()>>,
}

/// A traffic light whose phase toggles on its own thread.
///
/// Share it between threads behind an `Arc`; every method takes `&self`.
/// Dropping the light stops and joins its worker.
pub struct TrafficLight {
    config: LightConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    cancel: CancellationToken,
    events: Option<Arc<EventEmitter>>,
}

impl TrafficLight {
    /// Creates an idle light drawing cycles uniformly from the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the configuration is invalid.
    pub fn new(config: LightConfig) -> Result<Self, ConfigError> {
        let source = config.seed.map_or_else(
            || UniformCycle::new(config.min_cycle, config.max_cycle),
            |seed| UniformCycle::seeded(config.min_cycle, config.max_cycle, seed),
        );
        Self::with_source(config, source)
    }

    /// Creates an idle light drawing cycles from `source`.
    ///
    /// The configured bounds are still validated but `source` alone decides
    /// every cycle length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the configuration is invalid.
    pub fn with_source(
        config: LightConfig,
        source: impl CycleSource,
    ) -> Result<Self, ConfigError> {
        let errors = validate_light(&config, "");
        if !errors.is_empty() {
            return Err(ConfigError::ValidationError {
                path: format!("light '{}'", config.name),
                errors,
            });
        }

        Ok(Self {
            config,
            shared: Arc::new(Shared {
                state: PhaseState::new(),
                channel: BlockingChannel::new(),
            }),
            lifecycle: Mutex::new(Lifecycle {
                status: LightStatus::Idle,
                source: Some(Box::new(source)),
                worker: None,
            }),
            cancel: CancellationToken::new(),
            events: None,
        })
    }

    /// Attaches an event emitter; the worker emits a `PhaseChanged` per toggle.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the light's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the light's configuration.
    #[must_use]
    pub const fn config(&self) -> &LightConfig {
        &self.config
    }

    /// Returns the current lifecycle status.
    #[must_use]
    pub fn status(&self) -> LightStatus {
        self.lock_lifecycle().status
    }

    /// Returns the most recently committed phase.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.shared.state.current()
    }

    /// Returns how many toggles the worker has committed.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.shared.state.transitions()
    }

    /// Returns the number of published phases no observer has consumed yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.channel.len()
    }

    /// Spawns the worker thread and returns immediately.
    ///
    /// # Errors
    ///
    /// - [`LightError::AlreadyStarted`] if the light is running
    /// - [`LightError::Stopped`] if the light has been stopped
    /// - [`LightError::Spawn`] if the OS refused to create the thread; the
    ///   light is stopped in that case
    pub fn start(&self) -> Result<(), LightError> {
        let mut lifecycle = self.lock_lifecycle();
        match lifecycle.status {
            LightStatus::Running => {
                warn!(light = %self.name(), "start called on a running light");
                return Err(LightError::AlreadyStarted(self.name().to_owned()));
            }
            LightStatus::Stopped => return Err(LightError::Stopped(self.name().to_owned())),
            LightStatus::Idle => {}
        }

        let Some(source) = lifecycle.source.take() else {
            return Err(LightError::Stopped(self.name().to_owned()));
        };

        let worker = Worker {
            name: self.config.name.clone(),
            poll_interval: self.config.poll_interval,
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
            source,
            events: self.events.clone(),
        };

        let spawned = thread::Builder::new()
            .name(format!("light-{}", self.config.name))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                lifecycle.worker = Some(handle);
                lifecycle.status = LightStatus::Running;
                metrics::record_light_running(true);
                info!(
                    light = %self.name(),
                    min_cycle = ?self.config.min_cycle,
                    max_cycle = ?self.config.max_cycle,
                    poll_interval = ?self.config.poll_interval,
                    "light started"
                );
                Ok(())
            }
            Err(source) => {
                lifecycle.status = LightStatus::Stopped;
                self.shared.channel.close();
                Err(LightError::Spawn {
                    name: self.name().to_owned(),
                    source,
                })
            }
        }
    }

    /// Stops the worker, joins it, and closes the phase channel.
    ///
    /// Blocked waiters return [`LightError::Stopped`]. Idempotent; stopping
    /// an idle light only closes the channel.
    ///
    /// # Errors
    ///
    /// Returns [`LightError::WorkerPanicked`] if the worker thread panicked.
    pub fn stop(&self) -> Result<(), LightError> {
        let worker = {
            let mut lifecycle = self.lock_lifecycle();
            if lifecycle.status == LightStatus::Stopped {
                return Ok(());
            }
            lifecycle.status = LightStatus::Stopped;
            lifecycle.source = None;
            lifecycle.worker.take()
        };

        self.cancel.cancel();
        let was_running = worker.is_some();
        let joined = worker.map_or(Ok(()), |handle| {
            handle
                .join()
                .map_err(|_| LightError::WorkerPanicked(self.name().to_owned()))
        });
        self.shared.channel.close();

        if was_running {
            metrics::record_light_running(false);
            info!(
                light = %self.name(),
                transitions = self.transitions(),
                "light stopped"
            );
        }
        joined
    }

    /// Blocks until the light publishes `phase`.
    ///
    /// Every other published phase is consumed and discarded. There is no
    /// timeout; the wait ends early only if the light is stopped.
    ///
    /// # Errors
    ///
    /// Returns [`LightError::Stopped`] once the light is stopped and no
    /// queued phase remains.
    pub fn wait_for(&self, phase: Phase) -> Result<(), LightError> {
        loop {
            match self.shared.channel.recv() {
                Ok(received) if received == phase => return Ok(()),
                Ok(received) => {
                    trace!(light = %self.name(), phase = %received, "discarding phase");
                }
                Err(_) => return Err(LightError::Stopped(self.name().to_owned())),
            }
        }
    }

    /// Blocks until the light publishes [`Phase::Green`].
    ///
    /// # Errors
    ///
    /// Returns [`LightError::Stopped`] once the light is stopped.
    pub fn wait_for_green(&self) -> Result<(), LightError> {
        let started = Instant::now();
        self.wait_for(Phase::Green)?;
        metrics::record_green_wait(self.name(), started.elapsed());
        Ok(())
    }

    /// Like [`wait_for`](Self::wait_for), but gives up after `timeout`.
    ///
    /// A `timeout` too large to represent as a deadline waits without one.
    ///
    /// # Errors
    ///
    /// - [`LightError::Timeout`] if `phase` was not published in time
    /// - [`LightError::Stopped`] if the light is stopped
    pub fn wait_for_timeout(&self, phase: Phase, timeout: Duration) -> Result<(), LightError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait_for(phase);
        };
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.shared.channel.recv_timeout(remaining) {
                Ok(received) if received == phase => return Ok(()),
                Ok(received) => {
                    trace!(light = %self.name(), phase = %received, "discarding phase");
                }
                Err(ChannelError::Timeout) => {
                    return Err(LightError::Timeout {
                        name: self.name().to_owned(),
                        phase,
                        timeout,
                    });
                }
                Err(ChannelError::Closed | ChannelError::Empty) => {
                    return Err(LightError::Stopped(self.name().to_owned()));
                }
            }
        }
    }

    /// Blocks for at most `timeout` until the light publishes [`Phase::Green`].
    ///
    /// # Errors
    ///
    /// See [`wait_for_timeout`](Self::wait_for_timeout).
    pub fn wait_for_green_timeout(&self, timeout: Duration) -> Result<(), LightError> {
        let started = Instant::now();
        self.wait_for_timeout(Phase::Green, timeout)?;
        metrics::record_green_wait(self.name(), started.elapsed());
        Ok(())
    }
}

impl Drop for TrafficLight {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(light = %self.config.name, error = %e, "light did not stop cleanly");
        }
    }
}

impl std::fmt::Debug for TrafficLight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficLight")
            .field("name", &self.config.name)
            .field("status", &self.status())
            .field("phase", &self.current_phase())
            .field("transitions", &self.transitions())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Everything the worker thread owns.
struct Worker {
    name: String,
    poll_interval: Duration,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    source: Box<dyn CycleSource>,
    events: Option<Arc<EventEmitter>>,
}

impl Worker {
    fn draw_cycle(&mut self) -> Duration {
        let cycle = self.source.next_cycle();
        metrics::record_cycle_duration(&self.name, cycle);
        trace!(light = %self.name, ?cycle, "drew cycle duration");
        cycle
    }

    /// Polls elapsed time every `poll_interval` and toggles once the drawn
    /// cycle has passed. Exits when cancelled or the channel is closed.
    fn run(mut self) {
        metrics::record_phase_shown(&self.name, self.shared.state.current());
        let mut cycle = self.draw_cycle();
        let mut phase_started = Instant::now();

        loop {
            thread::sleep(self.poll_interval);
            if self.cancel.is_cancelled() {
                break;
            }

            if phase_started.elapsed() < cycle {
                continue;
            }

            let transition = self.shared.state.toggle();
            if self.shared.channel.send(transition.to).is_err() {
                debug!(light = %self.name, "phase channel closed, worker exiting");
                break;
            }

            metrics::record_phase_transition(&self.name, transition.from, transition.to);
            debug!(
                light = %self.name,
                from = %transition.from,
                to = %transition.to,
                transition = transition.sequence,
                "phase changed"
            );
            if let Some(events) = &self.events {
                events.emit(Event::PhaseChanged {
                    timestamp: Utc::now(),
                    light: self.name.clone(),
                    from: transition.from,
                    to: transition.to,
                    transition: transition.sequence,
                    cycle_ms: u64::try_from(cycle.as_millis()).unwrap_or(u64::MAX),
                });
            }

            cycle = self.draw_cycle();
            phase_started = Instant::now();
        }

        debug!(light = %self.name, "worker finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::cycle::ScriptedCycle;
    use std::io::Write;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn config(name: &str) -> LightConfig {
        LightConfig::named(name)
            .with_cycle_bounds(ms(5), ms(5_000))
            .with_poll_interval(ms(1))
    }

    fn scripted(name: &str, script: Vec<Duration>) -> TrafficLight {
        TrafficLight::with_source(config(name), ScriptedCycle::new(script)).unwrap()
    }

    #[test]
    fn test_new_light_is_idle_and_red() {
        let light = TrafficLight::new(LightConfig::named("north")).unwrap();
        assert_eq!(light.status(), LightStatus::Idle);
        assert_eq!(light.current_phase(), Phase::Red);
        assert_eq!(light.transitions(), 0);
        assert_eq!(light.name(), "north");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = LightConfig::named("north").with_cycle_bounds(ms(6000), ms(4000));
        let err = TrafficLight::new(bad).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_red_immediately_after_start() {
        let light = TrafficLight::new(LightConfig::named("north")).unwrap();
        light.start().unwrap();
        assert_eq!(light.status(), LightStatus::Running);
        assert_eq!(light.current_phase(), Phase::Red);
        light.stop().unwrap();
    }

    #[test]
    fn test_double_start_rejected() {
        let light = scripted("north", vec![ms(10_000)]);
        light.start().unwrap();
        let err = light.start().unwrap_err();
        assert!(matches!(err, LightError::AlreadyStarted(ref n) if n == "north"));
        light.stop().unwrap();
    }

    #[test]
    fn test_start_after_stop_rejected() {
        let light = scripted("north", vec![ms(10_000)]);
        light.start().unwrap();
        light.stop().unwrap();
        assert_eq!(light.status(), LightStatus::Stopped);
        assert!(matches!(light.start(), Err(LightError::Stopped(_))));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let light = scripted("north", vec![ms(10_000)]);
        light.start().unwrap();
        light.stop().unwrap();
        light.stop().unwrap();
    }

    #[test]
    fn test_stop_idle_light_releases_waiters() {
        let light = scripted("north", vec![ms(10_000)]);
        light.stop().unwrap();
        assert!(matches!(light.wait_for_green(), Err(LightError::Stopped(_))));
    }

    #[test]
    fn test_unbounded_timeout_waits_without_deadline() {
        let light = scripted("north", vec![ms(10_000)]);
        light.stop().unwrap();
        assert!(matches!(
            light.wait_for_green_timeout(Duration::MAX),
            Err(LightError::Stopped(_))
        ));
    }

    #[test]
    fn test_unbounded_timeout_returns_on_green() {
        let light = scripted("north", vec![ms(10), ms(10_000)]);
        light.start().unwrap();
        light.wait_for_green_timeout(Duration::MAX).unwrap();
        assert_eq!(light.current_phase(), Phase::Green);
        light.stop().unwrap();
    }

    #[test]
    fn test_wait_for_green_returns_after_toggle() {
        let light = scripted("north", vec![ms(30), ms(10_000)]);
        let started = Instant::now();
        light.start().unwrap();
        light.wait_for_green().unwrap();
        assert!(started.elapsed() >= ms(30), "green arrived before the cycle");
        assert_eq!(light.current_phase(), Phase::Green);
        assert_eq!(light.transitions(), 1);
        light.stop().unwrap();
    }

    #[test]
    fn test_wait_for_green_discards_red() {
        // Toggles at ~10, 20, 30 ms: green, red, green; then holds.
        let light = scripted("north", vec![ms(10), ms(10), ms(10), ms(10_000)]);
        light.start().unwrap();
        thread::sleep(ms(300));
        assert_eq!(light.transitions(), 3);
        assert_eq!(light.pending(), 3);

        light.wait_for_green().unwrap();
        assert_eq!(light.pending(), 2);
        // Second wait must skip the queued red.
        light.wait_for_green().unwrap();
        assert_eq!(light.pending(), 0);
        assert_eq!(light.current_phase(), Phase::Green);
        light.stop().unwrap();
    }

    #[test]
    fn test_wait_for_red() {
        let light = scripted("north", vec![ms(10), ms(10), ms(10_000)]);
        light.start().unwrap();
        light.wait_for(Phase::Red).unwrap();
        assert_eq!(light.transitions(), 2);
        light.stop().unwrap();
    }

    #[test]
    fn test_wait_for_green_timeout_elapses() {
        let light = scripted("north", vec![ms(10_000)]);
        light.start().unwrap();
        let err = light.wait_for_green_timeout(ms(50)).unwrap_err();
        assert!(matches!(err, LightError::Timeout { phase: Phase::Green, .. }));
        light.stop().unwrap();
    }

    #[test]
    fn test_wait_for_green_timeout_succeeds() {
        let light = scripted("north", vec![ms(20), ms(10_000)]);
        light.start().unwrap();
        light.wait_for_green_timeout(Duration::from_secs(5)).unwrap();
        light.stop().unwrap();
    }

    #[test]
    fn test_stop_releases_blocked_waiter() {
        let light = Arc::new(scripted("north", vec![ms(10_000)]));
        light.start().unwrap();

        let waiter = {
            let light = Arc::clone(&light);
            thread::spawn(move || light.wait_for_green())
        };
        thread::sleep(ms(50));
        light.stop().unwrap();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(LightError::Stopped(_))));
    }

    #[test]
    fn test_concurrent_waiters_need_separate_greens() {
        let light = Arc::new(scripted("north", vec![ms(20)]));
        light.start().unwrap();

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let light = Arc::clone(&light);
                thread::spawn(move || light.wait_for_green_timeout(Duration::from_secs(5)))
            })
            .collect();
        for w in waiters {
            w.join().unwrap().unwrap();
        }

        // One green can release only one waiter: green, red, green at minimum.
        assert!(light.transitions() >= 3, "got {}", light.transitions());
        light.stop().unwrap();
    }

    #[test]
    fn test_drop_stops_running_light() {
        let light = scripted("north", vec![ms(5)]);
        light.start().unwrap();
        thread::sleep(ms(30));
        drop(light);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_emits_phase_changed_events() {
        let buf = SharedBuf::default();
        let events = Arc::new(EventEmitter::new(Box::new(buf.clone())));
        let light = scripted("north", vec![ms(10), ms(10), ms(10_000)]).with_events(events);
        light.start().unwrap();
        light.wait_for(Phase::Red).unwrap();
        light.stop().unwrap();

        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "PhaseChanged");
        assert_eq!(lines[0]["to"], "green");
        assert_eq!(lines[0]["cycle_ms"], 10);
        assert_eq!(lines[1]["to"], "red");
        assert_eq!(lines[1]["transition"], 2);
    }

    #[test]
    fn test_debug_output() {
        let light = scripted("north", vec![ms(10_000)]);
        let debug = format!("{light:?}");
        assert!(debug.contains("TrafficLight"));
        assert!(debug.contains("\"north\""));
        assert!(debug.contains("Idle"));
    }
}
