//! Cycle duration sources
//!
//! A light asks its [`CycleSource`] for the length of every phase. The
//! default [`UniformCycle`] draws uniformly from a closed millisecond
//! range; [`ScriptedCycle`] replays fixed durations for deterministic runs.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the duration of each successive phase.
///
/// Owned by exactly one light and called only from its worker thread.
pub trait CycleSource: Send + 'static {
    /// Returns the duration of the next phase.
    fn next_cycle(&mut self) -> Duration;
}

/// Uniformly distributed cycle durations in `[min, max]`, millisecond resolution.
///
/// Each instance owns its own random engine.
#[derive(Debug, Clone)]
pub struct UniformCycle {
    min_ms: u64,
    max_ms: u64,
    rng: StdRng,
}

fn floor_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn ceil_millis(d: Duration) -> u64 {
    let floor = floor_millis(d);
    if d.subsec_nanos() % 1_000_000 == 0 {
        floor
    } else {
        floor.saturating_add(1)
    }
}

impl UniformCycle {
    /// Creates a source seeded from OS entropy.
    ///
    /// Bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self::with_rng(min, max, StdRng::from_os_rng())
    }

    /// Creates a reproducible source from a fixed seed.
    #[must_use]
    pub fn seeded(min: Duration, max: Duration, seed: u64) -> Self {
        Self::with_rng(min, max, StdRng::seed_from_u64(seed))
    }

    /// `min` rounds up and `max` rounds down so every draw stays inside
    /// `[min, max]`. A range holding no whole millisecond collapses onto
    /// the first millisecond above `min`.
    fn with_rng(min: Duration, max: Duration, rng: StdRng) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let min_ms = ceil_millis(lo);
        Self {
            min_ms,
            max_ms: floor_millis(hi).max(min_ms),
            rng,
        }
    }
}

impl CycleSource for UniformCycle {
    fn next_cycle(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(self.min_ms..=self.max_ms))
    }
}

/// Replays a fixed list of durations, wrapping around at the end.
///
/// An empty script yields [`Duration::ZERO`].
#[derive(Debug, Clone)]
pub struct ScriptedCycle {
    script: Vec<Duration>,
    next: usize,
}

impl ScriptedCycle {
    /// Creates a source replaying `script` in order.
    #[must_use]
    pub fn new(script: impl Into<Vec<Duration>>) -> Self {
        Self {
            script: script.into(),
            next: 0,
        }
    }

    /// Creates a source that always returns `cycle`.
    #[must_use]
    pub fn constant(cycle: Duration) -> Self {
        Self::new(vec![cycle])
    }
}

impl CycleSource for ScriptedCycle {
    fn next_cycle(&mut self) -> Duration {
        if self.script.is_empty() {
            return Duration::ZERO;
        }
        let cycle = self.script[self.next];
        self.next = (self.next + 1) % self.script.len();
        cycle
    }
}
