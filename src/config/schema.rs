//! Configuration schema
//!
//! Typed configuration for a single light and for a simulation file that
//! drives several lights. Durations are written in `humantime` syntax
//! (`4s`, `4500ms`, `1m 30s`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default lower bound of a phase.
pub const DEFAULT_MIN_CYCLE: Duration = Duration::from_millis(4000);

/// Default upper bound of a phase.
pub const DEFAULT_MAX_CYCLE: Duration = Duration::from_millis(6000);

/// Default sleep between two elapsed-time checks of the worker loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default light name.
pub const DEFAULT_LIGHT_NAME: &str = "light";

// ============================================================================
// Light Configuration
// ============================================================================

/// Configuration of one traffic light.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    /// Name used in logs, metrics, and events
    #[serde(default = "default_name")]
    pub name: String,

    /// Shortest phase duration
    #[serde(default = "default_min_cycle", with = "duration_str")]
    pub min_cycle: Duration,

    /// Longest phase duration
    #[serde(default = "default_max_cycle", with = "duration_str")]
    pub max_cycle: Duration,

    /// Sleep between two elapsed-time checks
    #[serde(default = "default_poll_interval", with = "duration_str")]
    pub poll_interval: Duration,

    /// Seed for the cycle duration RNG; OS entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_name() -> String {
    DEFAULT_LIGHT_NAME.to_owned()
}

const fn default_min_cycle() -> Duration {
    DEFAULT_MIN_CYCLE
}

const fn default_max_cycle() -> Duration {
    DEFAULT_MAX_CYCLE
}

const fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            min_cycle: DEFAULT_MIN_CYCLE,
            max_cycle: DEFAULT_MAX_CYCLE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            seed: None,
        }
    }
}

impl LightConfig {
    /// Creates a default configuration with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the phase duration bounds.
    #[must_use]
    pub const fn with_cycle_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_cycle = min;
        self.max_cycle = max;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets a fixed RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ============================================================================
// Simulation File
// ============================================================================

/// Run-wide settings of a simulation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Observer threads waiting for green on each light
    #[serde(default = "default_observers")]
    pub observers_per_light: usize,

    /// How long to run; until interrupted when absent
    #[serde(
        default,
        with = "opt_duration_str",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
}

const fn default_observers() -> usize {
    1
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            observers_per_light: default_observers(),
            duration: None,
        }
    }
}

/// Top-level simulation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Run-wide settings
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// Lights to drive
    pub lights: Vec<LightConfig>,
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw)
            .map_err(|e| de::Error::custom(format!("invalid duration '{raw}': {e}")))
    }
}

mod opt_duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    // Only called for `Some` because of `skip_serializing_if`.
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.collect_str(&humantime::format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                humantime::parse_duration(&raw)
                    .map_err(|e| de::Error::custom(format!("invalid duration '{raw}': {e}")))
            })
            .transpose()
    }
}
