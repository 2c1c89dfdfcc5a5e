//! Configuration validation
//!
//! Checks the semantic rules serde cannot express: ordered, non-zero,
//! whole-millisecond cycle bounds, a poll interval no longer than a phase
//! and unique names.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::schema::{LightConfig, SimulationConfig};
use crate::error::ValidationIssue;

/// Upper limit on observer threads per light.
pub const MAX_OBSERVERS_PER_LIGHT: usize = 64;

/// Cycles are drawn at millisecond resolution.
const NANOS_PER_MILLI: u32 = 1_000_000;

/// Validates one light, prefixing issue paths with `prefix`.
#[must_use]
pub fn validate_light(config: &LightConfig, prefix: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut issue = |field: &str, message: String| {
        issues.push(ValidationIssue {
            path: join_path(prefix, field),
            message,
        });
    };

    if config.name.trim().is_empty() {
        issue("name", "light name must not be empty".to_owned());
    }
    if config.min_cycle.is_zero() {
        issue("min_cycle", "must be greater than zero".to_owned());
    }
    for (field, bound) in [("min_cycle", config.min_cycle), ("max_cycle", config.max_cycle)] {
        if bound.subsec_nanos() % NANOS_PER_MILLI != 0 {
            issue(
                field,
                format!(
                    "must be a whole number of milliseconds, got {}",
                    humantime::format_duration(bound)
                ),
            );
        }
    }
    if config.min_cycle > config.max_cycle {
        issue(
            "max_cycle",
            format!(
                "must not be shorter than min_cycle ({} < {})",
                humantime::format_duration(config.max_cycle),
                humantime::format_duration(config.min_cycle)
            ),
        );
    }
    if config.poll_interval.is_zero() {
        issue("poll_interval", "must be greater than zero".to_owned());
    } else if config.poll_interval > config.min_cycle && !config.min_cycle.is_zero() {
        issue(
            "poll_interval",
            format!(
                "must not exceed min_cycle ({})",
                humantime::format_duration(config.min_cycle)
            ),
        );
    }

    issues
}

/// Validates a whole simulation file.
#[must_use]
pub fn validate_simulation(config: &SimulationConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if config.lights.is_empty() {
        issues.push(ValidationIssue {
            path: "lights".to_owned(),
            message: "at least one light is required".to_owned(),
        });
    }

    let observers = config.simulation.observers_per_light;
    if observers > MAX_OBSERVERS_PER_LIGHT {
        issues.push(ValidationIssue {
            path: "simulation.observers_per_light".to_owned(),
            message: format!("must be at most {MAX_OBSERVERS_PER_LIGHT}, got {observers}"),
        });
    }

    if config.simulation.duration == Some(Duration::ZERO) {
        issues.push(ValidationIssue {
            path: "simulation.duration".to_owned(),
            message: "must be greater than zero".to_owned(),
        });
    }

    let mut names = HashSet::new();
    for (i, light) in config.lights.iter().enumerate() {
        let prefix = format!("lights[{i}]");
        issues.extend(validate_light(light, &prefix));
        if !light.name.trim().is_empty() && !names.insert(light.name.as_str()) {
            issues.push(ValidationIssue {
                path: join_path(&prefix, "name"),
                message: format!("duplicate light name '{}'", light.name),
            });
        }
    }

    issues
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_owned()
    } else {
        format!("{prefix}.{field}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SimulationSettings;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_default_light_is_valid() {
        assert!(validate_light(&LightConfig::default(), "").is_empty());
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        let config = LightConfig::default().with_cycle_bounds(ms(50), ms(50));
        assert!(validate_light(&config, "").is_empty());
    }

    #[test]
    fn test_inverted_bounds() {
        let config = LightConfig::default().with_cycle_bounds(ms(6000), ms(4000));
        let issues = validate_light(&config, "");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "max_cycle");
        assert!(issues[0].message.contains("4s < 6s"));
    }

    #[test]
    fn test_zero_min_cycle() {
        let config = LightConfig::default().with_cycle_bounds(ms(0), ms(10));
        let issues = validate_light(&config, "lights[0]");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "lights[0].min_cycle");
    }

    #[test]
    fn test_sub_millisecond_bounds_rejected() {
        let config = LightConfig::default()
            .with_cycle_bounds(Duration::from_micros(1500), Duration::from_micros(1900))
            .with_poll_interval(Duration::from_micros(100));
        let paths: Vec<_> = validate_light(&config, "lights[0]")
            .into_iter()
            .map(|i| i.path)
            .collect();
        assert_eq!(paths, vec!["lights[0].min_cycle", "lights[0].max_cycle"]);
    }

    #[test]
    fn test_below_one_millisecond_rejected() {
        let config = LightConfig::default()
            .with_cycle_bounds(Duration::from_micros(500), ms(1))
            .with_poll_interval(Duration::from_micros(100));
        let issues = validate_light(&config, "");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "min_cycle");
        assert!(issues[0].message.contains("whole number of milliseconds"));
    }

    #[test]
    fn test_sub_millisecond_poll_interval_allowed() {
        let config = LightConfig::default()
            .with_cycle_bounds(ms(2), ms(3))
            .with_poll_interval(Duration::from_micros(250));
        assert!(validate_light(&config, "").is_empty());
    }

    #[test]
    fn test_zero_poll_interval() {
        let config = LightConfig::default().with_poll_interval(Duration::ZERO);
        let issues = validate_light(&config, "");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "poll_interval");
    }

    #[test]
    fn test_poll_interval_longer_than_phase() {
        let config = LightConfig::default()
            .with_cycle_bounds(ms(10), ms(20))
            .with_poll_interval(ms(15));
        let issues = validate_light(&config, "");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("must not exceed min_cycle"));
    }

    #[test]
    fn test_blank_name() {
        let issues = validate_light(&LightConfig::named("  "), "");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "name");
    }

    #[test]
    fn test_simulation_requires_lights() {
        let sim = SimulationConfig {
            simulation: SimulationSettings::default(),
            lights: vec![],
        };
        let issues = validate_simulation(&sim);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "lights");
    }

    #[test]
    fn test_simulation_duplicate_names() {
        let sim = SimulationConfig {
            simulation: SimulationSettings::default(),
            lights: vec![
                LightConfig::named("north"),
                LightConfig::named("east"),
                LightConfig::named("north"),
            ],
        };
        let issues = validate_simulation(&sim);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "lights[2].name");
    }

    #[test]
    fn test_simulation_limits() {
        let sim = SimulationConfig {
            simulation: SimulationSettings {
                observers_per_light: MAX_OBSERVERS_PER_LIGHT + 1,
                duration: Some(Duration::ZERO),
            },
            lights: vec![LightConfig::default()],
        };
        let paths: Vec<_> = validate_simulation(&sim)
            .into_iter()
            .map(|i| i.path)
            .collect();
        assert_eq!(
            paths,
            vec!["simulation.observers_per_light", "simulation.duration"]
        );
    }

    #[test]
    fn test_simulation_collects_nested_issues() {
        let sim = SimulationConfig {
            simulation: SimulationSettings::default(),
            lights: vec![
                LightConfig::named("a"),
                LightConfig::named("b").with_cycle_bounds(ms(0), ms(0)),
            ],
        };
        let issues = validate_simulation(&sim);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "lights[1].min_cycle");
    }
}
