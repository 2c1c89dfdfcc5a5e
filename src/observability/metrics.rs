//! Metrics collection.
//!
//! Prometheus-compatible metrics with label sanitization and typed
//! convenience functions. Every `record_*` call is a no-op until
//! [`init_metrics`] installs a recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TrafficLightError;
use crate::phase::Phase;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Maximum length for light name labels.
const MAX_LIGHT_LABEL_LEN: usize = 64;

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `TrafficLightError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), TrafficLightError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| TrafficLightError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "trafficlight_phase_transitions_total",
        "Total number of phase transitions"
    );
    describe_gauge!(
        "trafficlight_current_phase",
        "Currently shown phase per light (1 = shown)"
    );
    describe_histogram!(
        "trafficlight_cycle_duration_ms",
        "Drawn phase durations in milliseconds"
    );
    describe_histogram!(
        "trafficlight_green_wait_ms",
        "Time observers spent blocked waiting for green"
    );
    describe_gauge!("trafficlight_lights_running", "Number of running lights");
}

/// Sanitizes a light name for use as a metrics label.
///
/// Truncates to [`MAX_LIGHT_LABEL_LEN`] characters and replaces any
/// characters invalid in Prometheus labels with underscores.
fn sanitize_light_label(name: &str) -> String {
    name.chars()
        .take(MAX_LIGHT_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Records a phase transition and moves the current-phase gauge.
pub fn record_phase_transition(light: &str, from: Phase, to: Phase) {
    let label = sanitize_light_label(light);
    counter!(
        "trafficlight_phase_transitions_total",
        "light" => label.clone(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    set_current_phase(label, to);
}

/// Marks `phase` as the phase a light currently shows.
pub fn record_phase_shown(light: &str, phase: Phase) {
    set_current_phase(sanitize_light_label(light), phase);
}

fn set_current_phase(label: String, shown: Phase) {
    let hidden = shown.toggled();
    gauge!("trafficlight_current_phase", "light" => label.clone(), "phase" => hidden.as_str())
        .set(0.0);
    gauge!("trafficlight_current_phase", "light" => label, "phase" => shown.as_str()).set(1.0);
}

/// Records a drawn cycle duration.
pub fn record_cycle_duration(light: &str, cycle: Duration) {
    histogram!("trafficlight_cycle_duration_ms", "light" => sanitize_light_label(light))
        .record(cycle.as_secs_f64() * 1000.0);
}

/// Records how long an observer was blocked in `wait_for_green`.
pub fn record_green_wait(light: &str, waited: Duration) {
    histogram!("trafficlight_green_wait_ms", "light" => sanitize_light_label(light))
        .record(waited.as_secs_f64() * 1000.0);
}

/// Adjusts the running-lights gauge by one.
pub fn record_light_running(running: bool) {
    let g = gauge!("trafficlight_lights_running");
    if running {
        g.increment(1.0);
    } else {
        g.decrement(1.0);
    }
}
