//! Shared integration-test harness for running the `trafficlight` binary.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

/// Upper bound for any single binary invocation in tests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Helpers for invoking the compiled binary.
pub struct TrafficLightProcess;

impl TrafficLightProcess {
    /// Runs the binary to completion with `args` and returns its output.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_trafficlight"))
            .args(args)
            .env_remove("TRAFFICLIGHT_CONFIG")
            .env_remove("TRAFFICLIGHT_EVENTS_FILE")
            .env_remove("TRAFFICLIGHT_METRICS_PORT")
            .output()
            .expect("failed to run trafficlight")
    }

    /// Spawns the binary in the background with piped output.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_background(args: &[&str]) -> Child {
        Command::new(env!("CARGO_BIN_EXE_trafficlight"))
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn trafficlight")
    }

    /// Sends `signal` (e.g. `"INT"`) to a running child via `kill`.
    #[allow(clippy::missing_panics_doc)]
    pub fn signal(child: &Child, signal: &str) {
        let status = Command::new("kill")
            .arg(format!("-{signal}"))
            .arg(child.id().to_string())
            .status()
            .expect("failed to run kill");
        assert!(status.success(), "kill -{signal} failed");
    }

    /// Polls `child` until it exits or `timeout` passes; kills it on timeout.
    #[allow(clippy::missing_panics_doc)]
    pub fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
        let deadline = Instant::now() + timeout;
        while child.try_wait().expect("try_wait failed").is_none() {
            if Instant::now() >= deadline {
                child.kill().expect("failed to kill child");
                panic!("trafficlight did not exit within {timeout:?}");
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        child.wait_with_output().expect("failed to collect output")
    }

    /// Returns the path to a test fixture.
    #[must_use]
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }
}
