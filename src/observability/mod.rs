//! Observability module
//!
//! Logging, metrics, and structured event infrastructure for watching
//! lights and their observers.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter, RunSummary, StopReason};
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
