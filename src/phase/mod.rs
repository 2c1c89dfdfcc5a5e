//! Phase actor
//!
//! Implements the red/green traffic light state machine and the
//! machinery that observes it from other threads.
//!
//! # Architecture
//!
//! - [`PhaseState`]: atomic current phase and transition counter
//! - [`CycleSource`]: where each phase length comes from
//! - [`TrafficLight`]: owns the state, the worker thread, and the phase channel

pub mod cycle;
pub mod light;
pub mod state;

pub use cycle::{CycleSource, ScriptedCycle, UniformCycle};
pub use light::{LightStatus, TrafficLight};
pub use state::{Phase, PhaseState, PhaseTransition};
