//! Phase state representation
//!
//! Lock-free atomic state for the current phase and transition count,
//! readable from any thread while the light's worker mutates it.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use serde::Serialize;

/// The signal shown by a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    /// Traffic must stop. Every light starts here.
    #[default]
    Red = 0,
    /// Traffic may proceed.
    Green = 1,
}

impl Phase {
    /// Returns the other phase.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Red,
        }
    }

    /// Lowercase name, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        if raw == Self::Green as u8 {
            Self::Green
        } else {
            Self::Red
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a committed phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Phase before the toggle
    pub from: Phase,
    /// Phase after the toggle
    pub to: Phase,
    /// 1-based count of transitions committed by this light
    pub sequence: u64,
}

/// Atomic phase state shared between a light's worker and its readers.
///
/// Only the worker calls [`toggle`](Self::toggle); any thread may read.
pub struct PhaseState {
    /// Current phase, stored as its `u8` discriminant
    current: AtomicU8,
    /// Number of toggles committed so far
    transitions: AtomicU64,
}

impl PhaseState {
    /// Creates a new state in [`Phase::Red`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: AtomicU8::new(Phase::Red as u8),
            transitions: AtomicU64::new(0),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn current(&self) -> Phase {
        Phase::from_u8(self.current.load(Ordering::SeqCst))
    }

    /// Returns how many toggles have been committed.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::SeqCst)
    }

    /// Flips the phase and returns the committed transition.
    ///
    /// Must only be called by the single writer.
    pub fn toggle(&self) -> PhaseTransition {
        let from = self.current();
        let to = from.toggled();
        self.current.store(to as u8, Ordering::SeqCst);
        let sequence = self.transitions.fetch_add(1, Ordering::SeqCst) + 1;
        PhaseTransition { from, to, sequence }
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseState")
            .field("current", &self.current())
            .field("transitions", &self.transitions())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_state_is_red() {
        let state = PhaseState::new();
        assert_eq!(state.current(), Phase::Red);
        assert_eq!(state.transitions(), 0);
    }

    #[test]
    fn test_toggle_alternates() {
        let state = PhaseState::new();
        let t1 = state.toggle();
        assert_eq!(
            t1,
            PhaseTransition {
                from: Phase::Red,
                to: Phase::Green,
                sequence: 1
            }
        );
        assert_eq!(state.current(), Phase::Green);

        let t2 = state.toggle();
        assert_eq!(t2.from, Phase::Green);
        assert_eq!(t2.to, Phase::Red);
        assert_eq!(t2.sequence, 2);
        assert_eq!(state.transitions(), 2);
    }

    #[test]
    fn test_readers_only_see_valid_phases() {
        let state = Arc::new(PhaseState::new());
        let writer = {
            let s = Arc::clone(&state);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    s.toggle();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        assert!(matches!(s.current(), Phase::Red | Phase::Green));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        // Even number of toggles lands back on red.
        assert_eq!(state.current(), Phase::Red);
        assert_eq!(state.transitions(), 10_000);
    }

    #[test]
    fn test_phase_display_and_serde() {
        assert_eq!(Phase::Red.to_string(), "red");
        assert_eq!(Phase::Green.to_string(), "green");
        assert_eq!(serde_json::to_string(&Phase::Green).unwrap(), "\"green\"");
        assert_eq!(Phase::default(), Phase::Red);
    }

    #[test]
    fn test_toggled_is_involution() {
        for phase in [Phase::Red, Phase::Green] {
            assert_ne!(phase.toggled(), phase);
            assert_eq!(phase.toggled().toggled(), phase);
        }
    }

    #[test]
    fn test_debug_output() {
        let state = PhaseState::new();
        let debug = format!("{state:?}");
        assert!(debug.contains("PhaseState"));
        assert!(debug.contains("current: Red"));
    }
}
