//! Director state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for the speaking lifecycle:
//! - Idle -> ResolvingMessage (message available and gate open)
//! - ResolvingMessage -> Speaking (audio session started)
//! - ResolvingMessage -> Draining (no session could be started)
//! - Speaking -> Draining (session reached any terminal outcome)
//! - Draining -> Idle (ready for the next queued message)

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::DirectorError;

/// Operational state of the speech director.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectorState {
    /// No turn in progress. Ready to pick up the next queued message.
    Idle,
    /// Picking the animation intent and audio source for a message.
    ResolvingMessage,
    /// An audio session is active and the talking clip is published.
    Speaking,
    /// Clearing the speaking signal and releasing the finished turn.
    Draining,
}

impl fmt::Display for DirectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectorState::Idle => write!(f, "Idle"),
            DirectorState::ResolvingMessage => write!(f, "ResolvingMessage"),
            DirectorState::Speaking => write!(f, "Speaking"),
            DirectorState::Draining => write!(f, "Draining"),
        }
    }
}

impl DirectorState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &DirectorState) -> bool {
        matches!(
            (self, target),
            (DirectorState::Idle, DirectorState::ResolvingMessage)
                | (DirectorState::ResolvingMessage, DirectorState::Speaking)
                // Failure edge: resolution found no playable source at all.
                | (DirectorState::ResolvingMessage, DirectorState::Draining)
                | (DirectorState::Speaking, DirectorState::Draining)
                | (DirectorState::Draining, DirectorState::Idle)
        )
    }
}

/// Thread-safe state machine for director state transitions.
///
/// Wraps `DirectorState` in an `Arc<Mutex<>>` to allow safe concurrent
/// access. All transitions are validated before being applied, returning an
/// error if the requested transition is not permitted.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<DirectorState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DirectorState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> DirectorState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: DirectorState) -> Result<(), DirectorError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Director state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(DirectorError::InvalidTransition(*state, target))
        }
    }

    /// Force the state machine back to Idle (used for error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        tracing::warn!("Director state machine reset to Idle from {}", *state);
        *state = DirectorState::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(DirectorState::Idle.to_string(), "Idle");
        assert_eq!(DirectorState::ResolvingMessage.to_string(), "ResolvingMessage");
        assert_eq!(DirectorState::Speaking.to_string(), "Speaking");
        assert_eq!(DirectorState::Draining.to_string(), "Draining");
    }

    #[test]
    fn test_valid_transitions() {
        // Forward path
        assert!(DirectorState::Idle.can_transition_to(&DirectorState::ResolvingMessage));
        assert!(DirectorState::ResolvingMessage.can_transition_to(&DirectorState::Speaking));
        assert!(DirectorState::Speaking.can_transition_to(&DirectorState::Draining));
        assert!(DirectorState::Draining.can_transition_to(&DirectorState::Idle));

        // Failure edge
        assert!(DirectorState::ResolvingMessage.can_transition_to(&DirectorState::Draining));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot skip states
        assert!(!DirectorState::Idle.can_transition_to(&DirectorState::Speaking));
        assert!(!DirectorState::Idle.can_transition_to(&DirectorState::Draining));
        assert!(!DirectorState::ResolvingMessage.can_transition_to(&DirectorState::Idle));

        // Cannot go backwards
        assert!(!DirectorState::Speaking.can_transition_to(&DirectorState::ResolvingMessage));
        assert!(!DirectorState::Speaking.can_transition_to(&DirectorState::Idle));
        assert!(!DirectorState::Draining.can_transition_to(&DirectorState::Speaking));
        assert!(!DirectorState::Draining.can_transition_to(&DirectorState::ResolvingMessage));

        // Cannot transition to self
        assert!(!DirectorState::Idle.can_transition_to(&DirectorState::Idle));
        assert!(!DirectorState::ResolvingMessage
            .can_transition_to(&DirectorState::ResolvingMessage));
        assert!(!DirectorState::Speaking.can_transition_to(&DirectorState::Speaking));
        assert!(!DirectorState::Draining.can_transition_to(&DirectorState::Draining));
    }

    #[test]
    fn test_state_machine_happy_path() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), DirectorState::Idle);

        sm.transition(DirectorState::ResolvingMessage).unwrap();
        assert_eq!(sm.current(), DirectorState::ResolvingMessage);

        sm.transition(DirectorState::Speaking).unwrap();
        assert_eq!(sm.current(), DirectorState::Speaking);

        sm.transition(DirectorState::Draining).unwrap();
        assert_eq!(sm.current(), DirectorState::Draining);

        sm.transition(DirectorState::Idle).unwrap();
        assert_eq!(sm.current(), DirectorState::Idle);
    }

    #[test]
    fn test_state_machine_failure_edge() {
        let sm = StateMachine::new();
        sm.transition(DirectorState::ResolvingMessage).unwrap();
        sm.transition(DirectorState::Draining).unwrap();
        sm.transition(DirectorState::Idle).unwrap();
        assert_eq!(sm.current(), DirectorState::Idle);
    }

    #[test]
    fn test_state_machine_invalid_transition() {
        let sm = StateMachine::new();
        let result = sm.transition(DirectorState::Speaking);
        assert!(result.is_err());
        assert_eq!(sm.current(), DirectorState::Idle);
    }

    #[test]
    fn test_state_machine_reset() {
        let sm = StateMachine::new();
        sm.transition(DirectorState::ResolvingMessage).unwrap();
        sm.transition(DirectorState::Speaking).unwrap();
        sm.reset();
        assert_eq!(sm.current(), DirectorState::Idle);
    }

    #[test]
    fn test_state_machine_clone_is_shared() {
        let sm1 = StateMachine::new();
        let sm2 = sm1.clone();

        sm1.transition(DirectorState::ResolvingMessage).unwrap();
        assert_eq!(sm2.current(), DirectorState::ResolvingMessage);
    }

    #[test]
    fn test_transition_error_message() {
        let sm = StateMachine::new();
        let result = sm.transition(DirectorState::Draining);
        match result {
            Err(DirectorError::InvalidTransition(from, to)) => {
                assert_eq!(from, DirectorState::Idle);
                assert_eq!(to, DirectorState::Draining);
            }
            _ => panic!("Expected InvalidTransition error"),
        }
    }

    #[test]
    fn test_all_valid_transitions_count() {
        let all_states = [
            DirectorState::Idle,
            DirectorState::ResolvingMessage,
            DirectorState::Speaking,
            DirectorState::Draining,
        ];

        let mut valid_count = 0;
        for from in &all_states {
            for to in &all_states {
                if from.can_transition_to(to) {
                    valid_count += 1;
                }
            }
        }
        assert_eq!(valid_count, 5, "Expected exactly 5 valid transitions");
    }
}
