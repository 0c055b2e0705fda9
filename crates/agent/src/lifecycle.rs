//! Agent lifecycle state machine.
//!
//! `Installing → Installed → Activating → Activated`, with skip-waiting
//! making a freshly installed agent immediately eligible for activation
//! instead of waiting for prior-generation clients to release control.
//! Activated is terminal; the instance persists there until superseded by
//! a newer installation.

use std::fmt;
use std::sync::Mutex;

/// Lifecycle phases of a cache agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Installed,
    Activating,
    Activated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        };
        f.write_str(name)
    }
}

/// Invalid lifecycle transition.
#[derive(Debug, thiserror::Error)]
#[error("invalid lifecycle transition: {from} -> {to}")]
pub struct LifecycleError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Tracks the current phase and the skip-waiting request for one agent
/// instance. Shared across concurrent handlers; transitions hold the lock
/// only long enough to check and swap.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
    skip_waiting: Mutex<bool>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// A fresh instance starts in Installing.
    pub fn new() -> Self {
        Self { state: Mutex::new(LifecycleState::Installing), skip_waiting: Mutex::new(false) }
    }

    /// Current phase.
    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap()
    }

    /// Whether the agent has requested immediate activation.
    pub fn skip_waiting_requested(&self) -> bool {
        *self.skip_waiting.lock().unwrap()
    }

    /// Request immediate activation instead of waiting for existing
    /// clients to close.
    pub fn request_skip_waiting(&self) {
        *self.skip_waiting.lock().unwrap() = true;
    }

    /// Attempt a transition, rejecting any move the state machine does
    /// not define.
    pub fn transition(&self, to: LifecycleState) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().unwrap();
        let valid = matches!(
            (*state, to),
            (LifecycleState::Installing, LifecycleState::Installed)
                | (LifecycleState::Installed, LifecycleState::Activating)
                | (LifecycleState::Activating, LifecycleState::Activated)
        );
        if !valid {
            return Err(LifecycleError { from: *state, to });
        }
        *state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Installing);

        lifecycle.transition(LifecycleState::Installed).unwrap();
        lifecycle.transition(LifecycleState::Activating).unwrap();
        lifecycle.transition(LifecycleState::Activated).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Activated);
    }

    #[test]
    fn test_cannot_skip_phases() {
        let lifecycle = Lifecycle::new();
        let err = lifecycle.transition(LifecycleState::Activated).unwrap_err();
        assert_eq!(err.from, LifecycleState::Installing);
        assert_eq!(err.to, LifecycleState::Activated);
    }

    #[test]
    fn test_activated_is_terminal() {
        let lifecycle = Lifecycle::new();
        lifecycle.transition(LifecycleState::Installed).unwrap();
        lifecycle.transition(LifecycleState::Activating).unwrap();
        lifecycle.transition(LifecycleState::Activated).unwrap();

        assert!(lifecycle.transition(LifecycleState::Installing).is_err());
        assert!(lifecycle.transition(LifecycleState::Installed).is_err());
    }

    #[test]
    fn test_skip_waiting_flag() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.skip_waiting_requested());
        lifecycle.request_skip_waiting();
        assert!(lifecycle.skip_waiting_requested());
    }
}
