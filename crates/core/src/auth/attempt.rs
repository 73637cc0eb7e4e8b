//! Login attempt state machine.
//!
//! ```text
//! Pending ──begin_exchange──▶ Exchanging ──succeed──▶ Succeeded
//!    │                            │
//!    └──────────fail──────────────┴──────────────────▶ Failed
//! ```
//!
//! `fail` is the single exit for every remote error and always yields the
//! login page redirect.

use super::{failure_redirect, RedirectTarget, RemoteAuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Exchanging,
    Succeeded,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Returned when a transition is not allowed from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid login attempt transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: AttemptState,
    pub to: AttemptState,
}

#[derive(Debug, Clone)]
pub struct LoginAttempt {
    state: AttemptState,
    failure: Option<RemoteAuthError>,
}

impl Default for LoginAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginAttempt {
    pub fn new() -> Self {
        Self {
            state: AttemptState::Pending,
            failure: None,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn failure(&self) -> Option<&RemoteAuthError> {
        self.failure.as_ref()
    }

    /// Pending → Exchanging.
    pub fn begin_exchange(&mut self) -> Result<(), InvalidTransition> {
        self.transition(AttemptState::Pending, AttemptState::Exchanging)
    }

    /// Exchanging → Succeeded.
    pub fn succeed(&mut self) -> Result<(), InvalidTransition> {
        self.transition(AttemptState::Exchanging, AttemptState::Succeeded)
    }

    /// Any non-terminal state → Failed, producing the login redirect.
    ///
    /// Failing an already failed attempt keeps the first cause and returns
    /// the same redirect; failing a succeeded attempt is refused.
    pub fn fail(&mut self, cause: RemoteAuthError) -> Result<RedirectTarget, InvalidTransition> {
        match self.state {
            AttemptState::Succeeded => Err(InvalidTransition {
                from: self.state,
                to: AttemptState::Failed,
            }),
            AttemptState::Failed => Ok(failure_redirect(self.failure.as_ref())),
            AttemptState::Pending | AttemptState::Exchanging => {
                self.state = AttemptState::Failed;
                let target = failure_redirect(Some(&cause));
                self.failure = Some(cause);
                Ok(target)
            }
        }
    }

    fn transition(&mut self, from: AttemptState, to: AttemptState) -> Result<(), InvalidTransition> {
        if self.state != from {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
