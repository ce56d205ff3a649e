//! The connection lifecycle: a validated state machine.
//!
//! The connection manager drives every state change through
//! [`Lifecycle::transition`], so an out-of-order step (say, marking a
//! session authenticated before the socket is even open) shows up as an
//! error instead of silently corrupting state.

use std::time::{Duration, Instant};

use crate::{ConnectionState, SessionError};

/// Tracks the current [`ConnectionState`] and how the client got there.
#[derive(Debug)]
pub struct Lifecycle {
    state: ConnectionState,
    since: Instant,
    /// Number of times a connect cycle has started.
    attempts: u64,
}

impl Lifecycle {
    /// Starts in [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            since: Instant::now(),
            attempts: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// How long the client has been in the current state.
    pub fn time_in_state(&self) -> Duration {
        self.since.elapsed()
    }

    /// How many connect cycles have started, including the first.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Moves to `next`. Returns the state being left.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTransition`] if the move is not in
    /// the state graph; the state is left unchanged.
    pub fn transition(
        &mut self,
        next: ConnectionState,
    ) -> Result<ConnectionState, SessionError> {
        let from = self.state;
        if !from.can_transition_to(next) {
            return Err(SessionError::InvalidTransition { from, to: next });
        }
        if next == ConnectionState::ResolvingServer {
            self.attempts += 1;
        }
        self.state = next;
        self.since = Instant::now();
        tracing::debug!(%from, to = %next, attempt = self.attempts, "connection state");
        Ok(from)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
