//! Error types for the session layer.

use crate::ConnectionState;

/// Errors that can occur while establishing or tracking a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server rejected the login with a non-zero status.
    ///
    /// Fatal to this login attempt. The session fields are left as they
    /// were before the response arrived.
    #[error("authentication failed with status {status}")]
    AuthFailed { status: i32 },

    /// The server list came back empty, so there is nowhere to connect.
    #[error("no candidate servers available")]
    NoServers,

    /// The server list could not be obtained at all.
    #[error("server lookup failed: {0}")]
    ServerLookup(String),

    /// A lifecycle transition that the state machine does not allow.
    #[error("invalid connection state transition {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}
