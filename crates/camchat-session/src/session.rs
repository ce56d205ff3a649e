//! Session types: who this client is logged in as, and where its
//! connection stands.

use std::fmt;

use camchat_protocol::{Packet, Payload};
use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Login material supplied by the caller.
///
/// `credential` is whatever pre-hashed string the chat site expects. This
/// client never derives or inspects it, and `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub credential: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            credential: credential.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("credential", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The local client's identity as assigned by the server.
///
/// Before a successful login every id is 0. Only a login response changes
/// these fields; everything else reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned session id; goes in `from` of every outbound packet.
    pub session_id: i32,
    /// Numeric user id.
    pub uid: i32,
    /// Canonical username as reported by the server.
    pub username: String,
}

impl Session {
    /// Creates an unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the server has assigned a session id.
    pub fn is_authenticated(&self) -> bool {
        self.session_id != 0
    }

    /// Applies a login-response packet.
    ///
    /// Status lives in `arg1` (0 means success), the session id in `to`,
    /// the user id in `arg2`, and the canonical username in the payload.
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] for a non-zero status and
    /// leaves every field unchanged.
    pub fn apply_login_response(
        &mut self,
        packet: &Packet,
    ) -> Result<(), SessionError> {
        let status = packet.arg1;
        if status != 0 {
            tracing::warn!(status, "login rejected");
            return Err(SessionError::AuthFailed { status });
        }

        self.session_id = packet.to;
        self.uid = packet.arg2;
        if let Some(username) = username_from(&packet.payload) {
            self.username = username;
        }

        tracing::info!(
            session_id = self.session_id,
            uid = self.uid,
            username = %self.username,
            "logged in"
        );
        Ok(())
    }
}

fn username_from(payload: &Payload) -> Option<String> {
    match payload {
        Payload::None => None,
        Payload::Text(text) => Some(text.clone()),
        Payload::Json(value) => Some(value.to_string()),
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Where the client's single connection stands.
///
/// ```text
///   Disconnected ─→ ResolvingServer ─→ Connecting ─→ Connected
///        ↑                                               │
///        │                           Authenticated ←─ Authenticating
///        │                                 │
///        └──────── (transport failure, from any state) ──┘
///
///   any state ─(shutdown)─→ Closed
/// ```
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    ResolvingServer,
    Connecting,
    Connected,
    Authenticating,
    Authenticated,
    Closed,
}

impl ConnectionState {
    /// Returns `true` while a socket is open.
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Authenticating | Self::Authenticated
        )
    }

    /// Returns `true` if the state machine allows moving to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Disconnected, Disconnected) => false,
            (_, Disconnected) => true,
            (Disconnected, ResolvingServer)
            | (ResolvingServer, Connecting)
            | (Connecting, Connected)
            | (Connected, Authenticating)
            | (Authenticating, Authenticated) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::ResolvingServer => "resolving-server",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camchat_protocol::PacketType;

    fn login_response(status: i32, session_id: i32, uid: i32, name: &str) -> Packet {
        Packet {
            to: session_id,
            arg1: status,
            arg2: uid,
            payload: Payload::text(name),
            ..Packet::new(PacketType::Login)
        }
    }

    #[test]
    fn test_apply_login_response_success_captures_identity() {
        let mut session = Session::new();
        session
            .apply_login_response(&login_response(0, 4242, 99, "alice"))
            .expect("status 0 should succeed");

        assert_eq!(
            session,
            Session {
                session_id: 4242,
                uid: 99,
                username: "alice".into(),
            }
        );
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_apply_login_response_failure_leaves_fields_unchanged() {
        let mut session = Session::new();
        let result =
            session.apply_login_response(&login_response(7, 4242, 99, "alice"));

        assert!(matches!(result, Err(SessionError::AuthFailed { status: 7 })));
        assert_eq!(session, Session::new());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_apply_login_response_numeric_username_kept_verbatim() {
        let mut session = Session::new();
        session
            .apply_login_response(&login_response(0, 1, 2, "12345"))
            .unwrap();
        assert_eq!(session.username, "12345");
    }

    #[test]
    fn test_apply_login_response_without_payload_keeps_username() {
        let mut session = Session {
            username: "guest".into(),
            ..Session::new()
        };
        session
            .apply_login_response(&login_response(0, 1, 2, ""))
            .unwrap();
        assert_eq!(session.username, "guest");
        assert_eq!(session.session_id, 1);
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("alice", "hunter2-hash");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_happy_path_transitions_allowed() {
        use ConnectionState::*;
        let path = [
            Disconnected,
            ResolvingServer,
            Connecting,
            Connected,
            Authenticating,
            Authenticated,
            Disconnected,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_skipping_states_rejected() {
        use ConnectionState::*;
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!ResolvingServer.can_transition_to(Authenticated));
        assert!(!Connected.can_transition_to(Authenticated));
        assert!(!Authenticated.can_transition_to(Connecting));
    }

    #[test]
    fn test_closed_is_terminal() {
        use ConnectionState::*;
        for next in [Disconnected, ResolvingServer, Connected, Closed] {
            assert!(!Closed.can_transition_to(next));
        }
        for from in [Disconnected, Connecting, Authenticated] {
            assert!(from.can_transition_to(Closed));
        }
    }

    #[test]
    fn test_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(ConnectionState::Authenticated.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Closed.is_connected());
    }
}
