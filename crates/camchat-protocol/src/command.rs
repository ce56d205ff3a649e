//! Outbound commands and their packet encoding.
//!
//! Callers describe what they want to do with a [`Command`]; the encoder
//! turns it into a [`Packet`] with the right type tag, addressing, and
//! escaping, then into bytes with the same codec used for decoding.

use crate::{
    CHANNEL_JOIN, CHANNEL_PART, LOGIN_VERSION, Packet, PacketType, Payload,
    ProtocolError, ROOM_ID_OFFSET, encode, escape::escape_text,
};

/// Something the client can send to the server.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in. `credential` is the already-hashed secret; this crate
    /// never computes it.
    Login {
        username: String,
        credential: String,
    },

    /// Join the room of `target` (a user id or a room id).
    JoinRoom { target: i32 },

    /// Leave the room of `target` (a user id or a room id).
    LeaveRoom { target: i32 },

    /// Send chat text to the room of `target`.
    Chat { target: i32, text: String },

    /// Send a private message to user `target`.
    PrivateMessage { target: i32, text: String },

    /// No-op that keeps the connection from idling out.
    Keepalive,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("credential", &"<redacted>")
                .finish(),
            Self::JoinRoom { target } => {
                f.debug_struct("JoinRoom").field("target", target).finish()
            }
            Self::LeaveRoom { target } => {
                f.debug_struct("LeaveRoom").field("target", target).finish()
            }
            Self::Chat { target, text } => f
                .debug_struct("Chat")
                .field("target", target)
                .field("text", text)
                .finish(),
            Self::PrivateMessage { target, text } => f
                .debug_struct("PrivateMessage")
                .field("target", target)
                .field("text", text)
                .finish(),
            Self::Keepalive => f.write_str("Keepalive"),
        }
    }
}

impl Command {
    /// Builds the packet for this command.
    ///
    /// `session_id` goes in the `from` field; it is 0 before login.
    pub fn to_packet(&self, session_id: i32) -> Packet {
        let base = Packet {
            from: session_id,
            ..Packet::new(self.packet_type())
        };

        match self {
            Self::Login {
                username,
                credential,
            } => Packet {
                arg1: LOGIN_VERSION,
                payload: Payload::text(format!("{username}:{credential}")),
                ..base
            },
            Self::JoinRoom { target } => Packet {
                to: room_id(*target),
                arg1: *target,
                arg2: CHANNEL_JOIN,
                ..base
            },
            Self::LeaveRoom { target } => Packet {
                to: room_id(*target),
                arg1: *target,
                arg2: CHANNEL_PART,
                ..base
            },
            Self::Chat { target, text } => Packet {
                to: room_id(*target),
                payload: Payload::text(escape_text(text)),
                ..base
            },
            Self::PrivateMessage { target, text } => Packet {
                to: user_id(*target),
                payload: Payload::text(escape_text(text)),
                ..base
            },
            Self::Keepalive => base,
        }
    }

    /// Encodes this command straight to wire bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::PayloadTooLarge`] if the text does not fit
    /// the length field.
    pub fn encode(&self, session_id: i32) -> Result<Vec<u8>, ProtocolError> {
        encode(&self.to_packet(session_id))
    }

    /// The packet type this command is sent as.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Login { .. } => PacketType::Login,
            Self::JoinRoom { .. } | Self::LeaveRoom { .. } => {
                PacketType::JoinChan
            }
            Self::Chat { .. } => PacketType::Cmesg,
            Self::PrivateMessage { .. } => PacketType::Pmesg,
            Self::Keepalive => PacketType::Null,
        }
    }
}

/// Maps a user id to the id of that user's room. Room ids pass through.
pub fn room_id(target: i32) -> i32 {
    if target < ROOM_ID_OFFSET {
        target + ROOM_ID_OFFSET
    } else {
        target
    }
}

/// Maps a room id back to the id of the user who owns it. User ids pass
/// through.
pub fn user_id(target: i32) -> i32 {
    if target >= ROOM_ID_OFFSET {
        target - ROOM_ID_OFFSET
    } else {
        target
    }
}
