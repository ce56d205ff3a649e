//! Wire protocol for camchat.
//!
//! This crate defines the binary packet format the chat servers speak and
//! everything needed to move between bytes and packets:
//!
//! - **Types** ([`Packet`], [`PacketType`], [`Payload`]) and wire constants.
//! - **Codec** ([`decode`], [`encode`]): one packet at a time, no I/O.
//! - **Framer** ([`StreamFramer`]): a byte stream in, packets out.
//! - **Commands** ([`Command`]): outbound packets built from intent.
//! - **Escaping** ([`escape_text`], [`unescape_text`]) for chat text.
//!
//! # Architecture
//!
//! ```text
//! Transport (byte chunks) → StreamFramer → decode → Packet → dispatcher
//! caller → Command → encode → Transport
//! ```

mod codec;
mod command;
mod error;
mod escape;
mod framer;
mod types;

pub use codec::{DecodeResult, decode, decode_bounded, encode};
pub use command::{Command, room_id, user_id};
pub use error::{Desync, ProtocolError};
pub use escape::{escape_text, unescape_text};
pub use framer::{DEFAULT_COMPACT_THRESHOLD, DEFAULT_MAX_PAYLOAD, StreamFramer};
pub use types::{
    CHANNEL_JOIN, CHANNEL_PART, DEFAULT_PORT, HEADER_LEN, LOGIN_VERSION, MAGIC,
    Packet, PacketType, Payload, ROOM_ID_OFFSET,
};
