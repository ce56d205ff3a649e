//! Error types for the protocol layer.
//!
//! Running out of bytes halfway through a packet is not in here. That is
//! the normal [`DecodeResult::Incomplete`](crate::DecodeResult::Incomplete)
//! outcome, and the framer absorbs it by waiting for the next chunk.

use std::fmt;

/// Why the byte stream lost packet alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Desync {
    /// The leading 4 bytes of a packet were not [`MAGIC`](crate::MAGIC).
    BadMagic(i32),

    /// The header declared a negative payload length.
    NegativeLength(i32),

    /// The header declared a payload longer than the receiver accepts.
    PayloadTooLong(i32),
}

impl fmt::Display for Desync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic(found) => write!(
                f,
                "bad magic: expected {}, found {found}",
                crate::MAGIC
            ),
            Self::NegativeLength(len) => {
                write!(f, "negative payload length {len}")
            }
            Self::PayloadTooLong(len) => {
                write!(f, "declared payload length {len} exceeds the limit")
            }
        }
    }
}

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The stream can no longer be trusted to mark packet boundaries.
    ///
    /// Fatal to the connection: the only correct response is to close the
    /// socket and start over on a fresh one.
    #[error("protocol desync: {0}")]
    Desync(Desync),

    /// A payload is too long for the 32-bit signed length field.
    #[error("payload of {0} bytes exceeds the wire limit")]
    PayloadTooLarge(usize),

    /// A structured payload could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}
