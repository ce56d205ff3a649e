//! The packet codec: pure encode/decode of the fixed wire format.
//!
//! No I/O and no state. [`decode`] looks at a byte slice starting at an
//! offset and reports whether a whole packet is there; [`encode`] is its
//! inverse.
//!
//! ## Wire layout
//!
//! Big-endian, every header field a 32-bit signed integer:
//!
//! ```text
//! offset  0  magic          (must equal MAGIC)
//! offset  4  type
//! offset  8  from
//! offset 12  to
//! offset 16  arg1
//! offset 20  arg2
//! offset 24  payload length N
//! offset 28  payload        (N bytes of UTF-8)
//! ```

use crate::{
    Desync, HEADER_LEN, MAGIC, Packet, PacketType, Payload, ProtocolError,
};

/// Outcome of one [`decode`] attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult {
    /// A whole packet was present.
    Complete {
        /// The decoded packet.
        packet: Packet,
        /// Header plus payload length; advance the cursor by this much.
        consumed: usize,
    },

    /// Not enough bytes yet. Not an error: wait for more data and retry
    /// at the same offset.
    Incomplete,

    /// The bytes at the offset cannot start a packet. Nothing after this
    /// point in the stream can be trusted.
    Desync(Desync),
}

/// Attempts to decode one packet starting at `offset` in `buffer`.
///
/// Every read is bounds-checked up front, so a short buffer yields
/// [`DecodeResult::Incomplete`] rather than a panic or an error. The magic
/// is checked as soon as its 4 bytes are available, so a bad stream is
/// reported without waiting for a full header.
pub fn decode(buffer: &[u8], offset: usize) -> DecodeResult {
    decode_bounded(buffer, offset, usize::MAX)
}

/// Like [`decode`], but a header declaring more than `max_payload` bytes
/// is reported as [`Desync::PayloadTooLong`] as soon as the header is in,
/// without waiting for the payload.
pub fn decode_bounded(
    buffer: &[u8],
    offset: usize,
    max_payload: usize,
) -> DecodeResult {
    let rest = buffer.get(offset..).unwrap_or_default();

    let Some(magic) = read_i32(rest, 0) else {
        return DecodeResult::Incomplete;
    };
    if magic != MAGIC {
        return DecodeResult::Desync(Desync::BadMagic(magic));
    }

    if rest.len() < HEADER_LEN {
        return DecodeResult::Incomplete;
    }
    // The header is all there, so these reads cannot come back empty.
    let field = |at| read_i32(rest, at).unwrap_or_default();
    let packet_type = PacketType::from_code(field(4));
    let from = field(8);
    let to = field(12);
    let arg1 = field(16);
    let arg2 = field(20);
    let length = field(24);

    let Ok(payload_len) = usize::try_from(length) else {
        return DecodeResult::Desync(Desync::NegativeLength(length));
    };
    if payload_len > max_payload {
        return DecodeResult::Desync(Desync::PayloadTooLong(length));
    }
    let Some(total) = HEADER_LEN.checked_add(payload_len) else {
        return DecodeResult::Desync(Desync::NegativeLength(length));
    };
    if rest.len() < total {
        return DecodeResult::Incomplete;
    }

    let packet = Packet {
        packet_type,
        from,
        to,
        arg1,
        arg2,
        payload: Payload::parse(&rest[HEADER_LEN..total]),
    };

    DecodeResult::Complete {
        packet,
        consumed: total,
    }
}

/// Serializes `packet` into its wire form.
///
/// The length field is the UTF-8 byte length of the payload text, not its
/// character count.
///
/// # Errors
/// - [`ProtocolError::PayloadTooLarge`] if the payload does not fit the
///   32-bit signed length field.
/// - [`ProtocolError::Encode`] if a structured payload cannot be
///   serialized.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let text = packet.payload.to_wire_text()?;
    let body = text.as_bytes();
    let length = i32::try_from(body.len())
        .map_err(|_| ProtocolError::PayloadTooLarge(body.len()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    for field in [
        MAGIC,
        packet.packet_type.code(),
        packet.from,
        packet.to,
        packet.arg1,
        packet.arg2,
        length,
    ] {
        out.extend_from_slice(&field.to_be_bytes());
    }
    out.extend_from_slice(body);
    Ok(out)
}

fn read_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(i32::from_be_bytes(raw))
}
