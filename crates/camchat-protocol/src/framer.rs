//! The stream framer: turns arbitrarily chunked bytes into packets.
//!
//! TCP delivers a byte stream, not messages. One read may hold a fragment
//! of a packet, exactly one packet, or several packets plus the start of
//! the next. The framer accumulates bytes and hands every complete packet
//! to a sink, in wire order, before it returns.
//!
//! ## Buffer invariant
//!
//! ```text
//! buffer: [ consumed ... | partial packet or nothing ]
//!                        ^ cursor
//! ```
//!
//! Bytes before the cursor are fully decoded and may be reclaimed. Bytes
//! from the cursor on are either empty or an incomplete packet; complete
//! packets never stay in the buffer across a `feed` call.

use crate::codec::{DecodeResult, decode_bounded};
use crate::{Desync, Packet, ProtocolError};

/// Default number of consumed bytes tolerated ahead of the cursor before
/// the buffer is compacted.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 64 * 1024;

/// Default largest payload the framer will buffer for a single packet.
pub const DEFAULT_MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Accumulates stream bytes and extracts complete packets.
///
/// One framer serves one physical connection. After a desync it refuses
/// all further input; a new connection needs a new framer (or a
/// [`reset`](Self::reset)).
#[derive(Debug)]
pub struct StreamFramer {
    buffer: Vec<u8>,
    cursor: usize,
    compact_threshold: usize,
    max_payload: usize,
    desync: Option<Desync>,
}

impl StreamFramer {
    /// Creates an empty framer with the default compaction threshold.
    pub fn new() -> Self {
        Self::with_compact_threshold(DEFAULT_COMPACT_THRESHOLD)
    }

    /// Creates an empty framer that compacts once `threshold` consumed
    /// bytes sit ahead of the cursor.
    pub fn with_compact_threshold(threshold: usize) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            compact_threshold: threshold,
            max_payload: DEFAULT_MAX_PAYLOAD,
            desync: None,
        }
    }

    /// Caps the payload length a header may declare. A longer one is a
    /// [`Desync::PayloadTooLong`] instead of a buffer that never fills.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Appends `chunk` and passes every complete packet to `sink`.
    ///
    /// Packets reach the sink in wire order, and all packets completed by
    /// this chunk are delivered before `feed` returns. A trailing partial
    /// packet stays buffered for the next call. Returns the number of
    /// packets delivered.
    ///
    /// If the sink returns an error, framing stops and the error is
    /// returned; the remaining bytes are left in place.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Desync`] (converted into `E`) when the
    /// stream loses alignment. Packets before the bad bytes have already
    /// been delivered. The framer discards its buffer and rejects every
    /// later `feed` with the same error.
    pub fn feed<E, F>(&mut self, chunk: &[u8], mut sink: F) -> Result<usize, E>
    where
        E: From<ProtocolError>,
        F: FnMut(Packet) -> Result<(), E>,
    {
        if let Some(desync) = self.desync {
            return Err(ProtocolError::Desync(desync).into());
        }

        self.buffer.extend_from_slice(chunk);
        let mut delivered = 0;

        loop {
            match decode_bounded(&self.buffer, self.cursor, self.max_payload) {
                DecodeResult::Complete { packet, consumed } => {
                    self.cursor += consumed;
                    delivered += 1;
                    tracing::trace!(
                        packet_type = %packet.packet_type,
                        consumed,
                        "framed packet"
                    );
                    sink(packet)?;
                }
                DecodeResult::Incomplete => break,
                DecodeResult::Desync(desync) => {
                    tracing::warn!(
                        %desync,
                        cursor = self.cursor,
                        "stream desync, discarding buffer"
                    );
                    self.desync = Some(desync);
                    self.buffer = Vec::new();
                    self.cursor = 0;
                    return Err(ProtocolError::Desync(desync).into());
                }
            }
        }

        self.compact();
        Ok(delivered)
    }

    /// Drops all buffered bytes and clears a desync.
    pub fn reset(&mut self) {
        self.buffer = Vec::new();
        self.cursor = 0;
        self.desync = None;
    }

    /// Number of buffered bytes not yet decoded.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Returns the desync that poisoned this framer, if any.
    pub fn desync(&self) -> Option<Desync> {
        self.desync
    }

    /// Reclaims consumed bytes.
    ///
    /// A fully drained buffer is released outright. Otherwise consumed
    /// bytes are shifted out once they pass the threshold, which bounds
    /// growth while a large packet trickles in.
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        if self.cursor >= self.buffer.len() {
            self.buffer = Vec::new();
            self.cursor = 0;
            return;
        }
        if self.cursor >= self.compact_threshold {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}
