//! Transport abstraction layer for camchat.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how the client reaches a chat server, plus the TCP implementation the
//! protocol actually runs on.
//!
//! The transport moves opaque byte chunks. It knows nothing about packet
//! boundaries: a chunk returned by [`Connection::recv`] may hold half a
//! packet, several packets, or anything in between. Framing is the
//! protocol layer's job.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpConnector};

use std::fmt;

/// Opaque identifier for a connection.
///
/// Each physical connection (including every reconnect) gets a fresh id,
/// which makes log lines from different attempts easy to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens outgoing connections to a server.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;
    /// The error type for connect operations.
    type Error: std::error::Error + Send + Sync;

    /// Opens a connection to `host:port`.
    async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
///
/// `send` and `recv` take `&self` and may be in flight at the same time:
/// the reading and writing halves are independent, so a pending `recv`
/// never blocks a `send`. Concurrent `send` calls are serialized, so
/// one call's bytes are never interleaved with another's.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Writes all of `data` to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next chunk of bytes from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
