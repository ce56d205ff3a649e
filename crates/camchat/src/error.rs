//! Unified error type for the camchat client.

use camchat_protocol::ProtocolError;
use camchat_session::SessionError;
use camchat_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each wrapped variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CamchatError {
    /// Socket-level failure or remote close.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Desync or an unencodable outbound packet.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Login rejected, no servers, or a bad lifecycle step.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A command needs an open connection and there is none right now.
    #[error("not connected")]
    NotConnected,

    /// The client has shut down; no further calls will succeed.
    #[error("client closed")]
    ClientClosed,
}
