/// Errors that can occur in the transport layer.
///
/// Every variant ends the current connection. The client treats all of
/// them the same way: tear down, wait, reconnect.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote side closed the connection (clean end-of-stream).
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening the TCP connection failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Opening the TCP connection took longer than the configured timeout.
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
