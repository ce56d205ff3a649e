//! Raw TCP transport implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Connector, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A [`Connector`] that opens plain TCP connections.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    read_buffer_size: usize,
}

impl TcpConnector {
    /// Creates a connector with the given connect timeout and the size of
    /// the buffer each `recv` reads into.
    pub fn new(connect_timeout: Duration, read_buffer_size: usize) -> Self {
        Self {
            connect_timeout,
            read_buffer_size: read_buffer_size.max(1),
        }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), 16 * 1024)
    }
}

impl Connector for TcpConnector {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Self::Connection, Self::Error> {
        let addr = format!("{host}:{port}");

        let stream = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(addr.as_str()),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::ConnectFailed { addr, source });
            }
            Err(_) => return Err(TransportError::ConnectTimeout(addr)),
        };

        // Small command packets should go out immediately.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "TCP connection established");

        Ok(TcpConnection::from_stream(id, stream, self.read_buffer_size))
    }
}

/// A single TCP connection, split into independently locked halves.
pub struct TcpConnection {
    id: ConnectionId,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    read_buffer_size: usize,
}

impl TcpConnection {
    /// Wraps an already-connected stream.
    pub fn from_stream(
        id: ConnectionId,
        stream: TcpStream,
        read_buffer_size: usize,
    ) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            id,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            read_buffer_size: read_buffer_size.max(1),
        }
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut buf = vec![0u8; self.read_buffer_size];
        let n = self
            .reader
            .lock()
            .await
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        tracing::trace!(id = %self.id, bytes = n, "received chunk");
        Ok(Some(buf))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
