//! Client configuration.

use std::time::Duration;

use camchat_protocol::{DEFAULT_COMPACT_THRESHOLD, DEFAULT_MAX_PAYLOAD, DEFAULT_PORT};
use camchat_session::Credentials;
use camchat_timer::{DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_RECONNECT_DELAY};
use serde::{Deserialize, Serialize};

const MIN_INTERVAL: Duration = Duration::from_millis(1);
const MIN_READ_BUFFER: usize = 512;

/// Configuration for a [`Client`](crate::Client).
///
/// Every field has a default that matches what the chat servers expect,
/// so usually only `credentials` needs setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// TCP port of the chat servers.
    pub port: u16,

    /// How often a keepalive is sent while connected.
    pub keepalive_interval: Duration,

    /// Pause between a disconnect and the next connect attempt.
    pub reconnect_delay: Duration,

    /// How long a TCP connect may take before the attempt is abandoned.
    pub connect_timeout: Duration,

    /// Size of each socket read.
    pub read_buffer_size: usize,

    /// Consumed bytes the framer tolerates at the front of its buffer
    /// before reclaiming them.
    pub compact_threshold: usize,

    /// Largest payload length a packet header may declare. Anything longer
    /// is treated as a desync and drops the connection.
    pub max_payload_len: usize,

    /// Login material. Without it the client connects anonymously and
    /// never enters `Authenticating`.
    pub credentials: Option<Credentials>,

    /// Keep reconnecting after the server rejects the login. When false a
    /// rejected login closes the client.
    pub reconnect_on_auth_failure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: Duration::from_secs(10),
            read_buffer_size: 16 * 1024,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            max_payload_len: DEFAULT_MAX_PAYLOAD,
            credentials: None,
            reconnect_on_auth_failure: false,
        }
    }
}

impl ClientConfig {
    /// Returns a copy with unusable values raised to workable minimums.
    pub fn validated(mut self) -> Self {
        if self.port == 0 {
            tracing::warn!(port = DEFAULT_PORT, "port 0 configured, using default");
            self.port = DEFAULT_PORT;
        }
        if self.keepalive_interval < MIN_INTERVAL {
            tracing::warn!("keepalive interval too small, clamping");
            self.keepalive_interval = MIN_INTERVAL;
        }
        if self.connect_timeout < MIN_INTERVAL {
            tracing::warn!("connect timeout too small, clamping");
            self.connect_timeout = MIN_INTERVAL;
        }
        if self.read_buffer_size < MIN_READ_BUFFER {
            tracing::warn!(
                configured = self.read_buffer_size,
                "read buffer too small, clamping"
            );
            self.read_buffer_size = MIN_READ_BUFFER;
        }
        self
    }
}
