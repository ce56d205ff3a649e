//! `Client` handle and builder.
//!
//! A [`Client`] is a cheap, cloneable handle to a connection actor running
//! in its own Tokio task. All calls go through the actor's command channel,
//! so they are serialized with socket reads and keepalives without any
//! locking on the caller's side.

use std::sync::Arc;
use std::time::Duration;

use camchat_model::{ModelId, ModelState};
use camchat_protocol::{Command, Desync, PacketType};
use camchat_session::{ConnectionState, Credentials, ServerList, Session};
use tokio::sync::{mpsc, oneshot};

use crate::connection::{ClientCommand, ConnectionActor};
use crate::dispatcher::PacketReceiver;
use crate::transform::{Passthrough, TextTransform, apply_transform};
use crate::{CamchatError, ClientConfig};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Something that happened to the client's connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The connection moved between lifecycle states.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The server accepted the login.
    Authenticated(Session),

    /// The server rejected the login with a non-zero status.
    AuthenticationFailed { status: i32 },

    /// The byte stream lost alignment; the connection is being dropped.
    ProtocolDesync(Desync),

    /// The connection ended.
    Disconnected { reason: String },

    /// A reconnect will start after `delay`.
    ReconnectScheduled { delay: Duration, attempt: u64 },

    /// No server could be found to connect to. The client closes.
    ConfigurationError(String),

    /// The client has shut down for good.
    Closed,
}

/// Receiving end of the client event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

// ---------------------------------------------------------------------------
// ClientBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a [`Client`].
///
/// # Example
///
/// ```rust,no_run
/// use camchat::prelude::*;
///
/// # async fn run() -> Result<(), CamchatError> {
/// let client = Client::builder(StaticServerList::new(["chat.example.com"]))
///     .credentials(Credentials::new("alice", "pre-hashed-secret"))
///     .start();
///
/// client.join_room(12345).await?;
/// client.send_chat(12345, "hello").await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<S, T = Passthrough> {
    servers: S,
    config: ClientConfig,
    transform: T,
}

impl<S: ServerList> ClientBuilder<S, Passthrough> {
    /// Creates a builder with default settings and no text transform.
    pub fn new(servers: S) -> Self {
        Self {
            servers,
            config: ClientConfig::default(),
            transform: Passthrough,
        }
    }
}

impl<S: ServerList, T: TextTransform> ClientBuilder<S, T> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Logs in with these credentials after every connect.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Sets the transform applied to outgoing chat and private messages.
    pub fn transform<U: TextTransform>(self, transform: U) -> ClientBuilder<S, U> {
        ClientBuilder {
            servers: self.servers,
            config: self.config,
            transform,
        }
    }

    /// Spawns the connection actor and returns a handle to it.
    ///
    /// The actor starts connecting immediately. Must be called from within
    /// a Tokio runtime.
    pub fn start(self) -> Client<T> {
        let config = self.config.validated();
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let actor = ConnectionActor::new(config, self.servers, rx);
        tokio::spawn(actor.run());

        Client {
            commands: tx,
            transform: Arc::new(self.transform),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle to a running client.
///
/// Clones share the same connection. When the last handle is dropped the
/// client shuts down.
pub struct Client<T = Passthrough> {
    commands: mpsc::Sender<ClientCommand>,
    transform: Arc<T>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl Client<Passthrough> {
    /// Creates a builder.
    pub fn builder<S: ServerList>(servers: S) -> ClientBuilder<S, Passthrough> {
        ClientBuilder::new(servers)
    }
}

impl<T: TextTransform> Client<T> {
    /// Sends chat text to the room of `target` (a user id or room id).
    ///
    /// The text transform runs first, then the text is escaped for the
    /// wire.
    pub async fn send_chat(&self, target: i32, text: &str) -> Result<(), CamchatError> {
        let text = apply_transform(&*self.transform, text).await;
        self.send_command(Command::Chat { target, text }).await
    }

    /// Sends a private message to user `target`.
    pub async fn send_private_message(
        &self,
        target: i32,
        text: &str,
    ) -> Result<(), CamchatError> {
        let text = apply_transform(&*self.transform, text).await;
        self.send_command(Command::PrivateMessage { target, text }).await
    }
}

impl<T> Client<T> {
    /// Joins the room of `target` (a user id or room id).
    pub async fn join_room(&self, target: i32) -> Result<(), CamchatError> {
        self.send_command(Command::JoinRoom { target }).await
    }

    /// Leaves the room of `target`.
    pub async fn leave_room(&self, target: i32) -> Result<(), CamchatError> {
        self.send_command(Command::LeaveRoom { target }).await
    }

    /// Sends any command as-is, without a text transform.
    ///
    /// # Errors
    /// [`CamchatError::NotConnected`] if no socket is open right now.
    pub async fn send_command(&self, command: Command) -> Result<(), CamchatError> {
        self.request(|reply| ClientCommand::Send { command, reply })
            .await?
    }

    /// Subscribes to packets of one type.
    pub async fn subscribe(
        &self,
        packet_type: PacketType,
    ) -> Result<PacketReceiver, CamchatError> {
        self.request(|reply| ClientCommand::Subscribe {
            packet_type: Some(packet_type),
            reply,
        })
        .await
    }

    /// Subscribes to every packet.
    pub async fn subscribe_all(&self) -> Result<PacketReceiver, CamchatError> {
        self.request(|reply| ClientCommand::Subscribe {
            packet_type: None,
            reply,
        })
        .await
    }

    /// Subscribes to connection events.
    pub async fn subscribe_events(&self) -> Result<EventReceiver, CamchatError> {
        self.request(|reply| ClientCommand::SubscribeEvents { reply })
            .await
    }

    /// The current session identity. All zero until logged in.
    pub async fn session(&self) -> Result<Session, CamchatError> {
        self.request(|reply| ClientCommand::Session { reply }).await
    }

    /// The current lifecycle state.
    pub async fn state(&self) -> Result<ConnectionState, CamchatError> {
        self.request(|reply| ClientCommand::State { reply }).await
    }

    /// A snapshot of one model's state, if it has been seen.
    pub async fn model(&self, id: ModelId) -> Result<Option<ModelState>, CamchatError> {
        self.request(|reply| ClientCommand::Model { id, reply }).await
    }

    /// Number of models seen so far.
    pub async fn model_count(&self) -> Result<usize, CamchatError> {
        self.request(|reply| ClientCommand::ModelCount { reply })
            .await
    }

    /// Closes the connection, cancels all timers, and stops the actor.
    ///
    /// Every later call on any handle returns
    /// [`CamchatError::ClientClosed`]. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        if self
            .request(|reply| ClientCommand::Shutdown { reply })
            .await
            .is_err()
        {
            tracing::trace!("shutdown on a closed client");
        }
    }

    /// Sends a command to the actor and waits for its reply.
    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> ClientCommand,
    ) -> Result<R, CamchatError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| CamchatError::ClientClosed)?;
        reply_rx.await.map_err(|_| CamchatError::ClientClosed)
    }
}
