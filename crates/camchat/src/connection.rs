//! Connection actor: the session/connection manager.
//!
//! One Tokio task owns the socket, the framer, the dispatcher, the session,
//! and the lifecycle. It runs connect cycles until it is shut down:
//!
//! ```text
//! ResolvingServer → Connecting → Connected [→ Authenticating → Authenticated]
//!        ↑                                              │
//!        └──── reconnect delay ←── Disconnected ←───────┘
//! ```
//!
//! While connected, a `select!` loop serializes caller commands, keepalive
//! ticks, and socket reads. Packets are framed and dispatched one read at a
//! time, so dispatch never overlaps and writes never interleave.

use std::future::Future;
use std::sync::Arc;

use camchat_model::{ModelId, ModelState};
use camchat_protocol::{Command, Packet, PacketType, ProtocolError, StreamFramer};
use camchat_session::{
    ConnectionState, Lifecycle, ServerList, Session, SessionError, choose_server,
};
use camchat_timer::{KeepaliveTimer, ReconnectPolicy};
use camchat_transport::{
    Connection, Connector, TcpConnection, TcpConnector, TransportError,
};
use tokio::sync::{mpsc, oneshot};

use crate::client::{ClientEvent, EventReceiver};
use crate::dispatcher::{Dispatcher, PacketReceiver};
use crate::{CamchatError, ClientConfig};

/// Requests from [`Client`](crate::Client) handles to the actor.
pub(crate) enum ClientCommand {
    Send {
        command: Command,
        reply: oneshot::Sender<Result<(), CamchatError>>,
    },
    Subscribe {
        packet_type: Option<PacketType>,
        reply: oneshot::Sender<PacketReceiver>,
    },
    SubscribeEvents {
        reply: oneshot::Sender<EventReceiver>,
    },
    Session {
        reply: oneshot::Sender<Session>,
    },
    State {
        reply: oneshot::Sender<ConnectionState>,
    },
    Model {
        id: ModelId,
        reply: oneshot::Sender<Option<ModelState>>,
    },
    ModelCount {
        reply: oneshot::Sender<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Whether the actor keeps going after a command.
#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    /// A write failed; the connection is unusable.
    Disconnect(String),
    Shutdown,
}

/// How a connect cycle ended.
enum Exit {
    Reconnect,
    Close,
}

/// The lifecycle together with the subscribers told about it.
#[derive(Default)]
struct Status {
    lifecycle: Lifecycle,
    events: Vec<mpsc::UnboundedSender<ClientEvent>>,
}

impl Status {
    fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    fn set(&mut self, next: ConnectionState) {
        match self.lifecycle.transition(next) {
            Ok(from) => self.emit(ClientEvent::StateChanged { from, to: next }),
            Err(e) => tracing::debug!(error = %e, "state change skipped"),
        }
    }

    fn emit(&mut self, event: ClientEvent) {
        self.events.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn authenticated(&mut self, session: Session) {
        if self.state() == ConnectionState::Authenticating {
            self.set(ConnectionState::Authenticated);
        }
        self.emit(ClientEvent::Authenticated(session));
    }
}

/// Applies one framed packet. A successful login response moves the
/// lifecycle to `Authenticated` before the next packet is looked at.
fn receive(
    dispatcher: &mut Dispatcher,
    session: &mut Session,
    status: &mut Status,
    packet: Packet,
) -> Result<(), CamchatError> {
    if let Some(updated) = dispatcher.on_packet(packet, session)? {
        status.authenticated(updated);
    }
    Ok(())
}

pub(crate) struct ConnectionActor<S> {
    config: ClientConfig,
    servers: Arc<S>,
    connector: TcpConnector,
    commands: mpsc::Receiver<ClientCommand>,
    status: Status,
    session: Session,
    dispatcher: Dispatcher,
    reconnect: ReconnectPolicy,
    shutdown_reply: Option<oneshot::Sender<()>>,
}

impl<S: ServerList> ConnectionActor<S> {
    pub(crate) fn new(
        config: ClientConfig,
        servers: S,
        commands: mpsc::Receiver<ClientCommand>,
    ) -> Self {
        let connector =
            TcpConnector::new(config.connect_timeout, config.read_buffer_size);
        let reconnect = ReconnectPolicy::fixed(config.reconnect_delay);
        Self {
            config,
            servers: Arc::new(servers),
            connector,
            commands,
            status: Status::default(),
            session: Session::new(),
            dispatcher: Dispatcher::new(),
            reconnect,
            shutdown_reply: None,
        }
    }

    /// Runs connect cycles until shutdown, a fatal error, or every handle
    /// being dropped.
    pub(crate) async fn run(mut self) {
        tracing::info!(port = self.config.port, "client started");

        loop {
            match self.connect_cycle().await {
                Exit::Close => break,
                Exit::Reconnect => {
                    let delay = self.reconnect.next_delay();
                    let attempt = self.reconnect.attempts();
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "reconnecting after delay"
                    );
                    self.emit(ClientEvent::ReconnectScheduled { delay, attempt });
                    if self
                        .wait_with_commands(tokio::time::sleep(delay))
                        .await
                        .is_none()
                    {
                        break;
                    }
                }
            }
        }

        self.close();
    }

    /// One pass from server lookup to disconnect.
    async fn connect_cycle(&mut self) -> Exit {
        self.set_state(ConnectionState::ResolvingServer);

        let servers = Arc::clone(&self.servers);
        let Some(lookup) = self
            .wait_with_commands(async move { servers.servers().await })
            .await
        else {
            return Exit::Close;
        };
        let host = match lookup
            .and_then(|hosts| choose_server(&hosts).map(str::to_owned))
        {
            Ok(host) => host,
            Err(e) => return self.configuration_error(e),
        };

        self.set_state(ConnectionState::Connecting);
        tracing::debug!(%host, port = self.config.port, "connecting");

        let connector = self.connector.clone();
        let port = self.config.port;
        let target = host.clone();
        let Some(connected) = self
            .wait_with_commands(async move { connector.connect(&target, port).await })
            .await
        else {
            return Exit::Close;
        };
        let conn = match connected {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(%host, error = %e, "connect failed");
                return self.disconnected(e.to_string());
            }
        };

        self.set_state(ConnectionState::Connected);
        self.reconnect.reset();
        tracing::info!(%host, conn_id = %conn.id(), "connected");

        let exit = self.run_connection(&conn).await;
        if let Err(e) = conn.close().await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "close failed");
        }
        exit
    }

    /// Services one open connection until it ends.
    async fn run_connection(&mut self, conn: &TcpConnection) -> Exit {
        // Both live only as long as this connection; dropping them on
        // return cancels the keepalive and discards partial packets.
        let mut framer = StreamFramer::with_compact_threshold(self.config.compact_threshold)
            .with_max_payload(self.config.max_payload_len);
        let mut keepalive = KeepaliveTimer::new(self.config.keepalive_interval);

        if let Some(credentials) = self.config.credentials.clone() {
            self.set_state(ConnectionState::Authenticating);
            let login = Command::Login {
                username: credentials.username,
                credential: credentials.credential,
            };
            if let Err(e) = self.write(conn, &login).await {
                return self.disconnected(e.to_string());
            }
        }
        keepalive.start();

        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::debug!("all client handles dropped");
                        return Exit::Close;
                    };
                    match self.handle_command(cmd, Some(conn)).await {
                        Flow::Continue => {}
                        Flow::Disconnect(reason) => return self.disconnected(reason),
                        Flow::Shutdown => return Exit::Close,
                    }
                }

                _ = keepalive.wait_for_tick() => {
                    if let Err(e) = self.write(conn, &Command::Keepalive).await {
                        tracing::debug!(error = %e, "keepalive send failed");
                        return self.disconnected(e.to_string());
                    }
                }

                chunk = conn.recv() => match chunk {
                    Ok(Some(bytes)) => {
                        if let Some(exit) = self.feed(&mut framer, &bytes) {
                            return exit;
                        }
                    }
                    Ok(None) => {
                        tracing::info!(conn_id = %conn.id(), "server closed connection");
                        let closed = TransportError::ConnectionClosed(format!(
                            "end of stream on {}",
                            conn.id()
                        ));
                        return self.disconnected(closed.to_string());
                    }
                    Err(e) => {
                        tracing::warn!(conn_id = %conn.id(), error = %e, "read failed");
                        return self.disconnected(e.to_string());
                    }
                },
            }
        }
    }

    /// Frames and dispatches one chunk. Returns `Some` when the connection
    /// has to end.
    fn feed(&mut self, framer: &mut StreamFramer, bytes: &[u8]) -> Option<Exit> {
        let Self {
            dispatcher,
            session,
            status,
            ..
        } = self;
        let result = framer.feed(bytes, |packet| {
            receive(dispatcher, session, status, packet)
        });

        match result {
            Ok(_) => None,
            Err(CamchatError::Protocol(ProtocolError::Desync(desync))) => {
                tracing::warn!(%desync, "protocol desync, dropping connection");
                self.emit(ClientEvent::ProtocolDesync(desync));
                Some(self.disconnected(format!("protocol desync: {desync}")))
            }
            Err(CamchatError::Session(SessionError::AuthFailed { status })) => {
                tracing::warn!(status, "authentication failed");
                self.emit(ClientEvent::AuthenticationFailed { status });
                let exit = self.disconnected(format!("authentication failed ({status})"));
                if self.config.reconnect_on_auth_failure {
                    Some(exit)
                } else {
                    Some(Exit::Close)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "dispatch failed");
                Some(self.disconnected(e.to_string()))
            }
        }
    }

    /// Drives `fut` to completion while still answering commands.
    ///
    /// Returns `None` if the client was shut down (or every handle dropped)
    /// first; `fut` is dropped in that case.
    async fn wait_with_commands<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => {
                    let cmd = cmd?;
                    if self.handle_command(cmd, None).await == Flow::Shutdown {
                        return None;
                    }
                }

                out = &mut fut => return Some(out),
            }
        }
    }

    async fn handle_command(
        &mut self,
        cmd: ClientCommand,
        conn: Option<&TcpConnection>,
    ) -> Flow {
        match cmd {
            ClientCommand::Send { command, reply } => {
                let result = match conn {
                    Some(conn) => self.write(conn, &command).await,
                    None => Err(CamchatError::NotConnected),
                };
                let broken = match &result {
                    Err(CamchatError::Transport(e)) => Some(e.to_string()),
                    _ => None,
                };
                let _ = reply.send(result);
                if let Some(reason) = broken {
                    tracing::debug!(%reason, "send failed");
                    return Flow::Disconnect(reason);
                }
            }
            ClientCommand::Subscribe { packet_type, reply } => {
                let rx = match packet_type {
                    Some(packet_type) => self.dispatcher.subscribe(packet_type),
                    None => self.dispatcher.subscribe_all(),
                };
                let _ = reply.send(rx);
            }
            ClientCommand::SubscribeEvents { reply } => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.status.events.push(tx);
                let _ = reply.send(rx);
            }
            ClientCommand::Session { reply } => {
                let _ = reply.send(self.session.clone());
            }
            ClientCommand::State { reply } => {
                let _ = reply.send(self.status.state());
            }
            ClientCommand::Model { id, reply } => {
                let _ = reply.send(self.dispatcher.models().get(id).cloned());
            }
            ClientCommand::ModelCount { reply } => {
                let _ = reply.send(self.dispatcher.models().len());
            }
            ClientCommand::Shutdown { reply } => {
                tracing::info!("shutdown requested");
                self.shutdown_reply = Some(reply);
                return Flow::Shutdown;
            }
        }
        Flow::Continue
    }

    async fn write(
        &self,
        conn: &TcpConnection,
        command: &Command,
    ) -> Result<(), CamchatError> {
        let bytes = command.encode(self.session.session_id)?;
        conn.send(&bytes).await?;
        tracing::trace!(
            packet_type = %command.packet_type(),
            bytes = bytes.len(),
            "sent"
        );
        Ok(())
    }

    /// Records the end of a connection. The caller decides whether the
    /// cycle closes or reconnects; this returns the reconnect default.
    fn disconnected(&mut self, reason: String) -> Exit {
        tracing::debug!(
            from = %self.status.state(),
            held_ms = self.status.lifecycle.time_in_state().as_millis() as u64,
            "connection ended"
        );
        // The server hands out a new identity after every login.
        self.session = Session::new();
        self.set_state(ConnectionState::Disconnected);
        self.emit(ClientEvent::Disconnected { reason });
        Exit::Reconnect
    }

    fn configuration_error(&mut self, error: SessionError) -> Exit {
        tracing::error!(error = %error, "no server to connect to");
        self.emit(ClientEvent::ConfigurationError(error.to_string()));
        Exit::Close
    }

    fn close(&mut self) {
        self.set_state(ConnectionState::Closed);
        self.emit(ClientEvent::Closed);
        if let Some(reply) = self.shutdown_reply.take() {
            let _ = reply.send(());
        }
        tracing::info!(attempts = self.status.lifecycle.attempts(), "client closed");
    }

    fn set_state(&mut self, next: ConnectionState) {
        self.status.set(next);
    }

    fn emit(&mut self, event: ClientEvent) {
        self.status.emit(event);
    }
}
