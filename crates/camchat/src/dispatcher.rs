//! Packet dispatch: per-type side effects, then publish/subscribe fan-out.
//!
//! Every decoded packet passes through [`Dispatcher::on_packet`] in wire
//! order. A few types update local state first (login, session state,
//! tags); then the packet goes to the subscribers of its type and to the
//! catch-all subscribers, in that order. A type subscriber therefore
//! always sees the model store already updated for the packet it receives.

use std::collections::HashMap;
use std::sync::Arc;

use camchat_model::{ModelId, ModelStore};
use camchat_protocol::{Packet, PacketType};
use camchat_session::{Session, SessionError};
use tokio::sync::mpsc;

/// Receiving end of a packet subscription.
pub type PacketReceiver = mpsc::UnboundedReceiver<Arc<Packet>>;

type PacketSender = mpsc::UnboundedSender<Arc<Packet>>;

/// Routes packets to subscribers and keeps the model store current.
#[derive(Debug, Default)]
pub struct Dispatcher {
    models: ModelStore,
    by_type: HashMap<PacketType, Vec<PacketSender>>,
    all: Vec<PacketSender>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to packets of one type.
    pub fn subscribe(&mut self, packet_type: PacketType) -> PacketReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.by_type.entry(packet_type).or_default().push(tx);
        rx
    }

    /// Subscribes to every packet.
    pub fn subscribe_all(&mut self) -> PacketReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.all.push(tx);
        rx
    }

    /// Known model state.
    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    /// Handles one packet.
    ///
    /// Returns the updated session when the packet was a successful login
    /// response.
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] for a rejected login. The
    /// packet has still been published by then, so subscribers see the
    /// rejection too.
    pub fn on_packet(
        &mut self,
        packet: Packet,
        session: &mut Session,
    ) -> Result<Option<Session>, SessionError> {
        let login = match packet.packet_type.canonical() {
            PacketType::Login => Some(
                session
                    .apply_login_response(&packet)
                    .map(|()| session.clone()),
            ),
            PacketType::SessionState => {
                self.apply_session_state(&packet);
                None
            }
            PacketType::Tags => {
                self.apply_tags(&packet);
                None
            }
            _ => None,
        };

        self.publish(packet);
        login.transpose()
    }

    fn apply_session_state(&mut self, packet: &Packet) {
        let id = ModelId(packet.arg2);
        match packet.payload.as_json().and_then(|v| v.as_object()) {
            Some(update) => {
                self.models.merge(id, update);
            }
            None => {
                tracing::warn!(model_id = %id, "session state without object payload");
            }
        }
    }

    fn apply_tags(&mut self, packet: &Packet) {
        let Some(entries) = packet.payload.as_json().and_then(|v| v.as_object())
        else {
            tracing::warn!("tag update without object payload");
            return;
        };
        for (key, tags) in entries {
            match key.parse::<i32>() {
                Ok(id) => {
                    self.models.merge_tags(ModelId(id), tags);
                }
                Err(_) => tracing::warn!(key = %key, "tag update for non-numeric model id"),
            }
        }
    }

    fn publish(&mut self, packet: Packet) {
        let packet = Arc::new(packet);
        if let Some(senders) = self.by_type.get_mut(&packet.packet_type) {
            senders.retain(|tx| tx.send(Arc::clone(&packet)).is_ok());
        }
        self.all.retain(|tx| tx.send(Arc::clone(&packet)).is_ok());
        tracing::trace!(packet_type = %packet.packet_type, "dispatched");
    }
}
