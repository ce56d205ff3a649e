//! # camchat
//!
//! Persistent client for a binary, TCP-based chat protocol.
//!
//! A [`Client`] keeps one connection to a chat server alive: it picks a
//! server, connects, logs in, sends keepalives, and reconnects after a
//! fixed delay whenever the connection drops. Incoming packets are framed
//! out of the byte stream, applied to a local model store, and published
//! to subscribers by packet type.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use camchat::prelude::*;
//!
//! # async fn run() -> Result<(), CamchatError> {
//! let client = Client::builder(StaticServerList::new(["chat.example.com"]))
//!     .credentials(Credentials::new("alice", "pre-hashed-secret"))
//!     .start();
//!
//! let mut chat = client.subscribe(PacketType::Cmesg).await?;
//! client.join_room(12345).await?;
//!
//! while let Some(packet) = chat.recv().await {
//!     if let Some(text) = packet.chat_text() {
//!         println!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connection;
mod dispatcher;
mod error;
mod transform;

pub use client::{Client, ClientBuilder, ClientEvent, EventReceiver};
pub use config::ClientConfig;
pub use dispatcher::{Dispatcher, PacketReceiver};
pub use error::CamchatError;
pub use transform::{Passthrough, ReplacementTable, TextTransform, apply_transform};

pub use camchat_model as model;
pub use camchat_protocol as protocol;
pub use camchat_session as session;
pub use camchat_timer as timer;
pub use camchat_transport as transport;

/// Commonly used types, importable with `use camchat::prelude::*`.
pub mod prelude {
    pub use crate::{
        CamchatError, Client, ClientBuilder, ClientConfig, ClientEvent,
        Passthrough, ReplacementTable, TextTransform,
    };
    pub use camchat_model::{ModelId, ModelState};
    pub use camchat_protocol::{Command, Packet, PacketType, Payload};
    pub use camchat_session::{
        ConnectionState, Credentials, ServerList, Session, SessionError,
        StaticServerList,
    };
}
