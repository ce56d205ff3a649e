//! Client session management for camchat.
//!
//! This crate holds everything about *who* the client is and *where* its
//! connection stands:
//!
//! 1. **Server selection**: the [`ServerList`] hook and uniform random
//!    choice among its hosts ([`choose_server`])
//! 2. **Identity**: [`Credentials`] going in, [`Session`] coming back
//!    from a login response
//! 3. **Lifecycle**: the [`ConnectionState`] graph, enforced by
//!    [`Lifecycle`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Client / connection manager (above)  ← drives the lifecycle
//!     ↕
//! Session layer (this crate)  ← identity and connection state
//!     ↕
//! Protocol layer (below)  ← provides Packet for login responses
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod lifecycle;
mod servers;
mod session;

pub use error::SessionError;
pub use lifecycle::Lifecycle;
pub use servers::{ServerList, StaticServerList, choose_server};
pub use session::{ConnectionState, Credentials, Session};
