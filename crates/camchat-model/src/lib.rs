//! Model state store for camchat.
//!
//! A "model" is a remote entity (a broadcaster and their room) whose state
//! the server streams as partial updates. This crate keeps the latest known
//! value of every attribute ever reported for each model.
//!
//! # Key types
//!
//! - [`ModelId`]: numeric id of a model
//! - [`ModelState`]: attribute map for one model, built by merging
//! - [`ModelStore`]: all known models, created lazily on first reference
//!
//! Merging only ever sets or overwrites the attributes present in an
//! update. Nothing in this crate removes an attribute or a model.

mod state;
mod store;

pub use state::{ModelId, ModelState};
pub use store::ModelStore;
