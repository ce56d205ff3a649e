//! Server discovery hook.
//!
//! Where the chat servers live is not this crate's business: some
//! external configuration service knows. The [`ServerList`] trait is the
//! seam. You implement it with whatever lookup your deployment has, and
//! the client calls it at the start of every connect cycle.

use rand::seq::IndexedRandom;

use crate::SessionError;

/// Supplies the candidate chat server hosts.
///
/// # Example
///
/// ```rust
/// use camchat_session::{ServerList, SessionError};
///
/// /// Always returns the same two hosts.
/// struct Fixed;
///
/// impl ServerList for Fixed {
///     async fn servers(&self) -> Result<Vec<String>, SessionError> {
///         Ok(vec!["chat1.example.com".into(), "chat2.example.com".into()])
///     }
/// }
/// ```
pub trait ServerList: Send + Sync + 'static {
    /// Returns the hostnames a client may connect to.
    ///
    /// # Errors
    /// Return [`SessionError::ServerLookup`] if the lookup itself failed.
    /// An empty list is turned into [`SessionError::NoServers`] by the
    /// caller.
    fn servers(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, SessionError>> + Send;
}

/// A [`ServerList`] backed by a fixed list of hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticServerList {
    hosts: Vec<String>,
}

impl StaticServerList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }
}

impl ServerList for StaticServerList {
    async fn servers(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.hosts.clone())
    }
}

/// Picks one host uniformly at random, so that many clients spread out
/// over the available servers.
///
/// # Errors
/// Returns [`SessionError::NoServers`] if `hosts` is empty.
pub fn choose_server(hosts: &[String]) -> Result<&str, SessionError> {
    hosts
        .choose(&mut rand::rng())
        .map(String::as_str)
        .ok_or(SessionError::NoServers)
}
