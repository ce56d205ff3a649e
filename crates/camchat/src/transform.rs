//! Outgoing text transforms (emote expansion and the like).
//!
//! The embedding application decides how chat text is rewritten before it
//! is sent. Anything implementing [`TextTransform`] works; the client calls
//! it through [`apply_transform`], which never hands it blank text.

use std::collections::HashMap;
use std::future::Future;

/// Rewrites outgoing chat text. May be asynchronous.
///
/// # Example
///
/// ```rust
/// use camchat::TextTransform;
///
/// struct Shout;
///
/// impl TextTransform for Shout {
///     async fn transform(&self, text: &str) -> String {
///         text.to_uppercase()
///     }
/// }
/// ```
pub trait TextTransform: Send + Sync + 'static {
    /// Returns the rewritten text.
    fn transform(&self, text: &str) -> impl Future<Output = String> + Send;
}

/// Sends text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl TextTransform for Passthrough {
    async fn transform(&self, text: &str) -> String {
        text.to_owned()
    }
}

/// Replaces whole space-separated tokens using a lookup table.
///
/// `":wave:"` → `"👋"` style expansions, loaded from data rather than code.
#[derive(Debug, Clone, Default)]
pub struct ReplacementTable {
    replacements: HashMap<String, String>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one token mapping.
    pub fn insert(
        &mut self,
        token: impl Into<String>,
        replacement: impl Into<String>,
    ) -> &mut Self {
        self.replacements.insert(token.into(), replacement.into());
        self
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    fn apply(&self, text: &str) -> String {
        text.split(' ')
            .map(|token| {
                self.replacements
                    .get(token)
                    .map(String::as_str)
                    .unwrap_or(token)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K, V> FromIterator<(K, V)> for ReplacementTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            replacements: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TextTransform for ReplacementTable {
    async fn transform(&self, text: &str) -> String {
        self.apply(text)
    }
}

/// Runs `transform` over `text`, except that empty or whitespace-only text
/// is returned as-is without calling it.
pub async fn apply_transform<T: TextTransform>(
    transform: &T,
    text: &str,
) -> String {
    if text.trim().is_empty() {
        return text.to_owned();
    }
    transform.transform(text).await
}
