//! The model store: every model this client has heard about.
//!
//! # Concurrency note
//!
//! `ModelStore` is a plain `HashMap` with no locking. It is owned by the
//! connection's dispatcher and mutated only on the single task that
//! processes packets; other code reads it through that owner.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{ModelId, ModelState};

/// Attribute under which non-object tag data is stored.
const TAGS_ATTRIBUTE: &str = "tags";

/// Cache of [`ModelState`] keyed by [`ModelId`].
///
/// Entries are created on first reference and never evicted.
#[derive(Debug, Default)]
pub struct ModelStore {
    models: HashMap<ModelId, ModelState>,
}

impl ModelStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the model for `id`, creating an empty one if needed.
    ///
    /// Calling this repeatedly with the same id returns the same entry.
    pub fn get_or_create(&mut self, id: ModelId) -> &mut ModelState {
        self.models.entry(id).or_insert_with(|| {
            tracing::trace!(model_id = %id, "model created");
            ModelState::new(id)
        })
    }

    /// Merges `update` into the model for `id`. Returns how many
    /// attributes changed.
    pub fn merge(&mut self, id: ModelId, update: &Map<String, Value>) -> usize {
        let changed = self.get_or_create(id).merge(update);
        tracing::trace!(model_id = %id, changed, "model merged");
        changed
    }

    /// Merges one model's entry from a tag update.
    ///
    /// An object is merged key by key like any other update. Anything else
    /// (usually a list of tag strings) replaces the `tags` attribute.
    pub fn merge_tags(&mut self, id: ModelId, tags: &Value) -> usize {
        match tags {
            Value::Object(update) => self.merge(id, update),
            other => {
                usize::from(self.get_or_create(id).set(TAGS_ATTRIBUTE, other.clone()))
            }
        }
    }

    /// Looks up a model without creating it.
    pub fn get(&self, id: ModelId) -> Option<&ModelState> {
        self.models.get(&id)
    }

    /// Iterates over all known models, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelState> {
        self.models.values()
    }

    /// Number of known models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no model has been referenced yet.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
