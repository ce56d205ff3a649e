//! Per-model state.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Numeric id of a remote model.
///
/// Serialized as the bare integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ModelId(pub i32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// Last-known attributes of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    id: ModelId,
    attributes: Map<String, Value>,
}

impl ModelState {
    /// Creates a model with no known attributes.
    pub fn new(id: ModelId) -> Self {
        Self {
            id,
            attributes: Map::new(),
        }
    }

    /// The model's id.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Merges `update` into this model.
    ///
    /// Every key in `update` is set, overwriting any previous value. Keys
    /// absent from `update` are left untouched, and a `null` in `update` is
    /// stored as a value like any other. Returns how many attributes were
    /// added or changed.
    pub fn merge(&mut self, update: &Map<String, Value>) -> usize {
        let mut changed = 0;
        for (key, value) in update {
            if self.attributes.get(key) != Some(value) {
                self.attributes.insert(key.clone(), value.clone());
                changed += 1;
            }
        }
        changed
    }

    /// Sets a single attribute. Returns `true` if the value changed.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.attributes.get(&key) == Some(&value) {
            return false;
        }
        self.attributes.insert(key, value);
        true
    }

    /// Looks up one attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All known attributes.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// The model's display name (`nm`), once reported.
    pub fn name(&self) -> Option<&str> {
        self.get("nm").and_then(Value::as_str)
    }

    /// Number of known attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if nothing is known about this model yet.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
