//! Host-held per-unit memory.
//!
//! Callbacks keep no state of their own between turns. Anything a unit
//! needs to remember lives here: the host creates the store when the unit
//! spawns, hands the callback a working copy each turn, and commits the
//! copy back only when the turn returns normally.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key/value store of JSON values owned by the host for one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitMemory {
    entries: BTreeMap<String, Value>,
}

impl UnitMemory {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Value under `key` decoded as `T`. `None` if absent or of another shape.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Store `value` under `key`, returning the previous raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Option<Value>, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        Ok(self.entries.insert(key.into(), value))
    }

    /// Remove `key`, returning its raw value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys and raw values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}
