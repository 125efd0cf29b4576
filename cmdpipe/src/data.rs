//! String-keyed data stores threaded through the pipeline.
//!
//! Every [`ExecutionContext`](crate::context::ExecutionContext) carries two
//! independent stores:
//!
//! - **shared data** lives as long as the executor and is visible to every
//!   invocation made through it
//! - **pipeline data** is created fresh for one invocation and dropped when
//!   that invocation returns
//!
//! Values are `serde_json::Value`. A key stored with `Value::Null` is present;
//! only a key that was never set (or was removed) is absent.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{DataError, DataResult};

/// Thread-safe mutable map from string keys to JSON values.
///
/// Writes take `&self`, so a store can be shared through an `Arc` by
/// concurrent invocations. The store only guarantees that each individual
/// operation is atomic; callers that need read-modify-write consistency
/// across invocations must coordinate themselves.
#[derive(Debug, Default)]
pub struct DataStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl DataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Whether `key` is present, including when its value is `null`.
    pub fn exists(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns the value stored under `key`.
    ///
    /// Fails with [`DataError::NotFound`] when the key is absent.
    pub fn get(&self, key: &str) -> DataResult<Value> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| DataError::NotFound {
                key: key.to_string(),
            })
    }

    /// Returns the value stored under `key`, or `None` when absent.
    pub fn get_or_default(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Returns the value stored under `key` converted into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> DataResult<T> {
        let value = self.get(key)?;
        serde_json::from_value(value).map_err(|e| DataError::Deserialization {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Inserts or replaces the value stored under `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set_serialized<T: Serialize>(&self, key: impl Into<String>, value: &T) -> DataResult<()> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| DataError::Serialization {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.entries.write().insert(key, value);
        Ok(())
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// Removing an absent key is a no-op.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.write().remove(key)
    }

    /// Returns a point-in-time copy of every entry.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.read().clone()
    }

    /// Number of keys currently present.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
