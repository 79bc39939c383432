//! Values module provides the typed layer over the tree engine.
//!
//! Callers store any [`Storable`] type under a flat string key, choosing
//! per call whether the entry is persistent (serialized into the tree
//! under a reserved top-level namespace) or ephemeral (held in a separate
//! in-memory map that bypasses the tree and the backend entirely). The two
//! stores share no keys and no invariants.

use crate::Result;
use crate::backend::FlatBackend;
use crate::constants::VALUE_NAMESPACE;
use crate::encryption::EncryptionProvider;
use crate::path::TreePath;
use crate::store::TreeStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Marker trait for types that can be stored through a [`ValueStore`].
///
/// Requires `Serialize` and `Deserialize` for conversion to and from the
/// stored string form. Implement this for any type you wish to store,
/// typically alongside `serde::Serialize` and `serde::Deserialize`.
pub trait Storable: Serialize + for<'de> Deserialize<'de> {}

impl Storable for String {}
impl Storable for bool {}
impl Storable for i64 {}
impl Storable for u64 {}
impl Storable for f64 {}
impl<T: Storable> Storable for Vec<T> {}
impl<T: Storable> Storable for Option<T> {}

/// Typed key-value facade routing entries to the tree or an ephemeral map.
pub struct ValueStore {
    tree: TreeStore,
    ephemeral: Mutex<HashMap<String, String>>,
}

impl ValueStore {
    /// Creates a value store over a backend with no encryption.
    pub fn new(backend: Box<dyn FlatBackend>) -> Self {
        Self {
            tree: TreeStore::new(backend),
            ephemeral: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a value store whose tree encrypts through `provider`.
    ///
    /// Ephemeral entries never touch the backend and are not encrypted.
    pub fn with_encryption(
        backend: Box<dyn FlatBackend>,
        provider: Box<dyn EncryptionProvider>,
    ) -> Self {
        Self {
            tree: TreeStore::with_encryption(backend, provider),
            ephemeral: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying tree engine, for hierarchical access and change
    /// subscriptions.
    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    fn key_path(&self, key: &str) -> Result<TreePath> {
        TreePath::new([VALUE_NAMESPACE, key])
    }

    /// Stores a value under the key.
    pub fn set<T: Storable>(&self, key: &str, value: &T, persistent: bool) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        if persistent {
            self.tree.set_value(&self.key_path(key)?, &serialized)
        } else {
            self.ephemeral.lock().insert(key.to_string(), serialized);
            Ok(())
        }
    }

    /// Retrieves the value stored under the key, if any.
    pub fn get<T: Storable>(&self, key: &str, persistent: bool) -> Result<Option<T>> {
        let raw = if persistent {
            self.tree.get_value(&self.key_path(key)?)?
        } else {
            self.ephemeral.lock().get(key).cloned()
        };
        match raw {
            Some(serialized) => Ok(Some(serde_json::from_str(&serialized)?)),
            None => Ok(None),
        }
    }

    /// Removes the entry under the key. Removing an absent key is a no-op.
    pub fn remove(&self, key: &str, persistent: bool) -> Result<()> {
        if persistent {
            self.tree.delete(&self.key_path(key)?)
        } else {
            self.ephemeral.lock().remove(key);
            Ok(())
        }
    }

    /// Whether an entry is stored under the key.
    pub fn contains_key(&self, key: &str, persistent: bool) -> Result<bool> {
        if persistent {
            self.tree.contains(&self.key_path(key)?)
        } else {
            Ok(self.ephemeral.lock().contains_key(key))
        }
    }
}
