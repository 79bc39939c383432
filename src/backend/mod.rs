use std::any::Any;

mod in_memory;

pub use in_memory::InMemoryBackend;

/// Backend trait abstracting the flat persistent store under the tree.
///
/// The tree engine only ever sees opaque string keys and string values;
/// all structure lives in the records it writes. Implementations are not
/// required to synchronize: every access from the engine happens through
/// the [`BackendAdapter`](crate::adapter::BackendAdapter) under an active
/// hierarchy lock.
pub trait FlatBackend: Send + Sync + Any {
    /// Whether a value is stored under the key.
    fn contains_key(&self, key: &str) -> bool;

    /// Get the value stored under the key, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value under the key, replacing any previous value.
    fn set(&mut self, key: &str, value: &str);

    /// Remove the key and its value. Removing an absent key is a no-op.
    fn delete(&mut self, key: &str);

    /// Get a reference to self as Any
    fn as_any(&self) -> &dyn Any;
}
