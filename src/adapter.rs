//! Adapter module funnels every tree access to the flat backend.
//!
//! The adapter owns the injected [`FlatBackend`] behind a mutex and applies
//! the optional [`EncryptionProvider`] on every access: encoded path keys
//! are encrypted before any backend call, values are encrypted on write and
//! decrypted on read. No code path in the engine reads or writes the
//! backend except through here, under a held hierarchy lock.

use crate::backend::FlatBackend;
use crate::encryption::EncryptionProvider;
use crate::path::TreePath;
use crate::{Error, Result};
use parking_lot::{Mutex, MutexGuard};

/// Thin layer applying path encoding and optional encryption to an
/// injected flat store.
pub struct BackendAdapter {
    backend: Mutex<Box<dyn FlatBackend>>,
    encryption: Option<Box<dyn EncryptionProvider>>,
}

impl BackendAdapter {
    /// Creates an adapter over a backend with no encryption.
    pub fn new(backend: Box<dyn FlatBackend>) -> Self {
        Self {
            backend: Mutex::new(backend),
            encryption: None,
        }
    }

    /// Creates an adapter that encrypts keys and values through `provider`.
    pub fn with_encryption(
        backend: Box<dyn FlatBackend>,
        provider: Box<dyn EncryptionProvider>,
    ) -> Self {
        Self {
            backend: Mutex::new(backend),
            encryption: Some(provider),
        }
    }

    /// Whether an encryption provider is configured.
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    /// Direct access to the wrapped backend.
    ///
    /// Intended for setup and inspection (snapshots, diagnostics); the
    /// engine itself only touches the backend through the adapter's typed
    /// accessors under a hierarchy lock. Anything written here raw is
    /// subject to the corruption checks on the next decode.
    pub fn backend(&self) -> MutexGuard<'_, Box<dyn FlatBackend>> {
        self.backend.lock()
    }

    /// Encodes a path into the key actually used against the backend.
    ///
    /// A configured provider returning `None` or an empty string for the
    /// (never empty) encoded key fails fast as a configuration error.
    fn storage_key(&self, path: &TreePath) -> Result<String> {
        let key = path.encode();
        match &self.encryption {
            None => Ok(key),
            Some(provider) => match provider.encrypt(&key) {
                Some(encrypted) if !encrypted.is_empty() => Ok(encrypted),
                _ => Err(Error::EncryptionConfig(format!(
                    "provider produced no ciphertext for key of {path}"
                ))),
            },
        }
    }

    fn encrypt_value(&self, value: &str) -> Result<String> {
        match &self.encryption {
            None => Ok(value.to_string()),
            Some(provider) => provider.encrypt(value).ok_or_else(|| {
                Error::EncryptionConfig("provider produced no ciphertext for a value".to_string())
            }),
        }
    }

    fn decrypt_value(&self, stored: &str) -> Result<String> {
        match &self.encryption {
            None => Ok(stored.to_string()),
            Some(provider) => provider.decrypt(stored).ok_or_else(|| {
                Error::EncryptionConfig("provider failed to decrypt a stored value".to_string())
            }),
        }
    }

    /// Whether any record is stored at the path.
    pub fn contains(&self, path: &TreePath) -> Result<bool> {
        let key = self.storage_key(path)?;
        Ok(self.backend.lock().contains_key(&key))
    }

    /// Reads the raw record stored at the path, if any.
    pub fn get(&self, path: &TreePath) -> Result<Option<String>> {
        let key = self.storage_key(path)?;
        let stored = self.backend.lock().get(&key);
        match stored {
            Some(value) => Ok(Some(self.decrypt_value(&value)?)),
            None => Ok(None),
        }
    }

    /// Writes a raw record at the path, replacing any previous record.
    pub fn set(&self, path: &TreePath, value: &str) -> Result<()> {
        let key = self.storage_key(path)?;
        let stored = self.encrypt_value(value)?;
        self.backend.lock().set(&key, &stored);
        Ok(())
    }

    /// Removes the record at the path. Removing an absent record is a no-op.
    pub fn delete(&self, path: &TreePath) -> Result<()> {
        let key = self.storage_key(path)?;
        self.backend.lock().delete(&key);
        Ok(())
    }
}
