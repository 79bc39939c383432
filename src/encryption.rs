//! Encryption module defines the optional at-rest encryption boundary.
//!
//! When a provider is configured, the [`BackendAdapter`](crate::adapter::BackendAdapter)
//! encrypts every encoded path key before touching the backend and encrypts
//! values on write / decrypts them on read. The tree engine never sees
//! ciphertext and the backend never sees plaintext.

/// Provider trait for encrypting and decrypting stored strings.
///
/// Implementations must be deterministic on keys (the same plaintext key
/// must always encrypt to the same stored key) or lookups cannot work.
/// Returning `None` signals failure; the adapter treats `None` (or an
/// empty string for a non-empty input) as a fatal configuration error
/// rather than silently degrading to plaintext.
pub trait EncryptionProvider: Send + Sync {
    /// Encrypt a plaintext string for storage.
    fn encrypt(&self, plaintext: &str) -> Option<String>;

    /// Decrypt a stored string back to plaintext.
    fn decrypt(&self, ciphertext: &str) -> Option<String>;
}
