//!
//! Canopy: local, hierarchical key-value persistence with tree semantics
//! on top of an arbitrary flat (key -> string) backing store.
//!
//! ## Core Concepts
//!
//! Canopy is built around several key concepts:
//!
//! * **Paths (`path::TreePath`)**: An ordered sequence of non-empty string segments addressing one node in the tree.
//! * **Records (`record::Record`)**: The persisted form of a node — a scalar `Value` or a `Container` listing child segments.
//! * **Backends (`backend::FlatBackend`)**: A pluggable flat string store that all tree data is persisted into.
//! * **TreeStore (`store::TreeStore`)**: The core engine providing set/get/delete, children listing, and recursive traversal with hierarchical locking.
//! * **ChangeDispatcher (`notify::ChangeDispatcher`)**: Asynchronous, coalesced change notifications for mutated paths.
//! * **ValueStore (`values::ValueStore`)**: A thin typed layer that serializes `Storable` types into the tree, or into a separate ephemeral map.
//!
//! A path resolves to either a scalar value or a container of child segments.
//! Writing a value materializes any missing ancestors as containers; deleting
//! the last child of a container removes the container itself, recursively
//! toward the root, so the tree never holds an empty container.

pub mod adapter;
pub mod backend;
pub mod constants;
pub mod encryption;
pub mod lock;
pub mod notify;
pub mod path;
pub mod record;
pub mod store;
pub mod values;

/// Re-export the core types for easier access.
pub use path::TreePath;
pub use record::NodeKind;
pub use store::TreeStore;
pub use values::ValueStore;

/// Result type used throughout the Canopy library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Canopy library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path or segment failed validation (empty path, empty segment).
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The configured encryption provider produced no output for a
    /// non-empty input. This never degrades to "no encryption".
    #[error("Encryption configuration error: {0}")]
    EncryptionConfig(String),

    /// A persisted record failed to decode. The backing store was mutated
    /// outside this engine's invariants; masking this would lose data.
    #[error("Structural corruption: {0}")]
    Corruption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
