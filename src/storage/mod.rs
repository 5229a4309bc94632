//! Durable key-value storage and the persistence adapter.
//!
//! The engine persists two entries: the point list (one JSON array) and the
//! background image blob. Both go through the [`KeyValueStorage`] trait so
//! hosts can supply their own backing store; [`MemoryStorage`] covers tests
//! and ephemeral sessions, [`FileStorage`] is the default durable store.

mod adapter;
mod file;
mod memory;

pub use adapter::PersistenceAdapter;
pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error reading or writing the backing store
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error for a stored entry
    #[error("storage serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// No usable storage location on this system
    #[error("no storage location available: {0}")]
    Unavailable(String),
}

/// Byte-valued key-value storage.
///
/// Keys are short, fixed names chosen by the engine. Implementations must
/// return `Ok(None)` for absent keys rather than an error.
pub trait KeyValueStorage {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove the value stored under `key`. Removing an absent key is a no-op.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}
