//! Store client contract.
//!
//! # Data Flow
//! ```text
//! ConfigManager
//!     → ConfigStore::read(key)        (initial read, refresh reads)
//!     → ConfigStore::watch(prefix)    (one long-lived stream per group)
//!         → Vec<WatchEvent> batches until the store is closed
//!     → ConfigStore::close()          (ends every outstanding watch stream)
//! ```
//!
//! # Design Decisions
//! - The manager only consumes this contract; wire protocols live in the backends
//! - A watch stream ends (yields `None`) exactly when the store is closed
//! - Backends: `memory` (in-process) and `etcd` (behind the `etcd` feature)

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod memory;

#[cfg(feature = "etcd")]
pub mod etcd;

pub use memory::MemoryStore;

#[cfg(feature = "etcd")]
pub use etcd::EtcdStore;

/// Kind of change reported by a watch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// Key was inserted or updated.
    Put,
    /// Key was deleted.
    Delete,
}

/// A single key change under a watched prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// The key that changed.
    pub key: String,
    /// The new value (empty for deletes).
    pub value: Vec<u8>,
    /// Type of change.
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn put(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind: WatchEventKind::Put,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            kind: WatchEventKind::Delete,
        }
    }
}

/// Stream of change batches. Yields `None` once the store has been closed.
pub type WatchStream = mpsc::UnboundedReceiver<Vec<WatchEvent>>;

/// Errors surfaced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("key not found: {0}")]
    NotFound(String),

    /// Could not reach the store.
    #[error("connection error: {0}")]
    Connection(String),

    /// The store has already been closed.
    #[error("store is closed")]
    Closed,

    /// Backend-specific request failure.
    #[error("store request failed: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Capability the manager needs from a remote, watchable key-value store.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Point read of one key's raw bytes.
    async fn read(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Open a long-lived watch on every key starting with `prefix`.
    async fn watch(&self, prefix: &str) -> StoreResult<WatchStream>;

    /// Close the connection. Every outstanding watch stream ends.
    async fn close(&self) -> StoreResult<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
