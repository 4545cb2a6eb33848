//! Persistent key-value storage abstraction.
//!
//! The cache tiers treat durable storage as a collaborator with four
//! operations: `get`, `set`, `remove`, `keys`. Two implementations are
//! provided:
//!
//! - [`SqliteStore`]: durable, SQLite-backed via tokio-rusqlite
//! - [`MemoryStore`]: in-process, for tests and ephemeral sessions
//!
//! Both enforce an optional byte quota on `set`, surfacing exhaustion as
//! [`StoreError::QuotaExceeded`] so callers can run recovery (prune) and
//! retry.

pub mod memory;
mod migrations;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

/// Errors from the persistent store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The write would push usage past the configured byte budget.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} byte budget")]
    QuotaExceeded { needed: u64, quota: u64 },

    /// Backend failure (I/O, corruption, closed connection).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Schema migration failed to apply.
    #[error("migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether this error is the quota-exhaustion signal.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

impl From<tokio_rusqlite::rusqlite::Error> for StoreError {
    fn from(err: tokio_rusqlite::rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<tokio_rusqlite::Error<StoreError>> for StoreError {
    fn from(err: tokio_rusqlite::Error<StoreError>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => StoreError::Backend("connection closed".to_string()),
            tokio_rusqlite::Error::Close(_) => StoreError::Backend("connection close failed".to_string()),
            _ => StoreError::Backend("connection closed".to_string()),
        }
    }
}

impl From<tokio_rusqlite::Error<tokio_rusqlite::rusqlite::Error>> for StoreError {
    fn from(err: tokio_rusqlite::Error<tokio_rusqlite::rusqlite::Error>) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Durable key-value store shared by every cache tier.
///
/// Values are opaque strings (JSON by convention). Keys are namespaced by
/// the caller with a prefix such as `page:` or `profile:`; `keys` returns
/// every known key so callers can scan their own namespace for stats and
/// pruning.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is unknown.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// Fails with [`StoreError::QuotaExceeded`] when the write would exceed
    /// the store's byte budget.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Removing an unknown key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Every key currently present, in unspecified order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_predicate() {
        let err = StoreError::QuotaExceeded { needed: 100, quota: 50 };
        assert!(err.is_quota_exceeded());
        assert!(err.to_string().contains("100"));

        let err = StoreError::Backend("disk on fire".to_string());
        assert!(!err.is_quota_exceeded());
    }
}
