//! In-process store implementation.
//!
//! Backs tests and ephemeral sessions with the same interface and quota
//! behavior as the durable store, so quota-recovery paths can be exercised
//! without a database file.

use super::{PersistentStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// HashMap-backed store with an optional byte quota.
///
/// Usage is accounted as the sum of key and value lengths, mirroring how
/// browser-style storage charges string payloads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self { entries: RwLock::new(HashMap::new()), quota_bytes: Some(quota_bytes) }
    }

    /// Current accounted usage in bytes.
    pub async fn used_bytes(&self) -> u64 {
        let entries = self.entries.read().await;
        entries.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;

        if let Some(quota) = self.quota_bytes {
            let used: u64 = entries.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum();
            let existing = entries
                .get(key)
                .map(|v| (key.len() + v.len()) as u64)
                .unwrap_or(0);
            let needed = used - existing + (key.len() + value.len()) as u64;
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        // removing again is fine
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_lists_everything() {
        let store = MemoryStore::new();
        store.set("page:a", "1").await.unwrap();
        store.set("profile:b", "2").await.unwrap();

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["page:a".to_string(), "profile:b".to_string()]);
    }

    #[tokio::test]
    async fn test_quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(10);
        store.set("ab", "cd").await.unwrap(); // 4 bytes

        let err = store.set("key", "too-long").await.unwrap_err();
        assert!(err.is_quota_exceeded());

        // the failed write must not have landed
        assert_eq!(store.get("key").await.unwrap(), None);
        assert_eq!(store.used_bytes().await, 4);
    }

    #[tokio::test]
    async fn test_quota_replacement_frees_old_value() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345678").await.unwrap(); // 9 bytes used

        // replacing the same key is charged against the freed space
        store.set("k", "123456789").await.unwrap(); // 10 bytes used
        assert!(store.set("k", "1234567890").await.unwrap_err().is_quota_exceeded());
    }
}
