//! Per-record archive.
//!
//! Keeps every record ever seen, keyed by record id, alongside an insertion
//! -ordered id index for bulk listing and bounded cleanup. Writes merge
//! with any existing copy so partial observations (e.g. metrics seen at
//! different times) accumulate instead of clobbering each other.
//!
//! Best-effort like the rest of the cache layer: storage failures are
//! logged and absorbed.

use crate::record::{ContentRecord, Metrics};
use crate::store::PersistentStore;
use std::sync::Arc;

/// Default archive bound for [`RecordArchive::cleanup`].
pub const DEFAULT_ARCHIVE_LIMIT: usize = 1000;

const KEY_PREFIX: &str = "record:";
const IDS_KEY: &str = "record-ids";

/// Append-mostly store of individual records.
pub struct RecordArchive {
    store: Arc<dyn PersistentStore>,
}

impl RecordArchive {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    fn storage_key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    /// Store a record, merging with any existing copy of the same id.
    ///
    /// For tweets, metrics are merged field-wise (newer populated fields
    /// win); every other field takes the new value.
    pub async fn store(&self, record: &ContentRecord) {
        let id = record.id().to_string();
        let existing = self.get(&id).await;

        let merged = match (existing.as_ref(), record) {
            (Some(ContentRecord::Tweet(old)), ContentRecord::Tweet(new)) => {
                let mut tweet = new.clone();
                tweet.metrics = Metrics::merged(old.metrics, new.metrics);
                ContentRecord::Tweet(tweet)
            }
            _ => record.clone(),
        };

        let raw = match serde_json::to_string(&merged) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(id, error = %e, "record not serializable, skipping archive write");
                return;
            }
        };

        if let Err(e) = self.store.set(&Self::storage_key(&id), &raw).await {
            tracing::warn!(id, error = %e, "archive write failed");
            return;
        }

        if existing.is_none() {
            let mut ids = self.ids().await;
            if !ids.contains(&id) {
                ids.push(id.clone());
                self.write_ids(&ids).await;
            }
        }
    }

    /// Whether a record id is archived.
    pub async fn contains(&self, id: &str) -> bool {
        self.get(id).await.is_some()
    }

    /// Read an archived record. Corrupt payloads read as absent.
    pub async fn get(&self, id: &str) -> Option<ContentRecord> {
        let raw = match self.store.get(&Self::storage_key(id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(id, error = %e, "archive read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(id, "discarding undecodable archived record: {}", e);
                None
            }
        }
    }

    /// Every archived id, oldest first.
    pub async fn ids(&self) -> Vec<String> {
        let raw = match self.store.get(IDS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "archive index read failed");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::debug!("discarding undecodable archive index: {}", e);
            Vec::new()
        })
    }

    /// Every archived record, oldest first, skipping unreadable entries.
    pub async fn all(&self) -> Vec<ContentRecord> {
        let mut records = Vec::new();
        for id in self.ids().await {
            if let Some(record) = self.get(&id).await {
                records.push(record);
            }
        }
        records
    }

    /// Drop the oldest records beyond `max`, rewriting the id index.
    pub async fn cleanup(&self, max: usize) {
        let ids = self.ids().await;
        if ids.len() <= max {
            return;
        }

        let cut = ids.len() - max;
        for id in &ids[..cut] {
            if let Err(e) = self.store.remove(&Self::storage_key(id)).await {
                tracing::warn!(id, error = %e, "archive remove failed during cleanup");
            }
        }
        self.write_ids(&ids[cut..]).await;
        tracing::debug!(removed = cut, kept = max, "archive cleanup");
    }

    async fn write_ids(&self, ids: &[String]) {
        let raw = match serde_json::to_string(ids) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "archive index not serializable");
                return;
            }
        };
        if let Err(e) = self.store.set(IDS_KEY, &raw).await {
            tracing::warn!(error = %e, "archive index write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordKind, TweetRecord};
    use crate::store::MemoryStore;

    fn tweet(id: &str, metrics: Option<Metrics>) -> ContentRecord {
        ContentRecord::Tweet(TweetRecord {
            id: id.to_string(),
            text: format!("tweet {id}"),
            created_at: "2025-06-01T12:00:00Z".to_string(),
            creator_id: "u1".to_string(),
            creator_username: None,
            reply_to_id: None,
            reply_to_creator_id: None,
            kind: RecordKind::Standalone,
            metrics,
        })
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let archive = RecordArchive::new(Arc::new(MemoryStore::new()));
        let record = tweet("t1", None);

        archive.store(&record).await;

        assert!(archive.contains("t1").await);
        assert_eq!(archive.get("t1").await, Some(record));
        assert_eq!(archive.ids().await, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn test_metrics_merged_on_rewrite() {
        let archive = RecordArchive::new(Arc::new(MemoryStore::new()));

        archive
            .store(&tweet("t1", Some(Metrics { likes: Some(10), views: Some(500), ..Default::default() })))
            .await;
        archive
            .store(&tweet("t1", Some(Metrics { likes: Some(12), retweets: Some(3), ..Default::default() })))
            .await;

        let ContentRecord::Tweet(stored) = archive.get("t1").await.unwrap() else {
            panic!("expected tweet");
        };
        let metrics = stored.metrics.unwrap();
        assert_eq!(metrics.likes, Some(12));
        assert_eq!(metrics.retweets, Some(3));
        assert_eq!(metrics.views, Some(500));

        // rewrite did not duplicate the index entry
        assert_eq!(archive.ids().await, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn test_all_preserves_insertion_order() {
        let archive = RecordArchive::new(Arc::new(MemoryStore::new()));
        for i in 0..3 {
            archive.store(&tweet(&format!("t{i}"), None)).await;
        }

        let all = archive.all().await;
        let ids: Vec<&str> = all.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
    }

    #[tokio::test]
    async fn test_cleanup_drops_oldest() {
        let store = Arc::new(MemoryStore::new());
        let archive = RecordArchive::new(store.clone());
        for i in 0..5 {
            archive.store(&tweet(&format!("t{i}"), None)).await;
        }

        archive.cleanup(3).await;

        assert_eq!(archive.ids().await, vec!["t2".to_string(), "t3".to_string(), "t4".to_string()]);
        assert!(!archive.contains("t0").await);
        assert!(!archive.contains("t1").await);
        assert!(archive.contains("t4").await);
    }

    #[tokio::test]
    async fn test_cleanup_under_limit_is_noop() {
        let archive = RecordArchive::new(Arc::new(MemoryStore::new()));
        archive.store(&tweet("t1", None)).await;

        archive.cleanup(DEFAULT_ARCHIVE_LIMIT).await;
        assert_eq!(archive.ids().await, vec!["t1".to_string()]);
    }
}
