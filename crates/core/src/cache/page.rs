//! Page-level content cache.
//!
//! Single source of truth for "do we have usable content for URL X". Two
//! tiers: a bounded in-memory working set for fast repeat lookups, and the
//! persistent store as the tier of record. Losing the working set never
//! loses data; it only adds one decode on the next access.
//!
//! Failure policy: every storage error is absorbed here. Reads degrade to
//! misses, writes degrade to memory-only, and nothing propagates to fetch
//! callers.

use super::entry::CacheEntry;
use super::lru::WorkingSet;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::record::ContentRecord;
use crate::store::PersistentStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default maximum entry age before an entry is distrusted (30 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default working-set capacity.
pub const DEFAULT_CAPACITY: usize = 20;

/// Fraction of persisted entries dropped by quota recovery.
pub const DEFAULT_PRUNE_FRACTION: f64 = 0.3;

/// Storage key namespace for page entries.
const KEY_PREFIX: &str = "page:";

/// Per-tier entry counts.
///
/// The tiers are counted independently and may diverge; the divergence
/// itself is the useful diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub storage_entries: usize,
}

/// Two-tier URL-to-records cache with write-through persistence.
///
/// Keys are the exact URL string supplied by the caller; no normalization
/// is applied at this layer. Clock and store are injected so freshness and
/// quota behavior are fully testable.
pub struct PageCache {
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    max_age_ms: i64,
    working: Mutex<WorkingSet<CacheEntry>>,
}

impl PageCache {
    /// Create a cache with default capacity (20) and max age (30 days).
    pub fn new(store: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_settings(store, clock, DEFAULT_CAPACITY, DEFAULT_MAX_AGE)
    }

    /// Create a cache sized per the application configuration.
    pub fn from_config(store: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        Self::with_settings(store, clock, config.working_set_size, config.max_age())
    }

    /// Create a cache with explicit working-set capacity and max age.
    pub fn with_settings(
        store: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>, capacity: usize, max_age: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            max_age_ms: max_age.as_millis() as i64,
            working: Mutex::new(WorkingSet::new(capacity)),
        }
    }

    fn storage_key(&self, url: &str) -> String {
        format!("{KEY_PREFIX}{url}")
    }

    /// Look up the entry for a URL.
    ///
    /// Checks the working set first (marking recency); on a miss, reads and
    /// decodes the persistent tier and promotes the entry into memory. A
    /// corrupt or unreadable persisted value is a miss, not an error.
    pub async fn get(&self, url: &str) -> Option<CacheEntry> {
        {
            let mut working = self.working.lock().await;
            if let Some(entry) = working.get(url) {
                tracing::debug!(url, "working set hit");
                return Some(entry.clone());
            }
        }

        let raw = match self.store.get(&self.storage_key(url)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry = CacheEntry::decode(&raw)?;

        let mut working = self.working.lock().await;
        working.insert(url, entry.clone());
        tracing::debug!(url, "promoted entry from storage tier");
        Some(entry)
    }

    /// Store fetched records under a URL.
    ///
    /// Creates a new entry stamped with the current time and writes through
    /// to both tiers. On quota exhaustion the oldest persisted entries are
    /// pruned once and the write retried once; if that also fails, the
    /// entry survives in memory only for this session and the caller still
    /// sees success.
    pub async fn put(&self, url: &str, records: Vec<ContentRecord>) {
        let entry = CacheEntry::new(records, self.clock.now_ms());

        {
            let mut working = self.working.lock().await;
            working.insert(url, entry.clone());
        }

        let raw = match entry.encode() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(url, error = %e, "entry not serializable, skipping persistent write");
                return;
            }
        };

        let key = self.storage_key(url);
        match self.store.set(&key, &raw).await {
            Ok(()) => {}
            Err(e) if e.is_quota_exceeded() => {
                tracing::warn!(url, error = %e, "storage quota exceeded, pruning oldest entries");
                self.prune(DEFAULT_PRUNE_FRACTION).await;
                if let Err(e) = self.store.set(&key, &raw).await {
                    tracing::warn!(url, error = %e, "persistent write dropped after prune, entry is memory-only");
                }
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "persistent write failed, entry is memory-only");
            }
        }
    }

    /// Whether the entry for a URL is missing or older than the default max age.
    pub async fn is_stale(&self, url: &str) -> bool {
        self.is_stale_within(url, Duration::from_millis(self.max_age_ms as u64)).await
    }

    /// Whether the entry for a URL is missing or older than `max_age`.
    pub async fn is_stale_within(&self, url: &str, max_age: Duration) -> bool {
        match self.entry_timestamp(url).await {
            Some(ts) => self.clock.now_ms() - ts > max_age.as_millis() as i64,
            None => true,
        }
    }

    /// Timestamp of the entry for a URL, without promoting it or marking recency.
    async fn entry_timestamp(&self, url: &str) -> Option<i64> {
        {
            let working = self.working.lock().await;
            if let Some(entry) = working.peek(url) {
                return Some(entry.timestamp);
            }
        }

        let raw = self.store.get(&self.storage_key(url)).await.ok().flatten()?;
        CacheEntry::decode(&raw).map(|e| e.timestamp)
    }

    /// Delete the entry for a URL from both tiers.
    pub async fn remove(&self, url: &str) {
        {
            let mut working = self.working.lock().await;
            working.remove(url);
        }
        if let Err(e) = self.store.remove(&self.storage_key(url)).await {
            tracing::warn!(url, error = %e, "persistent remove failed");
        }
    }

    /// Empty the working set and delete every persisted page entry.
    pub async fn clear_all(&self) {
        {
            let mut working = self.working.lock().await;
            working.clear();
        }

        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "storage scan failed during clear");
                return;
            }
        };
        for key in keys.iter().filter(|k| k.starts_with(KEY_PREFIX)) {
            if let Err(e) = self.store.remove(key).await {
                tracing::warn!(key, error = %e, "persistent remove failed during clear");
            }
        }
    }

    /// Count entries in each tier independently.
    pub async fn stats(&self) -> CacheStats {
        let memory_entries = self.working.lock().await.len();
        let storage_entries = match self.store.keys().await {
            Ok(keys) => keys.iter().filter(|k| k.starts_with(KEY_PREFIX)).count(),
            Err(e) => {
                tracing::warn!(error = %e, "storage scan failed during stats");
                0
            }
        };
        CacheStats { memory_entries, storage_entries }
    }

    /// Delete the oldest `fraction` of persisted entries (at least one).
    ///
    /// Entries are ordered by timestamp, oldest first; ties keep scan order
    /// (stable sort). Unreadable entries sort as oldest and are reclaimed
    /// first. Pruned keys are also evicted from the working set. Used as
    /// quota-exceeded recovery, never on a schedule; partial completion on
    /// error is acceptable.
    ///
    /// Returns the number of entries removed.
    pub async fn prune(&self, fraction: f64) -> usize {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "storage scan failed during prune");
                return 0;
            }
        };

        let mut aged: Vec<(String, i64)> = Vec::new();
        for key in keys.into_iter().filter(|k| k.starts_with(KEY_PREFIX)) {
            let timestamp = match self.store.get(&key).await {
                Ok(Some(raw)) => CacheEntry::decode(&raw).map(|e| e.timestamp).unwrap_or(0),
                _ => 0,
            };
            aged.push((key, timestamp));
        }
        if aged.is_empty() {
            return 0;
        }

        aged.sort_by_key(|(_, timestamp)| *timestamp);
        let count = ((aged.len() as f64 * fraction).floor() as usize).max(1);

        let mut removed = 0;
        for (key, _) in aged.into_iter().take(count) {
            if let Err(e) = self.store.remove(&key).await {
                tracing::warn!(key, error = %e, "persistent remove failed during prune");
                continue;
            }
            let url = &key[KEY_PREFIX.len()..];
            self.working.lock().await.remove(url);
            removed += 1;
        }

        tracing::debug!(removed, "pruned oldest page entries");
        removed
    }
}
