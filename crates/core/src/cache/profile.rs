//! Per-author profile cache.
//!
//! Avoids re-querying author metadata when rendering many records from the
//! same account. Entries carry a write timestamp and expire after a TTL;
//! the memory tier is hydrated lazily from the store on first access per
//! key, and expired entries are deleted eagerly on read.

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::store::PersistentStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default profile TTL (24 hours).
pub const DEFAULT_PROFILE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const KEY_PREFIX: &str = "profile:";

/// Author metadata attached to rendered records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// Stored value: the profile plus its write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StampedProfile {
    written_at: i64,
    #[serde(flatten)]
    profile: Profile,
}

/// TTL-bounded entity cache over memory and persistent tiers.
pub struct ProfileCache {
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
    memory: Mutex<HashMap<String, StampedProfile>>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(store, clock, DEFAULT_PROFILE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl_ms: ttl.as_millis() as i64, memory: Mutex::new(HashMap::new()) }
    }

    /// Create a cache with the TTL from the application configuration.
    pub fn from_config(store: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        Self::with_ttl(store, clock, config.profile_ttl())
    }

    fn storage_key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    fn is_fresh(&self, stamped: &StampedProfile) -> bool {
        self.clock.now_ms() - stamped.written_at <= self.ttl_ms
    }

    /// Look up a profile by entity id.
    ///
    /// Returns `None` for unknown or expired entries; expired entries are
    /// removed from both tiers on the spot.
    pub async fn get(&self, id: &str) -> Option<Profile> {
        {
            let mut memory = self.memory.lock().await;
            if let Some(stamped) = memory.get(id) {
                if self.is_fresh(stamped) {
                    return Some(stamped.profile.clone());
                }
                memory.remove(id);
            }
        }

        let key = Self::storage_key(id);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(id, error = %e, "profile read failed, treating as miss");
                return None;
            }
        };

        let stamped: StampedProfile = match serde_json::from_str(&raw) {
            Ok(stamped) => stamped,
            Err(e) => {
                tracing::debug!(id, "discarding undecodable profile: {}", e);
                return None;
            }
        };

        if !self.is_fresh(&stamped) {
            if let Err(e) = self.store.remove(&key).await {
                tracing::warn!(id, error = %e, "expired profile remove failed");
            }
            return None;
        }

        let profile = stamped.profile.clone();
        self.memory.lock().await.insert(id.to_string(), stamped);
        Some(profile)
    }

    /// Write a profile to both tiers, stamped with the current time.
    ///
    /// A persistent-tier failure is logged and absorbed; the memory copy
    /// still serves this session.
    pub async fn set(&self, id: &str, profile: Profile) {
        let stamped = StampedProfile { written_at: self.clock.now_ms(), profile };

        let raw = match serde_json::to_string(&stamped) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(id, error = %e, "profile not serializable, skipping persistent write");
                self.memory.lock().await.insert(id.to_string(), stamped);
                return;
            }
        };

        self.memory.lock().await.insert(id.to_string(), stamped);

        if let Err(e) = self.store.set(&Self::storage_key(id), &raw).await {
            tracing::warn!(id, error = %e, "profile persistent write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    fn profile(name: &str) -> Profile {
        Profile {
            username: name.to_string(),
            display_name: name.to_uppercase(),
            avatar_url: format!("https://img.test/{name}.png"),
        }
    }

    #[tokio::test]
    async fn test_set_get_within_ttl() {
        let clock = Arc::new(ManualClock::new(T0));
        let cache = ProfileCache::new(Arc::new(MemoryStore::new()), clock.clone());

        cache.set("u1", profile("alice")).await;

        clock.advance(DEFAULT_PROFILE_TTL.as_millis() as i64); // exactly at the TTL boundary
        assert_eq!(cache.get("u1").await, Some(profile("alice")));
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_and_deleted() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryStore::new());
        let cache = ProfileCache::new(store.clone(), clock.clone());

        cache.set("u1", profile("alice")).await;
        clock.advance(DEFAULT_PROFILE_TTL.as_millis() as i64 + 1);

        assert_eq!(cache.get("u1").await, None);
        // eager delete reached the persistent tier
        assert_eq!(store.get("profile:u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lazy_hydration_from_store() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryStore::new());

        // a previous session wrote the profile
        {
            let earlier = ProfileCache::new(store.clone(), clock.clone());
            earlier.set("u1", profile("alice")).await;
        }

        let cache = ProfileCache::new(store.clone(), clock.clone());
        assert_eq!(cache.get("u1").await, Some(profile("alice")));

        // now served from memory even if the store loses the key
        store.remove("profile:u1").await.unwrap();
        assert_eq!(cache.get("u1").await, Some(profile("alice")));
    }

    #[tokio::test]
    async fn test_set_refreshes_ttl() {
        let clock = Arc::new(ManualClock::new(T0));
        let cache = ProfileCache::with_ttl(Arc::new(MemoryStore::new()), clock.clone(), Duration::from_secs(60));

        cache.set("u1", profile("alice")).await;
        clock.advance(50_000);
        cache.set("u1", profile("alice2")).await;
        clock.advance(50_000);

        assert_eq!(cache.get("u1").await, Some(profile("alice2")));
    }

    #[tokio::test]
    async fn test_corrupt_stored_profile_is_miss() {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryStore::new());
        store.set("profile:u1", "][").await.unwrap();

        let cache = ProfileCache::new(store, clock);
        assert_eq!(cache.get("u1").await, None);
    }
}
