//! Cache entry codec.
//!
//! Entries are serialized to JSON for the string-valued store. Decode is
//! deliberately forgiving at the call site: a corrupt or schema-mismatched
//! value yields `None` (a cache miss), never an error.

use crate::record::ContentRecord;
use serde::{Deserialize, Serialize};

/// An immutable snapshot of fetched records for one URL.
///
/// A refresh produces a new entry with a new timestamp; records are never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Records as returned by the source, most-recent-first by convention.
    pub records: Vec<ContentRecord>,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(records: Vec<ContentRecord>, timestamp: i64) -> Self {
        Self { records, timestamp }
    }

    /// Age of this entry relative to `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    /// Serialize for the persistent store.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a stored value.
    ///
    /// Returns `None` on malformed JSON or schema mismatch; the caller
    /// treats that as an absent entry.
    pub fn decode(raw: &str) -> Option<CacheEntry> {
        match serde_json::from_str(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("discarding undecodable cache entry: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ContentRecord, RecordKind, TweetRecord};

    fn sample_records() -> Vec<ContentRecord> {
        vec![ContentRecord::Tweet(TweetRecord {
            id: "t1".to_string(),
            text: "a tweet".to_string(),
            created_at: "2025-06-01T12:00:00Z".to_string(),
            creator_id: "u1".to_string(),
            creator_username: Some("user".to_string()),
            reply_to_id: None,
            reply_to_creator_id: None,
            kind: RecordKind::Standalone,
            metrics: None,
        })]
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let entry = CacheEntry::new(sample_records(), 1_700_000_000_000);
        let raw = entry.encode().unwrap();

        let back = CacheEntry::decode(&raw).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(CacheEntry::decode("not json at all").is_none());
        assert!(CacheEntry::decode("{\"records\":").is_none());
    }

    #[test]
    fn test_decode_schema_mismatch() {
        // valid JSON, wrong shape
        assert!(CacheEntry::decode("{\"items\":[],\"ts\":1}").is_none());
        // record without a source tag
        assert!(CacheEntry::decode("{\"records\":[{\"id\":\"x\"}],\"timestamp\":1}").is_none());
    }

    #[test]
    fn test_age() {
        let entry = CacheEntry::new(vec![], 1_000);
        assert_eq!(entry.age_ms(4_000), 3_000);
        assert_eq!(entry.age_ms(500), -500);
    }
}
