//! Content record data model.
//!
//! Records are the unit of fetched content associated with a page URL. The
//! schema is an explicitly tagged enum per content source: anything persisted
//! is validated against it on decode, and a mismatch is treated as a cache
//! miss rather than an error.

use serde::{Deserialize, Serialize};

/// A unit of related content fetched for a page URL.
///
/// The `source` tag selects the per-source payload schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ContentRecord {
    Tweet(TweetRecord),
    Note(NoteRecord),
}

impl ContentRecord {
    /// Stable identifier of the record within its source.
    pub fn id(&self) -> &str {
        match self {
            ContentRecord::Tweet(t) => &t.id,
            ContentRecord::Note(n) => &n.id,
        }
    }

    /// Display text of the record.
    pub fn text(&self) -> &str {
        match self {
            ContentRecord::Tweet(t) => &t.text,
            ContentRecord::Note(n) => &n.text,
        }
    }
}

/// A tweet-shaped record from the content index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetRecord {
    pub id: String,
    pub text: String,
    /// RFC 3339 creation time as reported by the index.
    pub created_at: String,
    pub creator_id: String,
    #[serde(default)]
    pub creator_username: Option<String>,
    #[serde(default)]
    pub reply_to_id: Option<String>,
    #[serde(default)]
    pub reply_to_creator_id: Option<String>,
    pub kind: RecordKind,
    #[serde(default)]
    pub metrics: Option<Metrics>,
}

/// A note search hit from a local vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    pub text: String,
    pub path: String,
    #[serde(default)]
    pub vault: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub score: f64,
}

/// Classification of a record relative to its conversation context.
///
/// Assigned once at normalization time from record fields and expanded
/// links; deterministic for a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Standalone,
    Reply,
    SelfReply,
    Retweet,
    QuoteRetweet,
}

/// Optional engagement counters attached to a tweet record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub replies: Option<u64>,
    #[serde(default)]
    pub retweets: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub views: Option<u64>,
}

impl Metrics {
    /// Merge newer counters over older ones, field-wise.
    ///
    /// A populated field on `newer` wins; a missing field keeps the older
    /// value, so partial observations accumulate instead of erasing.
    pub fn merged(older: Option<Metrics>, newer: Option<Metrics>) -> Option<Metrics> {
        match (older, newer) {
            (None, None) => None,
            (Some(m), None) | (None, Some(m)) => Some(m),
            (Some(old), Some(new)) => Some(Metrics {
                replies: new.replies.or(old.replies),
                retweets: new.retweets.or(old.retweets),
                likes: new.likes.or(old.likes),
                views: new.views.or(old.views),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(id: &str) -> TweetRecord {
        TweetRecord {
            id: id.to_string(),
            text: "hello".to_string(),
            created_at: "2025-06-01T12:00:00Z".to_string(),
            creator_id: "u1".to_string(),
            creator_username: None,
            reply_to_id: None,
            reply_to_creator_id: None,
            kind: RecordKind::Standalone,
            metrics: None,
        }
    }

    #[test]
    fn test_record_id_accessor() {
        let record = ContentRecord::Tweet(tweet("t1"));
        assert_eq!(record.id(), "t1");
        assert_eq!(record.text(), "hello");
    }

    #[test]
    fn test_tagged_roundtrip() {
        let record = ContentRecord::Tweet(tweet("t1"));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"source\":\"tweet\""));

        let back: ContentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_untagged_payload_rejected() {
        // A bare tweet payload without the source tag must not decode.
        let json = serde_json::to_string(&tweet("t1")).unwrap();
        assert!(serde_json::from_str::<ContentRecord>(&json).is_err());
    }

    #[test]
    fn test_metrics_merge_field_wise() {
        let old = Metrics { replies: Some(1), retweets: Some(2), likes: None, views: Some(9) };
        let new = Metrics { replies: Some(5), retweets: None, likes: Some(3), views: None };

        let merged = Metrics::merged(Some(old), Some(new)).unwrap();
        assert_eq!(merged.replies, Some(5)); // newer wins
        assert_eq!(merged.retweets, Some(2)); // older kept
        assert_eq!(merged.likes, Some(3));
        assert_eq!(merged.views, Some(9));
    }

    #[test]
    fn test_metrics_merge_one_sided() {
        let m = Metrics { likes: Some(7), ..Default::default() };
        assert_eq!(Metrics::merged(None, Some(m)), Some(m));
        assert_eq!(Metrics::merged(Some(m), None), Some(m));
        assert_eq!(Metrics::merged(None, None), None);
    }
}
