//! Content index wire types.
//!
//! Rows come back as JSON arrays from the `page_links` and `records`
//! endpoints. Unknown fields are ignored; optional fields default so a
//! sparse row still decodes.

use serde::Deserialize;
use sideline_core::record::Metrics;

/// A link row: one record that referenced the page URL.
#[derive(Debug, Clone, Deserialize)]
pub struct PageLinkRow {
    pub record_id: String,
    /// The link exactly as it appeared in the record text (often a
    /// shortener URL).
    pub url: String,
    /// The resolved target of `url`; empty when the index could not
    /// expand it.
    #[serde(default)]
    pub expanded_url: String,
}

/// A full tweet row from the `records` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TweetRow {
    pub record_id: String,
    pub text: String,
    pub created_at: String,
    pub creator_id: String,
    #[serde(default)]
    pub creator_username: Option<String>,
    #[serde(default)]
    pub reply_to_id: Option<String>,
    #[serde(default)]
    pub reply_to_creator_id: Option<String>,
    #[serde(default)]
    pub reply_count: Option<u64>,
    #[serde(default)]
    pub retweet_count: Option<u64>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub view_count: Option<u64>,
}

impl TweetRow {
    /// Engagement counters, or `None` when the row carried none at all.
    pub fn metrics(&self) -> Option<Metrics> {
        if self.reply_count.is_none()
            && self.retweet_count.is_none()
            && self.like_count.is_none()
            && self.view_count.is_none()
        {
            return None;
        }
        Some(Metrics {
            replies: self.reply_count,
            retweets: self.retweet_count,
            likes: self.like_count,
            views: self.view_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_row_decodes_sparse() {
        let row: PageLinkRow =
            serde_json::from_str(r#"{"record_id":"t1","url":"https://t.co/abc"}"#).unwrap();
        assert_eq!(row.record_id, "t1");
        assert_eq!(row.expanded_url, "");
    }

    #[test]
    fn test_tweet_row_decodes_full() {
        let row: TweetRow = serde_json::from_str(
            r#"{
                "record_id": "t1",
                "text": "hello",
                "created_at": "2025-06-01T12:00:00Z",
                "creator_id": "u1",
                "creator_username": "alice",
                "reply_to_id": "t0",
                "reply_to_creator_id": "u2",
                "like_count": 4,
                "view_count": 900,
                "unknown_field": true
            }"#,
        )
        .unwrap();

        assert_eq!(row.reply_to_id.as_deref(), Some("t0"));
        let metrics = row.metrics().unwrap();
        assert_eq!(metrics.likes, Some(4));
        assert_eq!(metrics.views, Some(900));
        assert_eq!(metrics.replies, None);
    }

    #[test]
    fn test_tweet_row_without_counters_has_no_metrics() {
        let row: TweetRow = serde_json::from_str(
            r#"{"record_id":"t1","text":"hi","created_at":"2025-06-01T00:00:00Z","creator_id":"u1"}"#,
        )
        .unwrap();
        assert!(row.metrics().is_none());
    }
}
