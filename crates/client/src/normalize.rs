//! Record normalization.
//!
//! Raw index rows become [`ContentRecord`]s here: shortened links in the
//! text are rewritten to their expanded form, every observed expansion is
//! fed into the shared [`LinkCache`], and each record is classified by its
//! conversation role. Classification is pure and deterministic for a given
//! row and link set.

use crate::index::response::{PageLinkRow, TweetRow};
use regex::Regex;
use sideline_core::cache::LinkCache;
use sideline_core::record::{ContentRecord, RecordKind, TweetRecord};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Matches links to an individual tweet's permalink page.
fn status_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(twitter\.com|x\.com)/\w+/status/\d+").unwrap())
}

/// Classify a tweet by its conversation role.
///
/// Order matters: an `RT @` prefix wins over reply fields, and the
/// quote-retweet upgrade applies only to otherwise standalone tweets whose
/// expanded links point at another tweet.
pub fn classify(
    text: &str, reply_to_id: Option<&str>, reply_to_creator_id: Option<&str>, creator_id: &str,
    expanded_links: &[&str],
) -> RecordKind {
    if text.starts_with("RT @") {
        return RecordKind::Retweet;
    }

    if reply_to_id.is_some() {
        if reply_to_creator_id == Some(creator_id) {
            return RecordKind::SelfReply;
        }
        return RecordKind::Reply;
    }

    if expanded_links.iter().any(|link| status_url_re().is_match(link)) {
        return RecordKind::QuoteRetweet;
    }

    RecordKind::Standalone
}

/// Rewrite shortened links in record text to their expanded form.
///
/// The match tolerates trailing punctuation glued to the link, which the
/// expanded URL replaces along with it.
fn rewrite_short_links(text: &str, links: &[&PageLinkRow]) -> String {
    let mut rewritten = text.to_string();
    for link in links {
        if link.expanded_url.is_empty() || link.url == link.expanded_url || !rewritten.contains(&link.url) {
            continue;
        }
        let pattern = format!("{}[.,;:]*", regex::escape(&link.url));
        match Regex::new(&pattern) {
            Ok(re) => {
                rewritten = re
                    .replace_all(&rewritten, regex::NoExpand(&link.expanded_url))
                    .into_owned();
            }
            Err(e) => {
                tracing::debug!(url = %link.url, "skipping unrewritable link: {}", e);
            }
        }
    }
    rewritten
}

/// Turn index rows into normalized records.
///
/// Every `(url, expanded_url)` pair observed here is inserted into the
/// link cache, so later render passes can expand links without another
/// lookup.
pub fn normalize_tweets(rows: Vec<TweetRow>, links: &[PageLinkRow], cache: &LinkCache) -> Vec<ContentRecord> {
    let mut by_record: HashMap<&str, Vec<&PageLinkRow>> = HashMap::new();
    for link in links {
        cache.insert(&link.url, &link.expanded_url);
        by_record.entry(link.record_id.as_str()).or_default().push(link);
    }

    rows.into_iter()
        .map(|row| {
            let row_links = by_record.get(row.record_id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let expanded: Vec<&str> = row_links
                .iter()
                .filter(|l| !l.expanded_url.is_empty())
                .map(|l| l.expanded_url.as_str())
                .collect();

            let kind = classify(
                &row.text,
                row.reply_to_id.as_deref(),
                row.reply_to_creator_id.as_deref(),
                &row.creator_id,
                &expanded,
            );
            let text = rewrite_short_links(&row.text, row_links);
            let metrics = row.metrics();

            ContentRecord::Tweet(TweetRecord {
                id: row.record_id,
                text,
                created_at: row.created_at,
                creator_id: row.creator_id,
                creator_username: row.creator_username,
                reply_to_id: row.reply_to_id,
                reply_to_creator_id: row.reply_to_creator_id,
                kind,
                metrics,
            })
        })
        .collect()
}
