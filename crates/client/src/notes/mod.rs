//! Local notes-search client.
//!
//! Searches a locally running notes vault API (REST, bearer auth) for
//! notes related to the current page. The page URL is reduced to keywords
//! for the search query.
//!
//! A local companion app being closed is routine, so failures here are
//! absorbed to an empty result instead of surfacing as an error state, and
//! a cooldown stops the client from hammering a dead endpoint on every
//! URL change.

use crate::source::{ContentSource, SourceError};
use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use sideline_core::record::{ContentRecord, NoteRecord};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default local notes API endpoint.
const DEFAULT_ENDPOINT: &str = "http://localhost:27124";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait after a connection failure before retrying.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Characters of surrounding context requested per search hit.
const CONTEXT_LENGTH: u32 = 100;

/// Notes client configuration.
#[derive(Debug, Clone)]
pub struct NotesConfig {
    /// Local API endpoint (default: http://localhost:27124).
    pub endpoint: String,
    /// Bearer token for the local API; lookups are skipped when unset.
    pub api_key: Option<String>,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// Wait after a connection failure before retrying (default: 30s).
    pub cooldown: Duration,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Tracks the last connection failure so lookups can short-circuit while
/// the endpoint is presumed down.
#[derive(Debug)]
struct FailureCooldown {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl FailureCooldown {
    fn new(window: Duration) -> Self {
        Self { window, last: Mutex::new(None) }
    }

    fn active(&self) -> bool {
        let last = self.last.lock().expect("cooldown lock poisoned");
        matches!(*last, Some(at) if at.elapsed() < self.window)
    }

    fn record(&self) {
        *self.last.lock().expect("cooldown lock poisoned") = Some(Instant::now());
    }

    fn clear(&self) {
        *self.last.lock().expect("cooldown lock poisoned") = None;
    }
}

/// One hit from the simple-search endpoint.
#[derive(Debug, Deserialize)]
struct NoteRow {
    #[serde(default)]
    path: String,
    #[serde(default)]
    vault: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    file: Option<NoteFileMeta>,
}

#[derive(Debug, Deserialize)]
struct NoteFileMeta {
    #[serde(default)]
    path: String,
    #[serde(default)]
    ctime: String,
    #[serde(default)]
    mtime: String,
}

impl NoteRow {
    fn into_record(self) -> Option<ContentRecord> {
        let file = self
            .file
            .unwrap_or_else(|| NoteFileMeta { path: String::new(), ctime: String::new(), mtime: String::new() });
        let path = if self.path.is_empty() { file.path } else { self.path };
        if path.is_empty() {
            return None;
        }

        let text = if !self.content.is_empty() {
            self.content
        } else if !self.excerpt.is_empty() {
            self.excerpt
        } else {
            "No content available".to_string()
        };

        Some(ContentRecord::Note(NoteRecord {
            id: path.clone(),
            text,
            path,
            vault: self.vault,
            created_at: file.ctime,
            updated_at: file.mtime,
            score: self.score,
        }))
    }
}

/// Reduce a page URL to search keywords.
///
/// Strips scheme, `www.` and any trailing slash, then splits the rest on
/// path and word separators.
pub fn extract_keywords(url: &str) -> String {
    let mut rest = url.trim();
    for prefix in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    rest = rest.strip_prefix("www.").unwrap_or(rest);
    let rest = rest.trim_end_matches('/');

    rest.split(['/', '-', '_', '.'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client for the local notes vault API.
#[derive(Debug)]
pub struct NotesClient {
    http: reqwest::Client,
    config: NotesConfig,
    cooldown: FailureCooldown,
}

impl NotesClient {
    pub fn new(config: NotesConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Network(std::sync::Arc::new(e)))?;
        let cooldown = FailureCooldown::new(config.cooldown);

        Ok(Self { http, config, cooldown })
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<Vec<NoteRow>, SourceError> {
        let url = format!("{}/search/simple", self.config.endpoint);
        let context_length = CONTEXT_LENGTH.to_string();

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .header(header::ACCEPT, "application/json")
            .query(&[("query", query), ("context_length", context_length.as_str())])
            .send()
            .await
            .map_err(SourceError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpError { status: status.as_u16() });
        }

        let bytes = response.bytes().await.map_err(SourceError::from)?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ContentSource for NotesClient {
    fn name(&self) -> &'static str {
        "notes"
    }

    async fn find_content(&self, url: &str, _force_refresh: bool) -> Result<Vec<ContentRecord>, SourceError> {
        let Some(api_key) = self.config.api_key.clone() else {
            tracing::debug!("no notes API key configured, skipping search");
            return Ok(Vec::new());
        };

        if self.cooldown.active() {
            tracing::debug!("skipping notes search during connection-failure cooldown");
            return Ok(Vec::new());
        }

        let keywords = extract_keywords(url);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        match self.search(&api_key, &keywords).await {
            Ok(rows) => {
                self.cooldown.clear();
                Ok(rows.into_iter().filter_map(NoteRow::into_record).collect())
            }
            Err(e) => {
                self.cooldown.record();
                tracing::warn!(error = %e, "notes search failed, cooling down");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords() {
        assert_eq!(extract_keywords("https://www.example.com/posts/rust-cache/"), "example com posts rust cache");
        assert_eq!(extract_keywords("http://example.com/a_b"), "example com a b");
        assert_eq!(extract_keywords("example.com"), "example com");
        assert_eq!(extract_keywords(""), "");
    }

    #[test]
    fn test_cooldown_lifecycle() {
        let cooldown = FailureCooldown::new(Duration::from_secs(30));
        assert!(!cooldown.active());

        cooldown.record();
        assert!(cooldown.active());

        cooldown.clear();
        assert!(!cooldown.active());
    }

    #[test]
    fn test_cooldown_expires() {
        let cooldown = FailureCooldown::new(Duration::from_millis(1));
        cooldown.record();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!cooldown.active());
    }

    #[test]
    fn test_note_row_conversion() {
        let row: NoteRow = serde_json::from_str(
            r#"{
                "path": "web/rust-cache.md",
                "vault": "main",
                "excerpt": "notes on caching",
                "score": 3.5,
                "file": {"ctime": "2025-01-01T00:00:00Z", "mtime": "2025-02-01T00:00:00Z"}
            }"#,
        )
        .unwrap();

        let ContentRecord::Note(note) = row.into_record().unwrap() else {
            panic!("expected note");
        };
        assert_eq!(note.id, "web/rust-cache.md");
        assert_eq!(note.text, "notes on caching");
        assert_eq!(note.vault, "main");
        assert_eq!(note.updated_at, "2025-02-01T00:00:00Z");
    }

    #[test]
    fn test_note_row_without_path_skipped() {
        let row: NoteRow = serde_json::from_str(r#"{"content": "orphan"}"#).unwrap();
        assert!(row.into_record().is_none());
    }

    #[tokio::test]
    async fn test_find_content_without_key_is_empty() {
        let client = NotesClient::new(NotesConfig::default()).unwrap();
        let records = client.find_content("https://example.com", false).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_find_content_respects_cooldown() {
        let config = NotesConfig { api_key: Some("key".into()), ..Default::default() };
        let client = NotesClient::new(config).unwrap();

        client.cooldown.record();
        let records = client.find_content("https://example.com", false).await.unwrap();
        assert!(records.is_empty());
    }
}
