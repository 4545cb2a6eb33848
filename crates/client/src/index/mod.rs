//! Content index API client.
//!
//! Looks up records related to a page URL in a hosted read-only index.
//! Lookup is two-step: `page_links` maps the URL (both trailing-slash
//! variants) to record ids, then `records` returns the full rows,
//! newest-first. Rows are normalized into [`ContentRecord`]s on the way
//! out: short links rewritten, kinds classified, link expansions cached.
//!
//! ### Specification
//!
//! - **Authentication**: `Authorization: Bearer <key>` header.
//! - **Not found**: an empty row set, never an error status.
//! - **Errors**: 401/403 map to auth, 429 to rate limiting; other non-2xx
//!   statuses are surfaced with their code.

pub mod request;
pub mod response;

pub use request::ContentQuery;
pub use response::{PageLinkRow, TweetRow};

use crate::normalize;
use crate::source::{ContentSource, SourceError};
use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use sideline_core::cache::LinkCache;
use sideline_core::record::ContentRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default base URL for the content index API.
const DEFAULT_BASE_URL: &str = "https://index.sideline.dev/v1";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "sideline/0.1";

/// Content index client configuration.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// API key from SIDELINE_INDEX_API_KEY env var.
    pub api_key: String,
    /// Base URL (default: https://index.sideline.dev/v1).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: sideline/0.x).
    pub user_agent: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl IndexConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads SIDELINE_INDEX_API_KEY from environment. Returns error if not set.
    pub fn from_env() -> Result<Self, SourceError> {
        let api_key = std::env::var("SIDELINE_INDEX_API_KEY").map_err(|_| SourceError::MissingApiKey)?;
        let base_url = std::env::var("SIDELINE_INDEX_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self { api_key, base_url, ..Default::default() })
    }
}

/// Content index API client.
///
/// Holds the shared link-expansion cache, which it populates as a side
/// effect of normalizing fetched records.
#[derive(Debug, Clone)]
pub struct IndexClient {
    http: reqwest::Client,
    config: IndexConfig,
    links: Arc<LinkCache>,
}

impl IndexClient {
    /// Create a new index client with the given configuration.
    pub fn new(config: IndexConfig, links: Arc<LinkCache>) -> Result<Self, SourceError> {
        if config.api_key.is_empty() {
            return Err(SourceError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Network(Arc::new(e)))?;

        Ok(Self { http, config, links })
    }

    /// Create a new index client from environment variables.
    pub fn from_env(links: Arc<LinkCache>) -> Result<Self, SourceError> {
        Self::new(IndexConfig::from_env()?, links)
    }

    async fn get_json<T: DeserializeOwned>(
        &self, path: &str, params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}/{path}", self.config.base_url);

        let http_response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .query(params)
            .send()
            .await
            .map_err(SourceError::from)?;

        let status = http_response.status();
        tracing::debug!("index response for {}: {}", path, status);

        if status == 401 || status == 403 {
            return Err(SourceError::AuthError);
        }
        if status == 429 {
            return Err(SourceError::RateLimited);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(SourceError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await.map_err(SourceError::from)?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ContentSource for IndexClient {
    fn name(&self) -> &'static str {
        "index"
    }

    async fn find_content(&self, url: &str, force_refresh: bool) -> Result<Vec<ContentRecord>, SourceError> {
        let query = ContentQuery::new(url);
        query.validate()?;

        let start = Instant::now();
        let (with_slash, without_slash) = query.slash_variants();

        let mut params = vec![
            ("url", with_slash),
            ("url", without_slash),
            ("limit", query.limit.to_string()),
        ];
        if force_refresh {
            params.push(("refresh", "true".to_string()));
        }

        let links: Vec<PageLinkRow> = self.get_json("page_links", &params).await?;
        if links.is_empty() {
            tracing::debug!(url, "no records linked to this URL");
            return Ok(Vec::new());
        }

        // dedupe ids, preserving the link-row order
        let mut ids: Vec<&str> = Vec::new();
        for link in &links {
            if !ids.contains(&link.record_id.as_str()) {
                ids.push(&link.record_id);
            }
        }

        let params = vec![
            ("id", ids.join(",")),
            ("order", "created_at.desc".to_string()),
        ];
        let rows: Vec<TweetRow> = self.get_json("records", &params).await?;

        let records = normalize::normalize_tweets(rows, &links, &self.links);
        tracing::debug!(
            url,
            count = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "index lookup complete"
        );
        Ok(records)
    }
}
