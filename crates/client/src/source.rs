//! Content source trait and error taxonomy.

use async_trait::async_trait;
use sideline_core::record::ContentRecord;
use std::sync::Arc;

/// Errors from a remote content source.
///
/// "Nothing found for this URL" is not an error; sources return an empty
/// record list for that. These variants cover transport and protocol
/// failures only.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Missing API key for the content index.
    #[error("missing API key: SIDELINE_INDEX_API_KEY not set")]
    MissingApiKey,

    /// The page URL is empty or unparseable.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the source.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { SourceError::Timeout } else { SourceError::Network(Arc::new(err)) }
    }
}

/// A read-only source of records related to a page URL.
///
/// Implementations must treat "not found" as `Ok` with an empty list and
/// reserve `Err` for transport and auth failures, which the coordinator
/// surfaces as a user-visible error state.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short name for logging and the source registry.
    fn name(&self) -> &'static str;

    /// Fetch records for a page URL.
    ///
    /// `force_refresh` asks the source to bypass any server-side caching
    /// it may do; sources without one may ignore it.
    async fn find_content(&self, url: &str, force_refresh: bool) -> Result<Vec<ContentRecord>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::MissingApiKey;
        assert!(err.to_string().contains("API key"));

        let err = SourceError::HttpError { status: 503 };
        assert!(err.to_string().contains("503"));

        let err = SourceError::InvalidUrl("nope".to_string());
        assert!(err.to_string().contains("invalid url"));
    }
}
