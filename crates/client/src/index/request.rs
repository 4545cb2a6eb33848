//! Content index request types and validation.

use crate::source::SourceError;

/// Maximum page-link rows requested per lookup.
pub const DEFAULT_LIMIT: u32 = 50;

/// A lookup of records linked to a page URL.
#[derive(Debug, Clone)]
pub struct ContentQuery {
    /// Exact page URL as observed in the session.
    pub url: String,

    /// Maximum number of link rows to return (1-100, default 50).
    pub limit: u32,
}

impl ContentQuery {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), limit: DEFAULT_LIMIT }
    }

    /// Validate the query parameters.
    ///
    /// Returns an error for an empty or unparseable URL, an unsupported
    /// scheme, or an out-of-range limit.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.url.trim().is_empty() {
            return Err(SourceError::InvalidUrl("url cannot be empty".to_string()));
        }

        let parsed = url::Url::parse(&self.url).map_err(|e| SourceError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(SourceError::InvalidUrl(format!("unsupported scheme: {scheme}")));
            }
        }

        if !(1..=100).contains(&self.limit) {
            return Err(SourceError::InvalidUrl(format!("limit out of range: {}", self.limit)));
        }

        Ok(())
    }

    /// Both trailing-slash variants of the page URL.
    ///
    /// The index stores whichever form the link was published with, so a
    /// lookup always asks for both. The cache layer above this never
    /// normalizes; the tolerance lives here only.
    pub fn slash_variants(&self) -> (String, String) {
        if let Some(stripped) = self.url.strip_suffix('/') {
            (self.url.clone(), stripped.to_string())
        } else {
            (format!("{}/", self.url), self.url.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_query() {
        let query = ContentQuery::new("https://example.com/article");
        assert!(query.validate().is_ok());
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_empty_url_rejected() {
        let query = ContentQuery::new("");
        assert!(matches!(query.validate(), Err(SourceError::InvalidUrl(_))));

        let query = ContentQuery::new("   ");
        assert!(matches!(query.validate(), Err(SourceError::InvalidUrl(_))));
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let query = ContentQuery::new("ftp://example.com");
        assert!(matches!(query.validate(), Err(SourceError::InvalidUrl(_))));
    }

    #[test]
    fn test_limit_bounds() {
        let mut query = ContentQuery::new("https://example.com");
        query.limit = 0;
        assert!(query.validate().is_err());

        query.limit = 101;
        assert!(query.validate().is_err());

        query.limit = 100;
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_slash_variants_without_slash() {
        let query = ContentQuery::new("https://example.com/a");
        let (with, without) = query.slash_variants();
        assert_eq!(with, "https://example.com/a/");
        assert_eq!(without, "https://example.com/a");
    }

    #[test]
    fn test_slash_variants_with_slash() {
        let query = ContentQuery::new("https://example.com/a/");
        let (with, without) = query.slash_variants();
        assert_eq!(with, "https://example.com/a/");
        assert_eq!(without, "https://example.com/a");
    }
}
