//! Short-link expansion cache.
//!
//! Maps shortened URLs found in record text to their expanded form.
//! Process-lifetime and memory-only: populated as a side effect of
//! normalizing fetched records, no TTL, no eviction bound.

use std::collections::HashMap;
use std::sync::RwLock;

/// Lookup table from short URL to expanded URL.
#[derive(Debug, Default)]
pub struct LinkCache {
    map: RwLock<HashMap<String, String>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expanded form of a short URL, if known.
    pub fn get(&self, short: &str) -> Option<String> {
        self.map.read().expect("link cache lock poisoned").get(short).cloned()
    }

    /// Record an expansion. Empty expansions are ignored so an
    /// "unexpanded" placeholder is never cached.
    pub fn insert(&self, short: &str, expanded: &str) {
        if expanded.is_empty() {
            return;
        }
        self.map
            .write()
            .expect("link cache lock poisoned")
            .insert(short.to_string(), expanded.to_string());
    }

    pub fn len(&self) -> usize {
        self.map.read().expect("link cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = LinkCache::new();
        cache.insert("https://t.co/abc", "https://example.com/article");

        assert_eq!(cache.get("https://t.co/abc"), Some("https://example.com/article".to_string()));
        assert_eq!(cache.get("https://t.co/zzz"), None);
    }

    #[test]
    fn test_empty_expansion_ignored() {
        let cache = LinkCache::new();
        cache.insert("https://t.co/abc", "");

        assert_eq!(cache.get("https://t.co/abc"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_overwrite() {
        let cache = LinkCache::new();
        cache.insert("https://t.co/abc", "https://old.test");
        cache.insert("https://t.co/abc", "https://new.test");

        assert_eq!(cache.get("https://t.co/abc"), Some("https://new.test".to_string()));
        assert_eq!(cache.len(), 1);
    }
}
