//! Source registry.
//!
//! Holds every configured content source with its enabled flag and quiet
//! window, and tracks which one is active. The embedder switches the
//! active source and rebuilds or re-points the coordinator; slower
//! sources (like local notes search) carry a longer debounce.

use crate::coordinator::DEFAULT_DEBOUNCE;
use sideline_client::source::ContentSource;
use std::sync::Arc;
use std::time::Duration;

/// A registered source and its per-source settings.
#[derive(Clone)]
pub struct SourceEntry {
    pub source: Arc<dyn ContentSource>,
    pub enabled: bool,
    /// Quiet window for automatic fetches through this source.
    pub debounce: Duration,
}

/// Registry of content sources keyed by their `name()`.
#[derive(Default)]
pub struct SourceRegistry {
    entries: Vec<SourceEntry>,
    active: Option<String>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source with the default quiet window.
    ///
    /// The first registered source becomes active. Re-registering a name
    /// replaces the previous entry, keeping its position.
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        self.register_with_debounce(source, DEFAULT_DEBOUNCE);
    }

    /// Register a source with an explicit quiet window.
    pub fn register_with_debounce(&mut self, source: Arc<dyn ContentSource>, debounce: Duration) {
        let name = source.name().to_string();
        let entry = SourceEntry { source, enabled: true, debounce };

        if let Some(existing) = self.entries.iter_mut().find(|e| e.source.name() == name) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }

        if self.active.is_none() {
            self.active = Some(name);
        }
    }

    /// Look up a source by name.
    pub fn get(&self, name: &str) -> Option<&SourceEntry> {
        self.entries.iter().find(|e| e.source.name() == name)
    }

    /// Enable or disable a source. Returns false for an unknown name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.source.name() == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Every enabled source, in registration order.
    pub fn enabled(&self) -> Vec<&SourceEntry> {
        self.entries.iter().filter(|e| e.enabled).collect()
    }

    /// The active source entry, if one is set and still enabled.
    pub fn active(&self) -> Option<&SourceEntry> {
        let name = self.active.as_deref()?;
        self.get(name).filter(|e| e.enabled)
    }

    /// Switch the active source. Returns false for an unknown or disabled
    /// name, leaving the previous choice in place.
    pub fn set_active(&mut self, name: &str) -> bool {
        match self.get(name) {
            Some(entry) if entry.enabled => {
                self.active = Some(name.to_string());
                true
            }
            _ => false,
        }
    }
}
