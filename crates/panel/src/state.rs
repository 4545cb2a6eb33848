//! Observable panel state.
//!
//! The coordinator publishes into a tokio `watch` channel; the UI layer
//! subscribes and re-renders on change. Setters skip no-op updates so
//! subscribers are only woken when something actually changed, and a fetch
//! returning structurally identical records does not touch the container
//! at all.

use serde::Serialize;
use sideline_core::record::ContentRecord;
use tokio::sync::watch;

/// What the side panel renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PanelState {
    /// Records currently displayed, most-recent-first.
    pub records: Vec<ContentRecord>,
    /// Whether a fetch is in flight.
    pub loading: bool,
    /// Last remote-query failure, if any.
    pub error: Option<String>,
    /// URL the displayed records were fetched for. May lag the live URL
    /// when automatic fetching is gated off.
    pub source_url: Option<String>,
}

/// Write side of the panel state channel.
#[derive(Debug)]
pub struct StateHandle {
    tx: watch::Sender<PanelState>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PanelState::default());
        Self { tx }
    }

    /// New subscription to state changes.
    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.tx.subscribe()
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> PanelState {
        self.tx.borrow().clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_if_modified(|state| {
            if state.loading == loading {
                return false;
            }
            state.loading = loading;
            true
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.tx.send_if_modified(|state| {
            if state.error == error {
                return false;
            }
            state.error = error;
            true
        });
    }

    /// Adopt fetched records for a URL.
    ///
    /// Structurally identical records leave the container untouched
    /// (including `source_url`), so subscribers see no spurious wake-up.
    /// Returns whether the state changed.
    pub fn adopt(&self, records: Vec<ContentRecord>, source_url: &str) -> bool {
        self.tx.send_if_modified(|state| {
            if state.records == records {
                tracing::debug!(source_url, "fetched records unchanged, skipping state update");
                return false;
            }
            state.records = records;
            state.source_url = Some(source_url.to_string());
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sideline_core::record::{RecordKind, TweetRecord};

    fn record(id: &str) -> ContentRecord {
        ContentRecord::Tweet(TweetRecord {
            id: id.to_string(),
            text: format!("tweet {id}"),
            created_at: "2025-06-01T12:00:00Z".to_string(),
            creator_id: "u1".to_string(),
            creator_username: None,
            reply_to_id: None,
            reply_to_creator_id: None,
            kind: RecordKind::Standalone,
            metrics: None,
        })
    }

    #[tokio::test]
    async fn test_adopt_publishes_records_and_source() {
        let state = StateHandle::new();
        let mut rx = state.subscribe();

        assert!(state.adopt(vec![record("t1")], "https://a.test"));

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.records, vec![record("t1")]);
        assert_eq!(snapshot.source_url.as_deref(), Some("https://a.test"));
    }

    #[tokio::test]
    async fn test_identical_records_suppressed() {
        let state = StateHandle::new();
        state.adopt(vec![record("t1")], "https://a.test");

        let mut rx = state.subscribe();
        rx.borrow_and_update();

        // same records, even for another URL: no update, no wake-up
        assert!(!state.adopt(vec![record("t1")], "https://b.test"));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(state.snapshot().source_url.as_deref(), Some("https://a.test"));
    }

    #[tokio::test]
    async fn test_loading_and_error_dedupe() {
        let state = StateHandle::new();
        let mut rx = state.subscribe();
        rx.borrow_and_update();

        state.set_loading(false); // already false
        state.set_error(None); // already none
        assert!(!rx.has_changed().unwrap());

        state.set_loading(true);
        state.set_error(Some("boom".to_string()));
        assert!(rx.has_changed().unwrap());
        let snapshot = state.snapshot();
        assert!(snapshot.loading);
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
    }
}
