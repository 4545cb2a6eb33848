//! Fetch coordination.
//!
//! Decides, per URL-change event, whether to serve cached records, trigger
//! a network fetch, or do nothing, while preventing redundant concurrent
//! fetches.
//!
//! Decision policy on a URL change, in order:
//! 1. Fresh cache entry → adopt it immediately, no loading transition.
//! 2. Automatic fetch permitted (auto-fetch enabled AND domain
//!    allow-listed, two independent gates) → debounced fetch.
//! 3. Otherwise leave the displayed content alone; the source-URL mismatch
//!    is the caller's cue to offer a manual refresh.
//!
//! Rapid URL changes within the quiet window collapse to one fetch for the
//! last URL; the very first automatic fetch after construction runs
//! immediately so a cold load is not blanked by the debounce. There is no
//! network cancellation primitive: a fetch whose target URL is no longer
//! current has its result discarded at completion time.

use crate::state::{PanelState, StateHandle};
use sideline_client::source::ContentSource;
use sideline_core::cache::PageCache;
use sideline_core::config::AppConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default quiet window for automatic fetches.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Coordinator behavior knobs.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Quiet window for automatic fetches on rapid URL changes.
    pub debounce: Duration,
    /// Gate 1: whether URL changes may fetch without a manual action.
    pub auto_fetch: bool,
    /// Gate 2: domains on which automatic fetches may run. Empty passes
    /// every domain.
    pub allowlist_domains: Vec<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { debounce: DEFAULT_DEBOUNCE, auto_fetch: true, allowlist_domains: Vec::new() }
    }
}

impl CoordinatorConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            debounce: config.debounce(),
            auto_fetch: config.auto_fetch,
            allowlist_domains: config.allowlist_domains.clone(),
        }
    }

    fn domain_allowed(&self, url: &str) -> bool {
        if self.allowlist_domains.is_empty() {
            return true;
        }
        let Some(host) = url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_owned)) else {
            return false;
        };
        self.allowlist_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }
}

/// Orchestrates cache lookups and source fetches for the live URL.
pub struct FetchCoordinator {
    cache: Arc<PageCache>,
    source: RwLock<Arc<dyn ContentSource>>,
    state: StateHandle,
    config: CoordinatorConfig,
    /// Active quiet window; follows the active source.
    debounce: RwLock<Duration>,
    current: RwLock<Option<String>>,
    /// URL of the fetch currently in flight, if any.
    in_flight: Mutex<Option<String>>,
    /// Debounce task for the next automatic fetch.
    pending: Mutex<Option<JoinHandle<()>>>,
    fetched_once: AtomicBool,
}

impl FetchCoordinator {
    pub fn new(cache: Arc<PageCache>, source: Arc<dyn ContentSource>, config: CoordinatorConfig) -> Arc<Self> {
        let debounce = config.debounce;
        Arc::new(Self {
            cache,
            source: RwLock::new(source),
            state: StateHandle::new(),
            config,
            debounce: RwLock::new(debounce),
            current: RwLock::new(None),
            in_flight: Mutex::new(None),
            pending: Mutex::new(None),
            fetched_once: AtomicBool::new(false),
        })
    }

    /// Swap the active content source and its quiet window, then
    /// re-evaluate the live URL so the panel reflects the new source.
    pub async fn set_source(self: &Arc<Self>, source: Arc<dyn ContentSource>, debounce: Duration) {
        tracing::debug!(source = source.name(), "switching active content source");
        *self.source.write().expect("source lock poisoned") = source;
        *self.debounce.write().expect("debounce lock poisoned") = debounce;

        if let Some(url) = self.current_url() {
            self.on_url_change(&url).await;
        }
    }

    /// Subscribe to panel state changes.
    pub fn state(&self) -> watch::Receiver<PanelState> {
        self.state.subscribe()
    }

    /// Current panel state, cloned.
    pub fn snapshot(&self) -> PanelState {
        self.state.snapshot()
    }

    /// The URL the coordinator currently considers live.
    pub fn current_url(&self) -> Option<String> {
        self.current.read().expect("current url lock poisoned").clone()
    }

    /// Whether the displayed records were fetched for a different URL than
    /// the live one. The caller uses this to prompt a manual refresh.
    pub fn is_source_stale(&self) -> bool {
        match (self.current_url(), self.state.snapshot().source_url) {
            (Some(current), Some(source)) => current != source,
            _ => false,
        }
    }

    /// React to the active URL changing.
    ///
    /// An empty URL is a no-op. See the module docs for the decision
    /// policy.
    pub async fn on_url_change(self: &Arc<Self>, url: &str) {
        if url.is_empty() {
            return;
        }

        *self.current.write().expect("current url lock poisoned") = Some(url.to_string());

        if !self.cache.is_stale(url).await
            && let Some(entry) = self.cache.get(url).await
        {
            tracing::debug!(url, "adopting fresh cached records");
            self.state.adopt(entry.records, url);
            return;
        }

        if !self.config.auto_fetch {
            tracing::debug!(url, "auto-fetch disabled, waiting for manual refresh");
            return;
        }
        if !self.config.domain_allowed(url) {
            tracing::debug!(url, "domain not allow-listed, waiting for manual refresh");
            return;
        }

        self.schedule_fetch(url.to_string());
    }

    /// Manually refresh the live URL, bypassing cache freshness.
    ///
    /// Runs immediately (no debounce) and overwrites the cache entry for
    /// the URL regardless of prior freshness. No-op without a live URL.
    pub async fn refresh(self: &Arc<Self>) {
        let Some(url) = self.current_url() else {
            return;
        };

        if let Some(handle) = self.pending.lock().expect("pending lock poisoned").take() {
            handle.abort();
        }
        Arc::clone(self).run_fetch(url, true).await;
    }

    /// Queue an automatic fetch behind the quiet window.
    ///
    /// A newer schedule replaces a pending one, so only the last URL in a
    /// burst is fetched. The first automatic fetch ever skips the window.
    fn schedule_fetch(self: &Arc<Self>, url: String) {
        {
            let in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            if in_flight.as_deref() == Some(url.as_str()) {
                tracing::debug!(url, "fetch already in flight, coalescing");
                return;
            }
        }

        let mut pending = self.pending.lock().expect("pending lock poisoned");
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let first = !self.fetched_once.swap(true, Ordering::SeqCst);
        let window = *self.debounce.read().expect("debounce lock poisoned");
        let delay = if first { Duration::ZERO } else { window };
        let this = Arc::clone(self);
        *pending = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if this.current_url().as_deref() != Some(url.as_str()) {
                tracing::debug!(url, "skipping fetch for a superseded URL");
                return;
            }
            this.run_fetch(url, false).await;
        }));
    }

    async fn run_fetch(self: Arc<Self>, url: String, force: bool) {
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            if in_flight.as_deref() == Some(url.as_str()) {
                tracing::debug!(url, "fetch already in flight, coalescing");
                return;
            }
            *in_flight = Some(url.clone());
        }

        // the cache may have been filled while this call waited out the
        // quiet window
        if !force
            && !self.cache.is_stale(&url).await
            && let Some(entry) = self.cache.get(&url).await
        {
            self.state.adopt(entry.records, &url);
            self.finish(&url);
            return;
        }

        self.state.set_loading(true);
        self.state.set_error(None);

        let source = self.source.read().expect("source lock poisoned").clone();
        let result = source.find_content(&url, force).await;
        let still_current = self.current_url().as_deref() == Some(url.as_str());

        match result {
            Ok(records) => {
                // the records are valid for their URL either way; only the
                // displayed state is guarded against superseded results
                self.cache.put(&url, records.clone()).await;
                if still_current {
                    self.state.adopt(records, &url);
                } else {
                    tracing::debug!(url, "discarding records for a superseded URL");
                }
            }
            Err(e) => {
                if still_current {
                    self.state.set_error(Some(e.to_string()));
                } else {
                    tracing::debug!(url, "discarding error for a superseded URL");
                }
            }
        }

        self.finish(&url);
    }

    /// Release the in-flight slot if this fetch still owns it.
    fn finish(&self, url: &str) {
        let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
        if in_flight.as_deref() == Some(url) {
            *in_flight = None;
            self.state.set_loading(false);
        }
    }
}
