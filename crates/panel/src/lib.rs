//! Fetch coordination and observable state for the sideline panel.
//!
//! This crate provides:
//! - [`FetchCoordinator`]: URL-change decision policy, debounce,
//!   coalescing, and the stale-response guard
//! - [`PanelState`] / [`StateHandle`]: the watch-based state container the
//!   UI layer renders from
//! - [`SourceRegistry`]: configured content sources and the active choice

pub mod coordinator;
pub mod registry;
pub mod state;

pub use coordinator::{CoordinatorConfig, FetchCoordinator};
pub use registry::{SourceEntry, SourceRegistry};
pub use state::{PanelState, StateHandle};
