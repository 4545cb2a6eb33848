//! Remote content-source collaborators for sideline.
//!
//! This crate provides:
//! - The [`ContentSource`] trait the fetch coordinator drives
//! - A hosted content-index client (two-step URL → record lookup)
//! - A local notes-search client with failure cooldown
//! - Record normalization: link expansion and kind classification

pub mod index;
pub mod normalize;
pub mod notes;
pub mod source;

pub use index::{IndexClient, IndexConfig};
pub use notes::{NotesClient, NotesConfig};
pub use source::{ContentSource, SourceError};
