//! # framebatch-sync
//!
//! Pattern-filtered directory synchronization.
//!
//! [`Pattern`]/[`PatternSet`] select relative paths; [`mirror`] replicates a
//! source tree into a destination, either exactly (no patterns — extraneous
//! destination content is removed) or restricted to the matching subset
//! (patterns — everything else in the destination is left untouched).

pub mod error;
pub mod mirror;
pub mod pattern;

pub use error::SyncError;
pub use mirror::{mirror, MirrorStats};
pub use pattern::{Pattern, PatternSet};
