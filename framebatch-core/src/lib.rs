//! # framebatch-core
//!
//! Domain types, cache layout helpers, configuration, and the job/status
//! store abstraction shared by every framebatch crate.
//!
//! The cache is a frame-scoped directory tree
//! (`<cache>/<frame>/SLC/<YYYYMMDD>/…`, `…/RSLC/<YYYYMMDD>/…`, shared `geo`
//! and `DEM` products). Only the staging environment in `framebatch-env`
//! writes to it, and only through pattern-filtered synchronization.

pub mod config;
pub mod error;
pub mod layout;
pub mod queue;
pub mod types;

pub use config::{Settings, WritebackPolicy};
pub use error::{ConfigError, StoreError};
