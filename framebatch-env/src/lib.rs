//! # framebatch-env
//!
//! Staging-environment lifecycle: a transactional, pattern-filtered working
//! area materialized from the frame cache for one processing step, with
//! write-back and rollback-style cleanup on release.
//!
//! See [`StagingEnv`] for the state machine, [`closest_reference`] for
//! auxiliary reference selection, and [`seed_frame_cache`] for provisioning
//! a frame cache from the long-term archive.

pub mod environment;
pub mod error;
pub mod reference;
pub mod seeding;

pub use environment::{EnvSpec, EnvState, Outcome, StagingEnv};
pub use error::EnvError;
pub use reference::closest_reference;
pub use seeding::{
    import_interferograms, import_references, list_archived_references, seed_frame_cache,
    SeedSummary,
};
