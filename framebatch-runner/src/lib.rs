//! # framebatch-runner
//!
//! Drives a job's work items sequentially: auxiliary-reference selection,
//! staging-environment acquisition, external co-registration, and status
//! reporting back to the job store.
//!
//! Call [`Orchestrator::run_job`] with a store, a routine, and a reporter.

pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod reporter;
pub mod routine;

pub use error::RunnerError;
pub use metadata::read_multilook;
pub use orchestrator::{JobSummary, Orchestrator};
pub use reporter::{LogReporter, ProgressReporter};
pub use routine::{CommandRoutine, CoregRequest, CoregRoutine, FnRoutine};
