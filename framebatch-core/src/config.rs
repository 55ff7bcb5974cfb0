//! Runtime settings for a batch run.
//!
//! Settings come either from the environment ([`Settings::from_env`], the
//! CLI default) or are built explicitly ([`Settings::new`], tests and
//! embedders). Nothing else in the workspace reads environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable naming the durable cache root. Required.
pub const CACHE_ROOT_VAR: &str = "BATCH_CACHE_DIR";

/// Environment variable naming the staging temp root. Optional; defaults to
/// the system temp directory.
pub const TEMP_ROOT_VAR: &str = "BATCH_TEMP_DIR";

/// Cluster scheduler job id, set by the scheduler when running under it.
pub const SCHEDULER_JOB_VAR: &str = "LSB_JOBID";

/// When results are mirrored from the staging directory back to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritebackPolicy {
    /// Write back the output-pattern subset on success and failure alike.
    /// Failed runs may persist partial artifacts under their usual names.
    #[default]
    Always,
    /// Write back only when the processing outcome was success.
    OnSuccess,
}

/// Externally supplied configuration for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Durable, frame-scoped artifact cache shared across jobs.
    pub cache_root: PathBuf,
    /// Root under which per-job staging directories are created.
    pub temp_root: PathBuf,
    /// Scheduler job id, folded into staging-directory names for isolation.
    pub scheduler_job_id: Option<String>,
    /// Thread count handed to the external routine; never set process-wide.
    pub threads: usize,
    pub writeback: WritebackPolicy,
}

impl Settings {
    /// Explicit construction with defaults for everything but the cache root.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            temp_root: std::env::temp_dir(),
            scheduler_job_id: None,
            threads: default_threads(),
            writeback: WritebackPolicy::default(),
        }
    }

    /// Build settings from the environment.
    ///
    /// Fails with [`ConfigError::MissingCacheRoot`] if `BATCH_CACHE_DIR` is
    /// unset — an orchestrator-level setup error that aborts the whole job.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cache_root = std::env::var_os(CACHE_ROOT_VAR)
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingCacheRoot)?;
        let temp_root = std::env::var_os(TEMP_ROOT_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        let scheduler_job_id = std::env::var(SCHEDULER_JOB_VAR).ok();
        Ok(Self {
            cache_root,
            temp_root,
            scheduler_job_id,
            threads: default_threads(),
            writeback: WritebackPolicy::default(),
        })
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
