//! Error types for framebatch-core.

use std::path::PathBuf;

use thiserror::Error;

/// Startup-time configuration problems; fail fast, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No cache root was supplied, via environment or flag.
    #[error("cache root not set; export {var} or pass --cache-dir", var = crate::config::CACHE_ROOT_VAR)]
    MissingCacheRoot,

    /// Frame names must begin with the track number, i.e. `TTT[AD]_*`.
    #[error("frames should begin with the track number, i.e. TTT[AD]_*, instead got '{name}'")]
    InvalidFrame { name: String },

    /// Acquisition dates use the compact `YYYYMMDD` convention.
    #[error("invalid acquisition date '{value}'; expected YYYYMMDD")]
    InvalidDate { value: String },
}

/// All errors that can arise from the job/status store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context.
    #[error("failed to parse job file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The requested job is not the one this store holds.
    #[error("job {job} not found in this store")]
    JobNotFound { job: crate::types::JobId },

    /// A status update referenced an item the store does not know.
    #[error("unknown work item {item}")]
    UnknownItem { item: crate::types::ItemId },

    /// A status update referenced a source acquisition the store does not know.
    #[error("unknown source acquisition {source_id}")]
    UnknownSource { source_id: crate::types::SourceId },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
