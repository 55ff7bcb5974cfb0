//! Error types for framebatch-runner.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while orchestrating a job.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A job/status store operation failed.
    #[error("status store error: {0}")]
    Store(#[from] framebatch_core::StoreError),

    /// Staging environment failure (lifecycle, staging, reconciliation).
    #[error("staging error: {0}")]
    Env(#[from] framebatch_env::EnvError),

    /// Pattern compilation failure.
    #[error("sync error: {0}")]
    Sync(#[from] framebatch_sync::SyncError),

    /// Orchestrator-level setup problem; aborts the whole job.
    #[error("configuration error: {0}")]
    Config(#[from] framebatch_core::ConfigError),

    /// The primary reference's multi-look header is absent or incomplete.
    #[error("reference metadata missing or incomplete at {path}")]
    MissingMetadata { path: PathBuf },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`RunnerError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunnerError {
    RunnerError::Io {
        path: path.into(),
        source,
    }
}
