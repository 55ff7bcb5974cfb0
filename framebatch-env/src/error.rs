//! Error types for framebatch-env.

use std::path::PathBuf;

use thiserror::Error;

use crate::environment::EnvState;

/// All errors that can arise from staging-environment operations.
#[derive(Debug, Error)]
pub enum EnvError {
    /// `acquire`/`release` called out of order — a programming error.
    #[error("cannot {operation} a staging environment in state {state:?}")]
    Lifecycle {
        operation: &'static str,
        state: EnvState,
    },

    /// Pattern compilation or mirroring failure.
    #[error("sync error: {0}")]
    Sync(#[from] framebatch_sync::SyncError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The staged-reference directory holds no dates in the expected
    /// naming convention.
    #[error("no staged reference acquisitions under {path}")]
    NoCandidate { path: PathBuf },

    /// No primary reference date was given and none could be discovered
    /// from the archive's geometry products.
    #[error("could not discover a primary reference date from {path}")]
    NoPrimaryReference { path: PathBuf },
}

/// Convenience constructor for [`EnvError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EnvError {
    EnvError::Io {
        path: path.into(),
        source,
    }
}
