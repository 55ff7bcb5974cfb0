//! Error types for framebatch-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from pattern compilation and mirroring.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A path pattern failed to compile — a configuration error, surfaced
    /// at startup rather than per-file.
    #[error("malformed path pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failure.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
