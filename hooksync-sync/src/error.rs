//! Error types for hooksync-sync.

use std::path::PathBuf;

use thiserror::Error;

use hooksync_core::ConfigError;

use crate::fetch::FetchError;

/// All errors that can arise from reconciliation and bootstrap operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The artifact is not a well-formed change-set payload.
    #[error("invalid change-set payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// The change-set names a repository without a deploy target.
    #[error("repository not configured for sync: {name}")]
    UnknownRepository { name: String },

    /// Remote content unavailable, after the single retry where applicable.
    #[error("could not get file contents for {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: FetchError,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A change-set path that would escape the deploy root.
    #[error("refusing to touch path outside the deploy root: {path}")]
    UnsafePath { path: String },

    /// A configuration error other than an unknown repository.
    #[error("config error: {0}")]
    Config(ConfigError),

    /// Archive download or extraction failed during bootstrap.
    #[error("archive error: {0}")]
    Archive(String),
}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownRepository { name } => SyncError::UnknownRepository { name },
            other => SyncError::Config(other),
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
