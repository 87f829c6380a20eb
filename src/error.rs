//! Error types for podsync
//!
//! Library code returns [`PodsyncError`]; the binary wraps it in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for podsync operations
pub type PodsyncResult<T> = Result<T, PodsyncError>;

/// Main error type for podsync operations
#[derive(Error, Debug)]
pub enum PodsyncError {
    /// The user asked the watch session to stop.
    ///
    /// Never surfaces from [`crate::watcher::run_watch`]; it is turned into
    /// [`crate::watcher::WatchOutcome::Cancelled`] at that boundary.
    #[error("watch cancelled by user")]
    Cancelled,

    /// Registering or running a filesystem watch failed
    #[error("failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },

    /// The OS ran out of watch descriptors
    #[error(
        "too many files to watch while registering {path}; \
         on Linux raise the limit with `sysctl fs.inotify.max_user_watches=<n>`"
    )]
    WatchLimit { path: PathBuf },

    /// The filesystem event source went away mid-session
    #[error("filesystem event source closed unexpectedly")]
    EventSourceClosed,

    /// An ignore pattern is not a valid regular expression
    #[error("invalid ignore pattern '{pattern}': {message}")]
    InvalidIgnorePattern { pattern: String, message: String },

    /// Invalid configuration file
    #[error("invalid config in {file}: {message}")]
    Config { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl PodsyncError {
    /// Map a `notify` failure for `path` onto the matching variant.
    pub fn from_notify(path: impl Into<PathBuf>, err: notify::Error) -> Self {
        let path = path.into();
        match &err.kind {
            notify::ErrorKind::MaxFilesWatch => PodsyncError::WatchLimit { path },
            notify::ErrorKind::Io(io) => PodsyncError::Watch {
                path,
                message: io.to_string(),
            },
            _ => PodsyncError::Watch {
                path,
                message: err.to_string(),
            },
        }
    }

    /// Whether this is the user-cancel sentinel rather than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PodsyncError::Cancelled)
    }
}
