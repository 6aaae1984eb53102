//! Error types for log directory discovery and monitoring.

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::backend::WatchHandle;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur while discovering or watching log directories.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Watch limit exceeded.
    #[error("watch limit exceeded while adding {0} (see fs.inotify.max_user_watches)")]
    WatchLimitExceeded(String),

    /// Directory already watched.
    #[error("directory already monitored: {0}")]
    AlreadyWatching(String),

    /// No directory could be registered.
    #[error("no directories could be added for monitoring")]
    NoDirectories,

    /// Every watch was dropped by the operating system.
    #[error("all watches were removed by the operating system")]
    AllWatchesLost,

    /// The notification stream ended.
    #[error("notification source closed")]
    SourceClosed,

    /// Handle not issued by this backend.
    #[error("unknown watch handle: {0}")]
    UnknownHandle(WatchHandle),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WatcherError {
    /// Classify an OS error returned while registering a watch on `path`.
    pub fn from_watch_io(path: &Path, err: io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                Self::DirectoryNotFound(path)
            }
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            // inotify_add_watch reports the per-user watch limit as ENOSPC.
            io::ErrorKind::StorageFull => Self::WatchLimitExceeded(path),
            _ => Self::Io(err),
        }
    }
}
