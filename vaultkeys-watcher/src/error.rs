//! Watcher errors.
//!
//! None of these are fatal to a cache: a watcher that fails to start just
//! leaves the cache on throttled rescans.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    /// The platform watcher couldn't be created.
    #[error("failed to create filesystem watcher: {0}")]
    Notify(#[from] notify::Error),

    /// The watcher exists but refused the directory (usually: it doesn't exist yet).
    #[error("failed to watch '{path}': {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Native notifications are turned off for this watcher.
    #[error("native change notifications are disabled")]
    Unsupported,
}
