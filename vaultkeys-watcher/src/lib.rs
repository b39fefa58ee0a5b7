//! Vaultkeys Watcher - keeping track of an account directory
//!
//! This crate handles the file system side of things:
//! - Snapshotting a directory and diffing snapshots into created, deleted
//!   and updated paths
//! - Watching for changes with native notifications
//! - Throttling rescans when notifications aren't available
//!
//! It knows nothing about accounts. The cache decides what a changed path
//! means.

mod error;
mod scanner;
mod throttle;
mod watcher;

pub use error::WatchError;
pub use scanner::{diff_snapshots, read_snapshot, FileScanner, FileSignature, ScanDiff, Snapshot};
pub use throttle::Throttle;
pub use watcher::{DirectoryWatcher, NotifyWatcher, PollingFallback, Reconcile, WatchMode};
