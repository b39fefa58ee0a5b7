//! Cache tuning knobs.

use std::time::Duration;
use vaultkeys_watcher::WatchMode;

/// Minimum time between caller-triggered rescans. Applies while no native
/// watcher is running, including while the directory doesn't exist yet
/// (starting a watcher is retried at most this often).
pub const MIN_RELOAD_INTERVAL: Duration = Duration::from_secs(2);

/// How long native change events are collected before one rescan runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub min_reload_interval: Duration,
    pub debounce: Duration,
    pub watch: WatchMode,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            min_reload_interval: MIN_RELOAD_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            watch: WatchMode::Native,
        }
    }
}

impl CacheOptions {
    /// Throttled rescans only, never native notifications.
    pub fn poll_only(min_reload_interval: Duration) -> Self {
        Self {
            min_reload_interval,
            watch: WatchMode::PollOnly,
            ..Self::default()
        }
    }
}
