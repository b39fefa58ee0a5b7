//! Directory watchers.
//!
//! A watcher's only job is to tell its target "the directory changed,
//! reconcile now". It never looks at what changed; the target rescans and
//! works that out itself. Two implementations exist:
//!
//! - [`NotifyWatcher`] uses the platform's change notifications (inotify,
//!   FSEvents, ReadDirectoryChangesW) via the notify crate, debounced so a
//!   burst of writes triggers one rescan.
//! - [`PollingFallback`] never starts. The owner keeps rescanning on its
//!   own throttle instead.

use crate::error::WatchError;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Something that can bring itself back in sync with the directory.
pub trait Reconcile: Send + Sync {
    fn reconcile(&self);
}

/// Capability interface over the ways of noticing directory changes.
pub trait DirectoryWatcher: Send {
    /// Begins watching `root`, calling `target.reconcile()` on changes.
    ///
    /// Starting an already running watcher is a no-op. The target is held
    /// weakly; the watcher stops once it is gone.
    fn start(&mut self, root: &Path, target: Weak<dyn Reconcile>) -> Result<(), WatchError>;

    /// True while change notifications are being delivered.
    fn is_running(&self) -> bool;

    /// Stops watching. Safe to call repeatedly and from any state.
    fn close(&mut self);
}

/// How a cache should notice directory changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    /// Native notifications where available, throttled rescans otherwise.
    #[default]
    Native,
    /// Throttled rescans only.
    PollOnly,
}

impl WatchMode {
    /// Builds the watcher for this mode.
    pub fn build(self, debounce: Duration) -> Box<dyn DirectoryWatcher> {
        match self {
            WatchMode::Native => Box::new(NotifyWatcher::new(debounce)),
            WatchMode::PollOnly => Box::new(PollingFallback),
        }
    }
}

/// Watches a directory with native change notifications.
pub struct NotifyWatcher {
    debounce: Duration,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl NotifyWatcher {
    /// Creates an idle watcher. Events closer together than `debounce`
    /// are folded into one reconcile.
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            debouncer: None,
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl DirectoryWatcher for NotifyWatcher {
    fn start(&mut self, root: &Path, target: Weak<dyn Reconcile>) -> Result<(), WatchError> {
        if self.is_running() {
            return Ok(());
        }
        // A previous listener may have died; make sure it's fully let go.
        self.close();

        let (tx, rx) = channel();
        let mut debouncer = new_debouncer(self.debounce, tx)?;
        debouncer
            .watcher()
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: root.to_path_buf(),
                source,
            })?;

        let running = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(AtomicBool::new(false));
        thread::Builder::new()
            .name("vaultkeys-watcher".into())
            .spawn({
                let root = root.to_path_buf();
                let running = running.clone();
                let stop = stop.clone();
                move || listen(rx, &root, target, &stop, &running)
            })
            .map_err(WatchError::Spawn)?;

        info!("Watching {} for changes", root.display());

        self.debouncer = Some(debouncer);
        self.running = running;
        self.stop = stop;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.running.store(false, Ordering::Release);
        // Dropping the debouncer ends its event stream, which ends the
        // listener loop. The listener is never joined here: it may be the
        // thread calling us.
        if self.debouncer.take().is_some() {
            debug!("Stopped watching for changes");
        }
    }
}

impl Drop for NotifyWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Listener loop: one reconcile per debounced batch of events.
///
/// Ends when the debouncer goes away, when the target is gone, or when the
/// watch itself is lost: an event on `root` itself (deleted, moved,
/// replaced) or a backend error leaves the watch in an unknown state, so the
/// loop gives up and the owner restarts it on its next reload.
fn listen(
    rx: Receiver<DebounceEventResult>,
    root: &Path,
    target: Weak<dyn Reconcile>,
    stop: &AtomicBool,
    running: &AtomicBool,
) {
    // Ends when the debouncer is dropped and its sender goes with it.
    for result in rx {
        if stop.load(Ordering::Acquire) {
            break;
        }
        match result {
            Ok(events) if events.is_empty() => {}
            Ok(events) => {
                debug!("{} filesystem events, reconciling", events.len());
                let Some(target) = target.upgrade() else {
                    break;
                };
                target.reconcile();

                let touched_root = events.iter().any(|event| event.path.as_path() == root);
                if touched_root || !root.is_dir() {
                    info!("Lost watch on {}, falling back to rescans", root.display());
                    break;
                }
            }
            Err(e) => {
                warn!("Watch error on {}: {:?}", root.display(), e);
                break;
            }
        }
    }
    running.store(false, Ordering::Release);
    debug!("Watcher loop ended");
}

/// A watcher that never starts, leaving the owner on throttled rescans.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollingFallback;

impl DirectoryWatcher for PollingFallback {
    fn start(&mut self, _root: &Path, _target: Weak<dyn Reconcile>) -> Result<(), WatchError> {
        Err(WatchError::Unsupported)
    }

    fn is_running(&self) -> bool {
        false
    }

    fn close(&mut self) {}
}
