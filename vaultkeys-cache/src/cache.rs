//! The live account cache.
//!
//! An [`AccountCache`] mirrors one account directory. It fills itself on
//! first use, then stays fresh one of two ways:
//!
//! - a native watcher calls back into the cache whenever the directory
//!   changes, or
//! - if no watcher could be started, readers trigger a rescan themselves,
//!   at most once per [`CacheOptions::min_reload_interval`].
//!
//! Either way a rescan is the same reconciliation pass: diff the directory
//! against the last snapshot, load created/updated files, drop deleted ones.

use crate::error::LookupError;
use crate::index::AccountIndex;
use crate::loader::{AccountLoader, JsonAccountLoader};
use crate::options::CacheOptions;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, warn};
use vaultkeys_core::{Account, Address};
use vaultkeys_watcher::{DirectoryWatcher, FileScanner, Reconcile, Throttle};

/// Fires (without payload) when the index changed since it was last read.
///
/// Holds at most one pending signal. Disconnects when the cache is closed.
pub type ChangeSignal = Receiver<()>;

/// A live index of the accounts in one directory.
pub struct AccountCache {
    root: PathBuf,
    loader: Box<dyn AccountLoader>,

    /// Index plus the gate deciding when to rescan.
    state: Mutex<CacheState>,

    /// Owns the last snapshot. Held for a whole pass, so passes never
    /// overlap. Always taken before `state`, never after.
    scanner: Mutex<FileScanner>,

    closed: AtomicBool,
    scans: AtomicU64,
    this: Weak<AccountCache>,
}

struct CacheState {
    index: AccountIndex,
    watcher: Box<dyn DirectoryWatcher>,
    throttle: Throttle,
    notify: Option<SyncSender<()>>,
}

impl AccountCache {
    /// Creates an empty cache over `root` with default options, reading
    /// JSON account records for the vault at `vault_addr`.
    ///
    /// Nothing is read until the first query.
    pub fn new(root: impl Into<PathBuf>, vault_addr: impl Into<String>) -> (Arc<Self>, ChangeSignal) {
        Self::with_options(
            root,
            JsonAccountLoader::new(vault_addr),
            CacheOptions::default(),
        )
    }

    pub fn with_options(
        root: impl Into<PathBuf>,
        loader: impl AccountLoader + 'static,
        options: CacheOptions,
    ) -> (Arc<Self>, ChangeSignal) {
        let (tx, rx) = sync_channel(1);
        let root = root.into();

        let cache = Arc::new_cyclic(|this| AccountCache {
            root,
            loader: Box::new(loader),
            state: Mutex::new(CacheState {
                index: AccountIndex::new(),
                watcher: options.watch.build(options.debounce),
                throttle: Throttle::new(options.min_reload_interval),
                notify: Some(tx),
            }),
            scanner: Mutex::new(FileScanner::new()),
            closed: AtomicBool::new(false),
            scans: AtomicU64::new(0),
            this: this.clone(),
        });
        (cache, rx)
    }

    /// The directory this cache mirrors.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All accounts, sorted by URL.
    pub fn accounts(&self) -> Vec<Account> {
        self.maybe_reload();
        self.state.lock().index.accounts().to_vec()
    }

    pub fn has_address(&self, address: &Address) -> bool {
        self.maybe_reload();
        self.state.lock().index.has_address(address)
    }

    /// Resolves a partial account against the current index.
    ///
    /// Doesn't rescan; call [`maybe_reload`](Self::maybe_reload) first for
    /// fresh results.
    pub fn find(&self, query: &Account) -> Result<Account, LookupError> {
        self.state.lock().index.find(query, &self.root)
    }

    /// The metadata file an account was read from.
    pub fn find_config_file(&self, query: &Account) -> Result<PathBuf, LookupError> {
        self.state.lock().index.find_config_file(query)
    }

    /// Indexes an account just written to `file`, ahead of the next rescan.
    pub fn add(&self, account: Account, file: impl Into<PathBuf>) -> bool {
        self.state.lock().index.insert(account, file.into())
    }

    pub fn remove_by_file(&self, file: &Path) -> Option<Account> {
        self.state.lock().index.remove_by_file(file)
    }

    /// True while a native watcher keeps the cache fresh.
    pub fn is_watching(&self) -> bool {
        self.state.lock().watcher.is_running()
    }

    /// Number of directory scans run so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Rescans if nothing else keeps the cache fresh and the throttle allows.
    ///
    /// Also (re)tries starting the native watcher, so a directory created
    /// after the cache gets watched once it exists.
    pub fn maybe_reload(&self) {
        {
            let mut state = self.state.lock();
            if self.closed.load(Ordering::Acquire) {
                return;
            }
            if state.watcher.is_running() {
                if self.root.is_dir() {
                    return; // The watcher keeps the cache up to date.
                }
                // The watched directory is gone; its watch died with it.
                state.watcher.close();
            }
            if !state.throttle.try_acquire() {
                return; // Reloaded recently.
            }

            let target: Weak<dyn Reconcile> = self.this.clone();
            if let Err(e) = state.watcher.start(&self.root, target) {
                debug!(
                    "Not watching {}: {}, rescanning at most every {:?}",
                    self.root.display(),
                    e,
                    state.throttle.interval()
                );
            }
        }
        self.scan_accounts();
    }

    /// Stops the watcher and the throttle and disconnects the change signal.
    ///
    /// Idempotent. Queries keep answering from the last index afterwards.
    pub fn close(&self) {
        let mut state = self.state.lock();
        self.closed.store(true, Ordering::Release);
        state.watcher.close();
        state.throttle.stop();
        if state.notify.take().is_some() {
            debug!("Closed account cache for {}", self.root.display());
        }
    }

    /// One reconciliation pass.
    fn scan_accounts(&self) {
        let mut scanner = self.scanner.lock();
        self.scans.fetch_add(1, Ordering::Relaxed);

        let diff = match scanner.scan(&self.root) {
            Ok(diff) => diff,
            Err(e) => {
                warn!("Failed to reload {}: {}", self.root.display(), e);
                return;
            }
        };
        if diff.is_empty() {
            return;
        }

        let start = Instant::now();

        for path in &diff.created {
            debug!("{} added, updating cache", path.display());
            if let Some(account) = self.read_account(path) {
                self.state.lock().index.insert(account, path.clone());
            }
        }
        for path in &diff.deleted {
            debug!("{} deleted, updating cache", path.display());
            self.state.lock().index.remove_by_file(path);
        }
        for path in &diff.updated {
            debug!("{} updated, updating cache", path.display());
            let account = self.read_account(path);
            // Swap under one lock so readers never see the account missing.
            let mut state = self.state.lock();
            state.index.remove_by_file(path);
            if let Some(account) = account {
                state.index.insert(account, path.clone());
            }
        }

        self.post_change();
        debug!(
            "Handled {} account file changes in {:?}",
            diff.len(),
            start.elapsed()
        );
    }

    fn read_account(&self, path: &Path) -> Option<Account> {
        match self.loader.load(path) {
            Ok(account) => {
                debug!("Loaded account {}", account);
                Some(account)
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Best effort: never blocks, drops the signal if one is already pending.
    fn post_change(&self) {
        if let Some(tx) = &self.state.lock().notify {
            let _ = tx.try_send(());
        }
    }
}

impl Reconcile for AccountCache {
    fn reconcile(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.scan_accounts();
    }
}

impl Drop for AccountCache {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for AccountCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCache")
            .field("root", &self.root)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
