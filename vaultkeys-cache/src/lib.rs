//! Vaultkeys Cache - a live index of a directory of vault accounts
//!
//! Account directories hold one small metadata file per account. Other
//! processes create, edit and delete those files at any time. This crate
//! keeps an in-memory index of them that is cheap to query and stays in
//! sync with the directory:
//! - Native change notifications trigger a rescan when available
//! - Otherwise readers trigger throttled rescans
//! - Rescans only read files whose signature changed
//!
//! Lookups fail only for semantic reasons (no match, ambiguous address).
//! Unreadable or malformed files are logged and skipped.
//!
//! # Example
//!
//! ```no_run
//! use vaultkeys_cache::AccountCache;
//!
//! let (cache, changes) = AccountCache::new("/var/lib/vaultkeys/accounts", "http://localhost:8200");
//! for account in cache.accounts() {
//!     println!("{}", account);
//! }
//! // Blocks until the directory changes.
//! changes.recv().ok();
//! cache.close();
//! ```

mod cache;
mod error;
mod index;
mod loader;
mod options;

pub use cache::{AccountCache, ChangeSignal};
pub use error::LookupError;
pub use index::AccountIndex;
pub use loader::{AccountLoader, JsonAccountLoader};
pub use options::{CacheOptions, DEFAULT_DEBOUNCE, MIN_RELOAD_INTERVAL};
pub use vaultkeys_watcher::WatchMode;
