//! Lookup errors.
//!
//! These are the only failures a cache reports to its callers. Anything that
//! goes wrong while reading the directory is logged and skipped instead.

use thiserror::Error;
use vaultkeys_core::{Account, Address};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Nothing matched the query.
    #[error("no key for given address or file")]
    NoMatch,

    /// More than one account has the address. `matches` is sorted by URL,
    /// so callers can pick one and retry with its URL.
    #[error("multiple keys match address ({})", join_urls(.matches))]
    AmbiguousAddress {
        address: Address,
        matches: Vec<Account>,
    },

    #[error("no config file found for account {0}")]
    ConfigFileNotFound(Account),
}

fn join_urls(matches: &[Account]) -> String {
    matches
        .iter()
        .map(|account| account.url.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
