//! The account type shared by every vaultkeys crate.

use crate::account_url::AccountUrl;
use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A public account identity: an address plus the location of its secret.
///
/// The secret itself never appears here. Two accounts are the same account
/// only if both the address and the URL match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub url: AccountUrl,
}

impl Account {
    pub fn new(address: Address, url: AccountUrl) -> Self {
        Self { address, url }
    }

    /// Orders by URL, breaking ties by address.
    ///
    /// This is the order the cache keeps its account list in.
    pub fn cmp_by_url(&self, other: &Account) -> Ordering {
        self.url
            .cmp(&other.url)
            .then_with(|| self.address.cmp(&other.address))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.url)
    }
}
