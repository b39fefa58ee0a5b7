//! The account index.
//!
//! Three views over the same set of accounts:
//! - a list sorted by URL (ties broken by address), for listing and
//!   binary search
//! - address -> accounts, since one address can live in several vaults
//! - file -> account, one account per live metadata file
//!
//! The index itself is plain data with no locking; [`crate::AccountCache`]
//! wraps it in a mutex.

use crate::error::LookupError;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::debug;
use vaultkeys_core::{Account, Address};

#[derive(Debug, Default, Clone)]
pub struct AccountIndex {
    /// Sorted by [`Account::cmp_by_url`], no duplicates.
    all: Vec<Account>,

    /// Never holds an empty list.
    by_address: HashMap<Address, Vec<Account>>,

    by_file: BTreeMap<PathBuf, Account>,
}

impl AccountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// All accounts, sorted by URL.
    pub fn accounts(&self) -> &[Account] {
        &self.all
    }

    pub fn has_address(&self, address: &Address) -> bool {
        self.by_address
            .get(address)
            .is_some_and(|accounts| !accounts.is_empty())
    }

    /// Accounts with the given address, in insertion order.
    pub fn by_address(&self, address: &Address) -> &[Account] {
        self.by_address
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The account loaded from `file`, if any.
    pub fn by_file(&self, file: &Path) -> Option<&Account> {
        self.by_file.get(file)
    }

    /// Adds an account read from `file`.
    ///
    /// If `file` previously described a different account, that account is
    /// dropped first. Returns false if the exact same account is already
    /// indexed; it stays attributed to the file it was first read from.
    pub fn insert(&mut self, account: Account, file: PathBuf) -> bool {
        if self.by_file.get(&file).is_some_and(|old| *old != account) {
            self.remove_by_file(&file);
        }

        let position = match self.all.binary_search_by(|probe| probe.cmp_by_url(&account)) {
            Ok(_) => return false,
            Err(position) => position,
        };

        self.all.insert(position, account.clone());
        self.by_address
            .entry(account.address)
            .or_default()
            .push(account.clone());
        self.by_file.insert(file, account);
        true
    }

    /// Drops whatever account was read from `file`.
    pub fn remove_by_file(&mut self, file: &Path) -> Option<Account> {
        let Some(account) = self.by_file.remove(file) else {
            debug!("No account found for config file {}", file.display());
            return None;
        };

        if let Ok(position) = self
            .all
            .binary_search_by(|probe| probe.cmp_by_url(&account))
        {
            self.all.remove(position);
        }

        if let Entry::Occupied(mut entry) = self.by_address.entry(account.address) {
            let accounts = entry.get_mut();
            if let Some(position) = accounts.iter().position(|a| *a == account) {
                accounts.remove(position);
            }
            if accounts.is_empty() {
                entry.remove();
            }
        }

        Some(account)
    }

    /// Resolves a (partial) account to exactly one indexed account.
    ///
    /// A zero address matches any address; an empty URL path matches any
    /// URL. A URL path with no directory separator is taken relative to
    /// `root`.
    pub fn find(&self, query: &Account, root: &Path) -> Result<Account, LookupError> {
        let matches: &[Account] = if query.address.is_zero() {
            &self.all
        } else {
            self.by_address(&query.address)
        };

        if !query.url.path.is_empty() {
            let mut url = query.url.clone();
            if !url.path.contains(MAIN_SEPARATOR) {
                url.path = root.join(&url.path).to_string_lossy().into_owned();
            }
            if let Some(found) = matches.iter().find(|candidate| candidate.url == url) {
                return Ok(found.clone());
            }
            if query.address.is_zero() {
                return Err(LookupError::NoMatch);
            }
        }

        match matches {
            [] => Err(LookupError::NoMatch),
            [only] => Ok(only.clone()),
            _ => {
                let mut matches = matches.to_vec();
                matches.sort_by(Account::cmp_by_url);
                Err(LookupError::AmbiguousAddress {
                    address: query.address,
                    matches,
                })
            }
        }
    }

    /// Finds the metadata file an account was read from.
    ///
    /// The address must match, and the stored URL must be unset or equal to
    /// the query's.
    pub fn find_config_file(&self, query: &Account) -> Result<PathBuf, LookupError> {
        self.by_file
            .iter()
            .find(|(_, account)| {
                account.address == query.address
                    && (account.url.is_empty() || account.url == query.url)
            })
            .map(|(file, _)| file.clone())
            .ok_or_else(|| LookupError::ConfigFileNotFound(query.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultkeys_core::AccountUrl;

    fn address(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::new(bytes)
    }

    fn account(addr: u8, path: &str) -> Account {
        Account::new(address(addr), AccountUrl::new("http", "vault:8200", path))
    }

    fn file(name: &str) -> PathBuf {
        PathBuf::from("/keys").join(name)
    }

    /// Checks every invariant the index promises.
    fn assert_consistent(index: &AccountIndex) {
        let all = index.accounts();
        for pair in all.windows(2) {
            assert_eq!(
                pair[0].cmp_by_url(&pair[1]),
                std::cmp::Ordering::Less,
                "list must be sorted without duplicates"
            );
        }
        for (addr, accounts) in &index.by_address {
            assert!(!accounts.is_empty(), "empty list for {}", addr);
            let expected = all.iter().filter(|a| a.address == *addr).count();
            assert_eq!(accounts.len(), expected);
        }
        assert_eq!(index.by_file.len(), all.len());
        for account in index.by_file.values() {
            assert!(all.contains(account), "dangling file entry {}", account);
        }
    }

    #[test]
    fn test_insert_keeps_sorted() {
        let mut index = AccountIndex::new();
        for (i, path) in ["/5", "/1", "/4", "/2", "/3"].iter().enumerate() {
            assert!(index.insert(account(i as u8 + 1, path), file(path)));
            assert_consistent(&index);
        }
        let paths: Vec<_> = index.accounts().iter().map(|a| a.url.path.as_str()).collect();
        assert_eq!(paths, vec!["/1", "/2", "/3", "/4", "/5"]);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = AccountIndex::new();
        assert!(index.insert(account(1, "/1"), file("a")));
        assert!(!index.insert(account(1, "/1"), file("a")));
        assert!(!index.insert(account(1, "/1"), file("b")));

        assert_eq!(index.accounts().len(), 1);
        assert_eq!(index.by_address(&address(1)).len(), 1);
        assert!(index.by_file(&file("b")).is_none());
        assert_consistent(&index);
    }

    #[test]
    fn test_insert_replaces_account_for_same_file() {
        let mut index = AccountIndex::new();
        index.insert(account(1, "/1"), file("a"));
        index.insert(account(2, "/2"), file("a"));

        assert_eq!(index.accounts(), &[account(2, "/2")]);
        assert!(!index.has_address(&address(1)));
        assert_consistent(&index);
    }

    #[test]
    fn test_remove_prunes_every_view() {
        let mut index = AccountIndex::new();
        index.insert(account(1, "/1"), file("a"));
        index.insert(account(1, "/2"), file("b"));
        index.insert(account(2, "/3"), file("c"));

        assert_eq!(index.remove_by_file(&file("a")), Some(account(1, "/1")));
        assert!(index.has_address(&address(1)));
        assert_consistent(&index);

        index.remove_by_file(&file("b"));
        assert!(!index.has_address(&address(1)));
        assert!(!index.by_address.contains_key(&address(1)));
        assert_consistent(&index);

        assert_eq!(index.remove_by_file(&file("unknown")), None);
        assert_eq!(index.accounts().len(), 1);
    }

    #[test]
    fn test_mixed_sequence_stays_consistent() {
        let mut index = AccountIndex::new();
        // Deterministic pseudo-random walk over a small key space.
        let mut state: u32 = 7;
        for _ in 0..500 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let slot = (state >> 16) % 12;
            let name = format!("f{}", slot);
            if (state >> 8) % 3 == 0 {
                index.remove_by_file(&file(&name));
            } else {
                let addr = (slot % 4) as u8 + 1;
                index.insert(account(addr, &format!("/{}", slot)), file(&name));
            }
            assert_consistent(&index);
        }
    }

    #[test]
    fn test_find_by_address() {
        let mut index = AccountIndex::new();
        let root = Path::new("/keys");
        index.insert(account(1, "/1"), file("a"));

        let query = Account::new(address(1), AccountUrl::default());
        assert_eq!(index.find(&query, root), Ok(account(1, "/1")));

        let query = Account::new(address(9), AccountUrl::default());
        assert_eq!(index.find(&query, root), Err(LookupError::NoMatch));
    }

    #[test]
    fn test_find_by_url() {
        let mut index = AccountIndex::new();
        let root = Path::new("/keys");
        index.insert(account(1, "/1"), file("a"));
        index.insert(account(2, "/2"), file("b"));

        let query = Account::new(Address::ZERO, account(2, "/2").url);
        assert_eq!(index.find(&query, root), Ok(account(2, "/2")));

        let query = Account::new(Address::ZERO, account(0, "/nope").url);
        assert_eq!(index.find(&query, root), Err(LookupError::NoMatch));

        // Address given, URL doesn't match: falls back to the address alone.
        let query = Account::new(address(1), account(0, "/nope").url);
        assert_eq!(index.find(&query, root), Ok(account(1, "/1")));
    }

    #[test]
    fn test_find_completes_bare_file_names() {
        let mut index = AccountIndex::new();
        let root = Path::new("/keys");
        let on_disk = Account::new(
            address(1),
            AccountUrl::new("keystore", "", root.join("acct.json").to_string_lossy()),
        );
        index.insert(on_disk.clone(), file("acct.json"));

        let query = Account::new(
            Address::ZERO,
            AccountUrl::new("keystore", "", "acct.json"),
        );
        assert_eq!(index.find(&query, root), Ok(on_disk));
    }

    #[test]
    fn test_ambiguous_address_is_sorted() {
        let mut index = AccountIndex::new();
        let root = Path::new("/keys");
        index.insert(account(1, "/b"), file("b"));
        index.insert(account(1, "/c"), file("c"));
        index.insert(account(1, "/a"), file("a"));

        let query = Account::new(address(1), AccountUrl::default());
        for _ in 0..3 {
            match index.find(&query, root) {
                Err(LookupError::AmbiguousAddress { address: addr, matches }) => {
                    assert_eq!(addr, address(1));
                    let paths: Vec<_> = matches.iter().map(|a| a.url.path.as_str()).collect();
                    assert_eq!(paths, vec!["/a", "/b", "/c"]);
                }
                other => panic!("expected ambiguity, got {:?}", other),
            }
        }

        let err = index.find(&query, root).unwrap_err();
        assert_eq!(
            err.to_string(),
            "multiple keys match address (http://vault:8200/a, http://vault:8200/b, http://vault:8200/c)"
        );
    }

    #[test]
    fn test_find_config_file() {
        let mut index = AccountIndex::new();
        index.insert(account(1, "/1"), file("a"));
        index.insert(account(2, "/2"), file("b"));

        assert_eq!(index.find_config_file(&account(2, "/2")), Ok(file("b")));

        // A stored URL has to be matched exactly.
        let by_address_only = Account::new(address(1), AccountUrl::default());
        assert_eq!(
            index.find_config_file(&by_address_only),
            Err(LookupError::ConfigFileNotFound(by_address_only.clone()))
        );

        // Accounts stored without a URL match on address alone.
        let bare = Account::new(address(3), AccountUrl::default());
        index.insert(bare.clone(), file("c"));
        assert_eq!(index.find_config_file(&account(3, "/anything")), Ok(file("c")));
        assert_eq!(index.find_config_file(&bare), Ok(file("c")));

        let wrong_url = account(1, "/2");
        assert_eq!(
            index.find_config_file(&wrong_url),
            Err(LookupError::ConfigFileNotFound(wrong_url.clone()))
        );
    }
}
