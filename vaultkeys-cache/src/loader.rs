//! Turning account files into accounts.

use std::path::Path;
use vaultkeys_core::{Account, AccountRecord, RecordError};

/// Reads one metadata file into the account it describes.
///
/// Any error means "this file contributes no account". The cache logs it
/// and moves on.
pub trait AccountLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Account, RecordError>;
}

/// Loads JSON [`AccountRecord`] files for a single vault server.
#[derive(Debug, Clone)]
pub struct JsonAccountLoader {
    vault_addr: String,
}

impl JsonAccountLoader {
    pub fn new(vault_addr: impl Into<String>) -> Self {
        Self {
            vault_addr: vault_addr.into(),
        }
    }

    pub fn vault_addr(&self) -> &str {
        &self.vault_addr
    }
}

impl AccountLoader for JsonAccountLoader {
    fn load(&self, path: &Path) -> Result<Account, RecordError> {
        let record = AccountRecord::from_file(path)?;
        record.validate_for_retrieval()?;
        record.to_account(&self.vault_addr)
    }
}
