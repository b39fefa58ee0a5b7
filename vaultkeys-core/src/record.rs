//! Account metadata records.
//!
//! Each file in an account directory describes one secret in the vault:
//! the address it unlocks and where the secret lives. The record never holds
//! key material.
//!
//! ```json
//! {
//!   "address": "4d6d744b6da435b5bbdde2526dc20e9a41cb72e5",
//!   "vaultsecret": {
//!     "pathparams": {
//!       "secretenginepath": "kv",
//!       "secretpath": "acct",
//!       "secretversion": 1
//!     },
//!     "authid": "FOO"
//!   },
//!   "id": "0b2a...",
//!   "version": 1
//! }
//! ```

use crate::account::Account;
use crate::account_url::AccountUrl;
use crate::address::Address;
use crate::error::{RecordError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// Contents of one account file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Hex address, with or without `0x`.
    #[serde(default, alias = "Address")]
    pub address: String,

    #[serde(default, rename = "vaultsecret", alias = "VaultSecret")]
    pub vault_secret: VaultSecret,

    #[serde(default, alias = "ID")]
    pub id: String,

    /// Record layout version.
    #[serde(default, alias = "Version")]
    pub version: u32,
}

/// Where the secret lives and which credentials read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSecret {
    #[serde(default, rename = "pathparams", alias = "PathParams")]
    pub path_params: PathParams,

    /// Selects the authentication credentials; empty means the default set.
    #[serde(default, rename = "authid", alias = "AuthID")]
    pub auth_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParams {
    #[serde(default, rename = "secretenginepath", alias = "SecretEnginePath")]
    pub secret_engine_path: String,

    #[serde(default, rename = "secretpath", alias = "SecretPath")]
    pub secret_path: String,

    #[serde(default, rename = "secretversion", alias = "SecretVersion")]
    pub secret_version: i64,
}

impl AccountRecord {
    /// Reads and decodes a record file. Does not validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| RecordError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| RecordError::parse(path, e))
    }

    /// Checks the record has everything needed to look its secret up.
    pub fn validate_for_retrieval(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(RecordError::Validation("address must be set".into()));
        }
        self.address
            .parse::<Address>()
            .map_err(|e| RecordError::Validation(e.to_string()))?;

        let params = &self.vault_secret.path_params;
        if params.secret_engine_path.is_empty() {
            return Err(RecordError::Validation(
                "secret engine path must be set".into(),
            ));
        }
        if params.secret_path.is_empty() {
            return Err(RecordError::Validation("secret path must be set".into()));
        }
        if params.secret_version <= 0 {
            return Err(RecordError::Validation(format!(
                "secret version must be greater than zero, got {}",
                params.secret_version
            )));
        }
        Ok(())
    }

    /// Builds the account this record describes on the given vault server.
    ///
    /// The URL is `{vault}/v1/{engine}/data/{path}?version={n}`, with the
    /// auth id (if any) as URL user info.
    pub fn to_account(&self, vault_addr: &str) -> Result<Account> {
        let address = self
            .address
            .parse::<Address>()
            .map_err(|e| RecordError::Construction(e.to_string()))?;

        let params = &self.vault_secret.path_params;
        let raw = format!(
            "{}/v1/{}/data/{}?version={}",
            vault_addr.trim_end_matches('/'),
            params.secret_engine_path,
            params.secret_path,
            params.secret_version
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| RecordError::Construction(format!("invalid url '{}': {}", raw, e)))?;

        let auth_id = &self.vault_secret.auth_id;
        if !auth_id.is_empty() && url.set_username(auth_id).is_err() {
            return Err(RecordError::Construction(format!(
                "cannot attach auth id to '{}'",
                raw
            )));
        }

        Ok(Account::new(address, AccountUrl::from(&url)))
    }
}
