//! Vaultkeys Core - account identities and their on-disk descriptions
//!
//! This crate holds the types every other vaultkeys crate speaks in:
//! addresses, account URLs and accounts. It also knows how to read the
//! per-account metadata files an account directory is made of, and the
//! client configuration that points at those directories.
//!
//! # Example
//!
//! ```no_run
//! use vaultkeys_core::AccountRecord;
//! use std::path::Path;
//!
//! let record = AccountRecord::from_file(Path::new("accounts/acct.json")).unwrap();
//! record.validate_for_retrieval().unwrap();
//! let account = record.to_account("http://localhost:8200").unwrap();
//! println!("{}", account);
//! ```

pub mod account;
pub mod account_url;
pub mod address;
pub mod config;
pub mod error;
pub mod record;

pub use account::Account;
pub use account_url::AccountUrl;
pub use address::{Address, ADDRESS_LENGTH};
pub use config::{Authentication, EnvVar, TlsConfig, VaultClientConfig};
pub use error::{AddressError, ConfigError, RecordError, Result, UrlError};
pub use record::{AccountRecord, PathParams, VaultSecret};
