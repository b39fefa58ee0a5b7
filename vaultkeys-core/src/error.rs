//! Error types for account records and client configuration.
//!
//! None of these cross the cache's query boundary. The cache logs them and
//! skips the offending file; the CLI surfaces configuration errors directly.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for functions that read account records.
pub type Result<T> = std::result::Result<T, RecordError>;

/// A hex string that doesn't decode to a 20-byte address.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddressError {
    #[error("invalid hex in address: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("address must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// A string that doesn't look like `scheme://authority/path`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid account url '{raw}': {source}")]
    Parse {
        raw: String,
        #[source]
        source: url::ParseError,
    },
}

/// Things that can go wrong turning an account file into an account.
#[derive(Error, Debug)]
pub enum RecordError {
    /// Couldn't read the file from disk.
    #[error("failed to read account file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file isn't valid JSON, or doesn't match the record layout.
    #[error("failed to decode account file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The record parsed but is missing something retrieval needs.
    #[error("invalid account record: {0}")]
    Validation(String),

    /// The record is valid but no account can be built from it.
    #[error("failed to build account: {0}")]
    Construction(String),
}

impl RecordError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a decode error with the path for context.
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Problems loading a vault client configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid url in '{field}': {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid unlock address: {0}")]
    Address(#[from] AddressError),
}
