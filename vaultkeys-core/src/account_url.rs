//! Account URLs.
//!
//! Every account points at the place its secret lives. For vault-backed
//! accounts that's the secret's HTTP location, including the secret version
//! as a query suffix. The URL is kept in split form so the cache can order
//! accounts without re-parsing on every comparison.

use crate::error::UrlError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A structured account location: `scheme://host/path?query`.
///
/// Ordering compares scheme, then host (including any user info and port),
/// then path, then the query suffix. Field order matters for the derived
/// `Ord`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountUrl {
    /// URL scheme, e.g. "http".
    pub scheme: String,

    /// Authority: optional `user@`, host name and optional `:port`.
    pub host: String,

    /// Path component. For file-backed URLs this is a filesystem path.
    pub path: String,

    /// Disambiguating suffix, such as `version=2`.
    pub query: Option<String>,
}

impl AccountUrl {
    /// Creates a URL without a query suffix.
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query: None,
        }
    }

    /// A URL that only carries a path. Used when looking accounts up by file.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// True when no component is set.
    pub fn is_empty(&self) -> bool {
        self.scheme.is_empty() && self.host.is_empty() && self.path.is_empty() && self.query.is_none()
    }
}

impl From<&Url> for AccountUrl {
    fn from(url: &Url) -> Self {
        let mut host = String::new();
        if !url.username().is_empty() {
            host.push_str(url.username());
            host.push('@');
        }
        if let Some(name) = url.host_str() {
            host.push_str(name);
        }
        if let Some(port) = url.port() {
            host.push(':');
            host.push_str(&port.to_string());
        }

        Self {
            scheme: url.scheme().to_string(),
            host,
            path: url.path().to_string(),
            query: url.query().map(str::to_owned),
        }
    }
}

impl FromStr for AccountUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = Url::parse(s).map_err(|source| UrlError::Parse {
            raw: s.to_string(),
            source,
        })?;
        Ok(Self::from(&parsed))
    }
}

impl fmt::Display for AccountUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}://", self.scheme)?;
        }
        write!(f, "{}{}", self.host, self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

impl Serialize for AccountUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
