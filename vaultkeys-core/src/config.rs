//! Vault client configuration.
//!
//! A config file lists one or more vault clients. Each names the vault
//! server, the local directory holding that server's account files, the
//! accounts to unlock at startup, and where credentials come from.
//! Credentials are never written into the file: they are references of the
//! form `env://NAME`, resolved from the process environment on use.
//!
//! ```json
//! {
//!   "vault": "https://localhost:8200",
//!   "accountDirectory": "file:///var/lib/vaultkeys/accounts",
//!   "unlock": ["0x4d6d744b6da435b5bbdde2526dc20e9a41cb72e5"],
//!   "authentication": {
//!     "token": "env://VAULT_TOKEN",
//!     "roleId": "",
//!     "secretId": "",
//!     "approlePath": ""
//!   },
//!   "tls": {
//!     "caCert": "file:///etc/vault/ca.pem",
//!     "clientCert": "",
//!     "clientKey": ""
//!   }
//! }
//! ```

use crate::address::Address;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

type Result<T> = std::result::Result<T, ConfigError>;

/// One vault server and the account directory that mirrors it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultClientConfig {
    /// Base URL of the vault server.
    pub vault: Url,

    /// Local directory with one metadata file per account.
    pub account_directory: PathBuf,

    /// Accounts to unlock when the client starts.
    pub unlock: Vec<Address>,

    pub authentication: Authentication,

    pub tls: TlsConfig,
}

/// Credential references. Either a token, or an approle id/secret pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    pub token: EnvVar,
    pub role_id: EnvVar,
    pub secret_id: EnvVar,

    /// Mount path of the approle auth method. Empty means "approle".
    pub approle_path: String,
}

impl Authentication {
    /// True when both approle credentials resolve in the current environment.
    pub fn uses_approle(&self) -> bool {
        self.role_id.is_set() && self.secret_id.is_set()
    }
}

/// Client TLS material, as local file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

/// A reference to an environment variable, written as `env://NAME`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVar {
    name: Option<String>,
}

impl EnvVar {
    /// References the named variable.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    fn parse(field: &'static str, raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Self::default());
        }
        match raw.strip_prefix("env://") {
            Some(name) if !name.is_empty() => Ok(Self::named(name)),
            _ => Err(ConfigError::Invalid(format!(
                "{} must look like env://NAME, got '{}'",
                field, raw
            ))),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True if a variable is referenced and present in the environment.
    pub fn is_set(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| std::env::var_os(name).is_some())
    }

    /// Current value of the referenced variable.
    pub fn get(&self) -> Option<String> {
        self.name.as_deref().and_then(|name| std::env::var(name).ok())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClient {
    #[serde(alias = "Vault")]
    vault: String,
    #[serde(alias = "AccountDirectory")]
    account_directory: String,
    #[serde(default, alias = "Unlock")]
    unlock: Vec<String>,
    #[serde(default, alias = "Authentication")]
    authentication: RawAuthentication,
    #[serde(default, alias = "Tls", alias = "TLS")]
    tls: RawTls,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthentication {
    #[serde(default, alias = "Token")]
    token: String,
    #[serde(default, alias = "RoleId")]
    role_id: String,
    #[serde(default, alias = "SecretId")]
    secret_id: String,
    #[serde(default, alias = "ApprolePath")]
    approle_path: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTls {
    #[serde(default, alias = "CaCert")]
    ca_cert: String,
    #[serde(default, alias = "ClientCert")]
    client_cert: String,
    #[serde(default, alias = "ClientKey")]
    client_key: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Box<RawClient>),
    Many(Vec<RawClient>),
}

impl VaultClientConfig {
    /// Reads every client from a config file.
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let clients = Self::from_json(&source)?;
        debug!("Loaded {} vault clients from {}", clients.len(), path.display());
        Ok(clients)
    }

    /// Parses either a single client object or an array of them.
    pub fn from_json(source: &str) -> Result<Vec<Self>> {
        let raw = match serde_json::from_str(source)? {
            OneOrMany::One(client) => vec![*client],
            OneOrMany::Many(clients) => clients,
        };
        if raw.is_empty() {
            return Err(ConfigError::Invalid("no vault clients configured".into()));
        }
        raw.into_iter().map(Self::try_from).collect()
    }
}

impl TryFrom<RawClient> for VaultClientConfig {
    type Error = ConfigError;

    fn try_from(raw: RawClient) -> Result<Self> {
        let vault = parse_url("vault", &raw.vault)?;
        if !matches!(vault.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "vault must be an http(s) url, got '{}'",
                raw.vault
            )));
        }

        let account_directory = parse_file_url("accountDirectory", &raw.account_directory)?
            .ok_or_else(|| ConfigError::Invalid("accountDirectory must be set".into()))?;

        let unlock = raw
            .unlock
            .iter()
            .map(|addr| addr.parse::<Address>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let auth = raw.authentication;
        let authentication = Authentication {
            token: EnvVar::parse("authentication.token", &auth.token)?,
            role_id: EnvVar::parse("authentication.roleId", &auth.role_id)?,
            secret_id: EnvVar::parse("authentication.secretId", &auth.secret_id)?,
            approle_path: auth.approle_path,
        };

        let tls = TlsConfig {
            ca_cert: parse_file_url("tls.caCert", &raw.tls.ca_cert)?,
            client_cert: parse_file_url("tls.clientCert", &raw.tls.client_cert)?,
            client_key: parse_file_url("tls.clientKey", &raw.tls.client_key)?,
        };

        Ok(Self {
            vault,
            account_directory,
            unlock,
            authentication,
            tls,
        })
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })
}

/// Empty strings mean "not configured".
fn parse_file_url(field: &'static str, raw: &str) -> Result<Option<PathBuf>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let url = parse_url(field, raw)?;
    if url.scheme() != "file" {
        return Err(ConfigError::Invalid(format!(
            "{} must be a file:// url, got '{}'",
            field, raw
        )));
    }
    url.to_file_path()
        .map(Some)
        .map_err(|_| ConfigError::Invalid(format!("{} is not a local path: '{}'", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SINGLE: &str = r#"{
        "vault": "https://localhost:8200",
        "accountDirectory": "file:///tmp/vaultkeys/accounts",
        "unlock": ["0x4d6d744b6da435b5bbdde2526dc20e9a41cb72e5"],
        "authentication": {
            "token": "env://VAULTKEYS_TEST_TOKEN",
            "roleId": "env://VAULTKEYS_TEST_ROLE",
            "secretId": "env://VAULTKEYS_TEST_SECRET",
            "approlePath": "my-approle"
        },
        "tls": {
            "caCert": "file:///tmp/ca.pem",
            "clientCert": "",
            "clientKey": ""
        }
    }"#;

    #[cfg(unix)]
    #[test]
    fn test_single_client() {
        let clients = VaultClientConfig::from_json(SINGLE).unwrap();
        assert_eq!(clients.len(), 1);

        let client = &clients[0];
        assert_eq!(client.vault.as_str(), "https://localhost:8200/");
        assert_eq!(
            client.account_directory,
            PathBuf::from("/tmp/vaultkeys/accounts")
        );
        assert_eq!(client.unlock.len(), 1);
        assert_eq!(
            client.authentication.token.name(),
            Some("VAULTKEYS_TEST_TOKEN")
        );
        assert_eq!(client.authentication.approle_path, "my-approle");
        assert_eq!(client.tls.ca_cert, Some(PathBuf::from("/tmp/ca.pem")));
        assert_eq!(client.tls.client_cert, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_array_with_go_style_keys() {
        let source = r#"[
            {"Vault": "http://one:8200", "AccountDirectory": "file:///tmp/one"},
            {"Vault": "http://two:8200", "AccountDirectory": "file:///tmp/two", "TLS": {}}
        ]"#;
        let clients = VaultClientConfig::from_json(source).unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[1].account_directory, PathBuf::from("/tmp/two"));
        assert_eq!(clients[0].authentication, Authentication::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let not_file = r#"{"vault": "http://v:8200", "accountDirectory": "http://x/y"}"#;
        assert!(matches!(
            VaultClientConfig::from_json(not_file),
            Err(ConfigError::Invalid(_))
        ));

        let bad_env = r#"{
            "vault": "http://v:8200",
            "accountDirectory": "file:///tmp/a",
            "authentication": {"token": "TOKEN"}
        }"#;
        assert!(VaultClientConfig::from_json(bad_env).is_err());

        let bad_unlock = r#"{
            "vault": "http://v:8200",
            "accountDirectory": "file:///tmp/a",
            "unlock": ["0x12"]
        }"#;
        assert!(matches!(
            VaultClientConfig::from_json(bad_unlock),
            Err(ConfigError::Address(_))
        ));

        assert!(VaultClientConfig::from_json("[]").is_err());
    }

    #[test]
    fn test_env_var_resolution() {
        let var = EnvVar::named("VAULTKEYS_TEST_ENV_RESOLUTION");
        assert!(!var.is_set());
        assert_eq!(var.get(), None);

        std::env::set_var("VAULTKEYS_TEST_ENV_RESOLUTION", "s3cret");
        assert!(var.is_set());
        assert_eq!(var.get().as_deref(), Some("s3cret"));
        std::env::remove_var("VAULTKEYS_TEST_ENV_RESOLUTION");

        assert!(!EnvVar::default().is_set());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_all_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SINGLE).unwrap();
        assert_eq!(VaultClientConfig::load_all(&path).unwrap().len(), 1);

        assert!(matches!(
            VaultClientConfig::load_all(&dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
