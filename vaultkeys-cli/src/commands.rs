//! CLI command implementations.

use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vaultkeys_cache::{AccountCache, CacheOptions, ChangeSignal, JsonAccountLoader, LookupError};
use vaultkeys_core::{Account, AccountUrl, Address, VaultClientConfig};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// One open account directory.
pub struct Source {
    pub cache: Arc<AccountCache>,
    pub changes: ChangeSignal,
}

/// Opens a cache per account directory, from a config file or a single
/// `--dir`/`--vault` pair.
pub fn open(
    config: Option<&Path>,
    dir: Option<&Path>,
    vault: &str,
    options: CacheOptions,
) -> Result<Vec<Source>> {
    let targets: Vec<(std::path::PathBuf, String)> = match (config, dir) {
        (Some(path), _) => VaultClientConfig::load_all(path)?
            .into_iter()
            .map(|client| {
                let auth = &client.authentication;
                if auth.uses_approle() {
                    debug!("Client for {} authenticates with approle", client.vault);
                } else if auth.token.get().is_none() {
                    warn!("No vault token in the environment for {}", client.vault);
                }
                (client.account_directory, client.vault.to_string())
            })
            .collect(),
        (None, Some(dir)) => vec![(dir.to_path_buf(), vault.to_string())],
        (None, None) => return Err("either --config or --dir is required".into()),
    };

    Ok(targets
        .into_iter()
        .map(|(dir, vault)| {
            let loader = JsonAccountLoader::new(vault);
            debug!("Opening {} for {}", dir.display(), loader.vault_addr());
            let (cache, changes) = AccountCache::with_options(dir, loader, options);
            Source { cache, changes }
        })
        .collect())
}

/// Print every account.
pub fn list(sources: &[Source], json_output: bool) -> Result<()> {
    let accounts: Vec<Account> = sources.iter().flat_map(|s| s.cache.accounts()).collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("{} No accounts found", "⚠".yellow());
        for source in sources {
            println!("  {}", source.cache.root().display().to_string().dimmed());
        }
        return Ok(());
    }

    print_accounts(&accounts);
    println!();
    println!("  {} {}", "Accounts:".dimmed(), accounts.len());
    Ok(())
}

fn print_accounts(accounts: &[Account]) {
    for account in accounts {
        println!("  {}  {}", account.address.to_string().cyan(), account.url);
    }
}

/// Resolve an address or account URL to a single account.
pub fn find(sources: &[Source], target: &str) -> Result<()> {
    let query = parse_query(target)?;

    for source in sources {
        source.cache.maybe_reload();
        match source.cache.find(&query) {
            Ok(account) => {
                println!("{} {}", "✓".green(), account);
                return Ok(());
            }
            Err(LookupError::NoMatch) => continue,
            Err(LookupError::AmbiguousAddress { address, matches }) => {
                println!("{} {} matches several accounts:", "⚠".yellow(), address);
                print_accounts(&matches);
                println!("  Pass one of the URLs to pick an account");
                return Err(LookupError::AmbiguousAddress { address, matches }.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(LookupError::NoMatch.into())
}

fn parse_query(target: &str) -> Result<Account> {
    if let Ok(address) = target.parse::<Address>() {
        return Ok(Account::new(address, AccountUrl::default()));
    }
    let url: AccountUrl = target
        .parse()
        .map_err(|e| format!("'{}' is neither an address nor an account url ({})", target, e))?;
    Ok(Account::new(Address::ZERO, url))
}

/// Print the metadata file an account was loaded from.
///
/// Without a URL the address is first resolved to its one account, since a
/// stored URL only matches exactly.
pub fn config_file(sources: &[Source], address: &str, url: Option<&str>) -> Result<()> {
    let address: Address = address.parse()?;
    let url = match url {
        Some(raw) => raw.parse()?,
        None => AccountUrl::default(),
    };
    let query = Account::new(address, url);

    for source in sources {
        source.cache.maybe_reload();
        let account = if query.url.is_empty() {
            match source.cache.find(&query) {
                Ok(account) => account,
                Err(LookupError::NoMatch) => continue,
                Err(e) => return Err(e.into()),
            }
        } else {
            query.clone()
        };
        if let Ok(path) = source.cache.find_config_file(&account) {
            println!("{}", path.display());
            return Ok(());
        }
    }

    Err(LookupError::ConfigFileNotFound(query).into())
}

/// Follow the account directories until Ctrl+C.
pub async fn watch(sources: Vec<Source>, reload: Duration) -> Result<()> {
    let caches: Vec<Arc<AccountCache>> = sources.iter().map(|s| s.cache.clone()).collect();

    let mut printers = Vec::new();
    for Source { cache, changes } in sources {
        printers.push(tokio::task::spawn_blocking(move || {
            while changes.recv().is_ok() {
                let accounts = cache.accounts();
                println!(
                    "{} {} ({} accounts)",
                    "↻".cyan(),
                    cache.root().display(),
                    accounts.len()
                );
                print_accounts(&accounts);
            }
        }));
    }

    // First pass fills the caches and starts the watchers.
    let initial = caches.clone();
    tokio::task::spawn_blocking(move || initial.iter().for_each(|c| c.maybe_reload())).await?;

    for cache in &caches {
        let mode = if cache.is_watching() {
            "watching".green()
        } else {
            "polling".yellow()
        };
        info!("Following {} ({})", cache.root().display(), mode);
    }
    println!("  Press {} to stop", "Ctrl+C".cyan());

    // Covers caches that fell back to polling.
    let mut ticker = tokio::time::interval(reload.max(Duration::from_millis(100)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let caches = caches.clone();
                tokio::task::spawn_blocking(move || caches.iter().for_each(|c| c.maybe_reload()))
                    .await?;
            }
            res = &mut ctrl_c => {
                res?;
                break;
            }
        }
    }

    for cache in &caches {
        cache.close();
    }
    for printer in printers {
        printer.await?;
    }
    println!("{} Stopped", "✓".green());

    Ok(())
}
