// src/bin/cli.rs

//! ebay2parcel CLI
//!
//! One invocation runs one sync across every configured eBay account.
//!
//! Exit codes: 0 success, 1 runtime or persistence failure, 2 stopped by a
//! Parcel rate limit, 3 configuration error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ebay2parcel::{
    error::{AppError, Result},
    models::{Config, StoredEntry, redact},
    pipeline,
    services::AccountIterator,
    storage::{HistoryStore, LocalHistoryStore},
    utils,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_THROTTLED: u8 = 2;
const EXIT_CONFIG: u8 = 3;

const PARCEL_API_KEY: &str = "PARCEL_API_KEY";

/// ebay2parcel - copy eBay purchase tracking numbers into Parcel
#[derive(Parser, Debug)]
#[command(name = "ebay2parcel", version, about = "Sync eBay purchase tracking into Parcel")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "ebay2parcel.toml")]
    config: PathBuf,

    /// Load environment variables from this file instead of `./.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one sync across all accounts (default)
    Sync,

    /// Check configuration, accounts and the Parcel API key
    Validate,

    /// List resolved eBay accounts with secrets redacted
    Accounts,

    /// Show the submission history
    History {
        /// Number of most recent entries to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

/// Initialize logging. `RUST_LOG` overrides the configured level.
fn init_logging(level: &str, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        utils::log::level_filter(level)
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.to_string().to_lowercase()),
    )
    .format_timestamp_secs()
    .init();
}

/// Load `.env` (or `--env-file`). A missing default `.env` is fine; a
/// malformed one is a configuration error.
fn load_env_file(path: Option<&Path>) -> Result<()> {
    let loaded = match path {
        Some(path) => dotenv::from_path(path).map(|()| path.to_path_buf()),
        None => dotenv::dotenv(),
    };
    match loaded {
        Ok(loaded) => {
            log::debug!("Loaded environment from {}", loaded.display());
            Ok(())
        }
        Err(e) if path.is_none() && e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Read the config file (defaults if absent), apply env overrides, validate.
fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)?
    } else {
        Config::default()
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn parcel_api_key() -> Result<String> {
    std::env::var(PARCEL_API_KEY)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| AppError::config(format!("{PARCEL_API_KEY} is not set")))
}

async fn run(cli: Cli, config: Config) -> Result<u8> {
    let accounts = AccountIterator::from_env().accounts();

    match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => {
            let api_key = parcel_api_key()?;
            let mut history = LocalHistoryStore::new(&config.history.path);
            let report = pipeline::run_sync(&config, &accounts, &mut history, &api_key).await?;

            if report.is_throttled() {
                return Ok(EXIT_THROTTLED);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!("✓ Config OK ({})", cli.config.display());

            if accounts.is_empty() {
                return Err(AppError::config("no complete eBay account found"));
            }
            log::info!("✓ {} eBay account(s) resolved", accounts.len());
            for account in accounts.iter().filter(|a| !a.has_access_token()) {
                log::warn!(
                    "Account {} has no user token; its sync will stop with an auth error",
                    account.run_name
                );
            }

            parcel_api_key()?;
            log::info!("✓ {PARCEL_API_KEY} set");

            let mut history = LocalHistoryStore::new(&config.history.path);
            history.load().await?;
            log::info!("✓ History readable ({} entries)", history.len());

            log::info!("All validations passed!");
        }

        Command::Accounts => {
            if accounts.is_empty() {
                log::warn!("No eBay accounts configured");
            }
            for account in &accounts {
                utils::log::sub_item(&format!(
                    "{} app_id={} dev_id={} client_secret={} user_token={} refresh_token={}",
                    account.run_name,
                    account.app_id,
                    account.dev_id,
                    redact(&account.client_secret),
                    redact(&account.access_token),
                    redact(&account.refresh_token),
                ));
            }
        }

        Command::History { limit } => {
            let mut history = LocalHistoryStore::new(&config.history.path);
            history.load().await?;

            log::info!(
                "History file: {} ({} entries)",
                history.path().display(),
                history.len()
            );
            let entries = history.entries();
            for entry in &entries[entries.len().saturating_sub(limit)..] {
                let line = match entry {
                    StoredEntry::Detailed(e) => format!(
                        "{} added {} account={} carrier={}",
                        e.tracking_number,
                        e.added_at.to_rfc3339(),
                        e.account.as_deref().unwrap_or("-"),
                        e.carrier.as_deref().unwrap_or("-"),
                    ),
                    StoredEntry::Bare(number) => number.clone(),
                };
                utils::log::sub_item(&line);
            }
        }
    }

    Ok(0)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_loaded = load_env_file(cli.env_file.as_deref());
    let config = load_config(&cli.config);

    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level, cli.verbose);

    let config = match env_loaded.and(config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) if e.is_config() => {
            log::error!("{e}");
            ExitCode::from(EXIT_CONFIG)
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
