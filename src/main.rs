//! adp-fetch - download pay statement PDFs from the my.adp.com portal.
//!
//! Logs in the same way the portal's browser front-end does, lists the
//! available pay statements, and downloads any that are not already on disk.

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adp_fetch::api::PortalClient;
use adp_fetch::auth::{CredentialStore, Credentials};
use adp_fetch::config::Config;
use adp_fetch::fetcher::PaycheckFetcher;
use adp_fetch::store::StatementStore;

/// How many statements back to ask for when neither the CLI nor the config
/// says otherwise.
const DEFAULT_LIMIT: u32 = 30;

#[derive(Debug, Parser)]
#[command(
    name = "adp",
    about = "Download pay statement PDFs from my.adp.com",
    version
)]
struct Cli {
    /// How many pay statements back to look
    #[arg(long)]
    limit: Option<u32>,

    /// Path to a credentials file (username on line 1, password on line 2)
    #[arg(long, value_name = "FILE")]
    creds: Option<PathBuf>,

    /// Directory to save statements into (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Save the resolved credentials to the OS keychain for future runs
    #[arg(long)]
    remember: bool,

    /// Delete the remembered credentials from the OS keychain and exit
    #[arg(long, conflicts_with = "remember")]
    forget: bool,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load config")?;

    if cli.forget {
        let Some(username) = config.username.take() else {
            bail!("No remembered username to forget");
        };
        CredentialStore::delete(&username)?;
        config.save()?;
        info!(username = %username, "Removed credentials from the OS keychain");
        return Ok(());
    }

    let credentials = Credentials::resolve(
        cli.creds.as_deref(),
        config.credentials_file.as_deref(),
        config.username.as_deref(),
    )?;

    if cli.remember {
        CredentialStore::store(&credentials.username, &credentials.password)?;
        config.username = Some(credentials.username.clone());
        config.save()?;
        info!(username = %credentials.username, "Stored credentials in the OS keychain");
    }

    let limit = cli.limit.or(config.limit).unwrap_or(DEFAULT_LIMIT);
    let out_dir = cli
        .out
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let client = PortalClient::new()?;
    let store = StatementStore::new(out_dir)?;
    let fetcher = PaycheckFetcher::new(client, store);

    let summary = fetcher.run(&credentials, limit).await?;
    info!(
        listed = summary.listed,
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        "Run complete"
    );
    Ok(())
}
