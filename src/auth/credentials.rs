use std::path::Path;

use anyhow::{bail, Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "adp-fetch";

/// Environment variables checked before any file or keychain lookup
const USERNAME_VAR: &str = "ADP_USERNAME";
const PASSWORD_VAR: &str = "ADP_PASSWORD";

/// A username/password pair, held in memory for the duration of one run.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Resolve credentials, in order: `ADP_USERNAME`/`ADP_PASSWORD`
    /// environment variables, then a two-line credentials file, then the OS
    /// keychain for a previously remembered username.
    ///
    /// `explicit_file` was named on the command line and must exist;
    /// `config_file` is the configured default and is skipped when absent.
    pub fn resolve(
        explicit_file: Option<&Path>,
        config_file: Option<&Path>,
        known_username: Option<&str>,
    ) -> Result<Self> {
        if let (Ok(username), Ok(password)) =
            (std::env::var(USERNAME_VAR), std::env::var(PASSWORD_VAR))
        {
            debug!("Using credentials from environment");
            return Ok(Self { username, password });
        }

        if let Some(path) = explicit_file {
            if !path.exists() {
                bail!("Credentials file {} does not exist", path.display());
            }
            return Self::from_file(path);
        }

        if let Some(path) = config_file {
            if path.exists() {
                return Self::from_file(path);
            }
            debug!(path = %path.display(), "Configured credentials file not present");
        }

        let username = std::env::var(USERNAME_VAR)
            .ok()
            .or_else(|| known_username.map(str::to_string));
        if let Some(username) = username {
            debug!(username = %username, "Using password from the OS keychain");
            let password = CredentialStore::get_password(&username)?;
            return Ok(Self { username, password });
        }

        bail!(
            "No credentials found: set {}/{}, point --creds at a credentials file, \
             or store a password once with --remember",
            USERNAME_VAR,
            PASSWORD_VAR
        )
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Using credentials file");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        Self::parse_file(&contents)
            .with_context(|| format!("Malformed credentials file {}", path.display()))
    }

    /// Parse the two-line credentials file format: username on line 1,
    /// password on line 2.
    fn parse_file(contents: &str) -> Result<Self> {
        let mut lines = contents.lines();
        let username = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty());
        let password = lines.next().filter(|line| !line.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok(Self {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => bail!("Expected username on line 1 and password on line 2"),
        }
    }
}

pub struct CredentialStore;

impl CredentialStore {
    /// Store username and password in the OS keychain
    pub fn store(username: &str, password: &str) -> Result<()> {
        let entry =
            Entry::new(SERVICE_NAME, username).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve password for a username from the OS keychain
    pub fn get_password(username: &str) -> Result<String> {
        let entry =
            Entry::new(SERVICE_NAME, username).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete stored credentials for a username
    pub fn delete(username: &str) -> Result<()> {
        let entry =
            Entry::new(SERVICE_NAME, username).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}
