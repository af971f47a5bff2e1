//! The end-to-end fetch sequence: authenticate, list, download, persist.
//!
//! Strictly sequential. There is no retry policy on purpose: the portal is an
//! unofficial contract, and when it breaks the right move is to fail loudly,
//! not to hammer it.

use anyhow::Result;
use tracing::info;

use crate::api::PortalClient;
use crate::auth::Credentials;
use crate::store::StatementStore;

/// What a run did, for the final log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchSummary {
    pub listed: usize,
    pub downloaded: usize,
    pub skipped: usize,
}

pub struct PaycheckFetcher {
    client: PortalClient,
    store: StatementStore,
}

impl PaycheckFetcher {
    pub fn new(client: PortalClient, store: StatementStore) -> Self {
        Self { client, store }
    }

    /// Log in, list the `limit` most recent statements, and download the
    /// ones not already on disk, oldest first. The first failure aborts the
    /// run.
    pub async fn run(&self, credentials: &Credentials, limit: u32) -> Result<FetchSummary> {
        let session = self.client.authenticate(credentials).await?;
        info!(
            username = %session.username,
            associate_oid = %session.associate_oid,
            at = %session.created_at,
            "Logged in"
        );

        let statements = self.client.fetch_statements(limit).await?;
        info!(count = statements.len(), "Statements listed");

        let needed = self.store.plan(&statements);
        let mut summary = FetchSummary {
            listed: statements.len(),
            skipped: statements.len() - needed.len(),
            downloaded: 0,
        };

        for statement in needed {
            let bytes = self.client.download_statement(statement).await?;
            let path = self.store.save(statement, &bytes)?;
            println!("Downloaded {}", path.display());
            summary.downloaded += 1;
        }

        Ok(summary)
    }
}
