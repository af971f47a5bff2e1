use chrono::{DateTime, Utc};

/// The authenticated portal context for a single run.
///
/// The session itself lives in the HTTP client's cookie jar; this records
/// what the portal told us about the account while establishing it. Never
/// written to disk - the next run logs in again.
#[derive(Debug, Clone)]
pub struct SessionData {
    /// ADP's unique identifier for the employee ("associateoid")
    pub associate_oid: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}
