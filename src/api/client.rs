//! HTTP client for the my.adp.com employee portal.
//!
//! Every request here replays what the portal's browser front-end sends when
//! a human logs in and opens their pay statements. There is no stable remote
//! contract: when ADP changes the portal, this client fails loudly with an
//! `InvalidResponse` rather than guessing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::auth::{Credentials, SessionData};
use crate::models::PayStatement;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// SiteMinder login form endpoint. A successful POST answers with a redirect
/// to `target` and a FORMCRED cookie.
const LOGIN_URL: &str = "https://agateway.adp.com/siteminderagent/forms/login.fcc";

/// Origin everything after login lives on, and the origin that relative
/// `/l2` document links resolve against.
const PORTAL_ORIGIN: &str = "https://my.adp.com";

/// Landing page the browser loads right after login. Fetching it hands out
/// the SMSESSION cookie plus assorted keep-alive cookies.
const LANDING_PATH: &str = "/static/redbox/";

/// Identity endpoint reporting the logged-in employee's associate OID.
const IDENTITY_PATH: &str = "/redboxapi/identity/v1/self";

/// Pay statement listing endpoint.
const STATEMENTS_PATH: &str = "/v1_0/O/A/payStatements";

/// Cookie the portal session lives in once login succeeds.
const SESSION_COOKIE: &str = "SMSESSION";

/// HTTP request timeout in seconds.
/// 30s allows for slow portal responses while still failing fast.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The listing's `adjustments` query parameter. Unclear what it does; the
/// portal front-end sends `yes`, so we do too.
const ADJUSTMENTS: &str = "yes";

// ============================================================================
// Wire types (portal JSON, camelCase)
// ============================================================================

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    associateoid: String,
}

#[derive(Debug, Deserialize)]
struct StatementsResponse {
    #[serde(rename = "payStatements", default)]
    pay_statements: Vec<RawStatement>,
}

#[derive(Debug, Deserialize)]
struct RawStatement {
    #[serde(rename = "payDate")]
    pay_date: String,
    #[serde(rename = "statementImageUri")]
    image_uri: ImageUri,
}

#[derive(Debug, Deserialize)]
struct ImageUri {
    href: String,
}

impl RawStatement {
    fn into_statement(self, origin: &str) -> Result<PayStatement, ApiError> {
        let pay_date = NaiveDate::parse_from_str(&self.pay_date, "%Y-%m-%d").map_err(|_| {
            ApiError::InvalidResponse(format!("Unparseable pay date {:?}", self.pay_date))
        })?;
        Ok(PayStatement {
            pay_date,
            document_url: resolve_document_url(origin, &self.image_uri.href),
        })
    }
}

/// Statement links come back under an `/l2` gateway prefix; the actual
/// document lives at the same path on the portal origin.
fn resolve_document_url(origin: &str, href: &str) -> String {
    match href.strip_prefix("/l2") {
        Some(rest) => format!("{}{}", origin, rest),
        None => href.to_string(),
    }
}

/// Unauthenticated API requests bounce to an HTML login page instead of
/// answering 401, so an HTML body where JSON or a PDF belongs means the
/// session was not accepted.
fn looks_like_html(body: &str) -> bool {
    body.trim_start().starts_with('<')
}

/// Locale value for the ADPLangLocalCookie cookie, e.g. `en_US`.
fn system_locale() -> String {
    let raw = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .ok();
    locale_from(raw)
}

fn locale_from(raw: Option<String>) -> String {
    raw.as_deref()
        .and_then(|v| v.split('.').next())
        .filter(|v| !v.is_empty() && *v != "C" && *v != "POSIX")
        .unwrap_or("en_US")
        .to_string()
}

/// HTTP client for the portal.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct PortalClient {
    client: Client,
    jar: Arc<Jar>,
    login_url: String,
    portal_origin: String,
}

impl PortalClient {
    /// Create a client against the real ADP endpoints
    pub fn new() -> Result<Self> {
        Self::with_origins(LOGIN_URL, PORTAL_ORIGIN)
    }

    /// Create a client against a specific login endpoint and portal origin.
    /// Production goes through `new`; tests point this at a stub server.
    pub fn with_origins(login_url: &str, portal_origin: &str) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_provider(jar.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            jar,
            login_url: login_url.to_string(),
            portal_origin: portal_origin.trim_end_matches('/').to_string(),
        })
    }

    /// Log in and establish the cookie session, returning what the portal
    /// told us about the account.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<SessionData> {
        // Step 1: the SiteMinder login form, with `target` set to where a
        // browser would go next.
        let landing_url = self.portal_url(LANDING_PATH);
        let form = [
            ("user", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("target", landing_url.as_str()),
        ];
        self.client
            .post(&self.login_url)
            .form(&form)
            .send()
            .await
            .context("Failed to send login request")?;

        // Step 2: load the landing page like a human would, collecting the
        // rest of the session cookies.
        self.client
            .get(&landing_url)
            .send()
            .await
            .context("Failed to load landing page")?;

        if !self.has_cookie(SESSION_COOKIE)? {
            return Err(ApiError::Authentication(format!(
                "No {} cookie after login - the portal rejected the credentials",
                SESSION_COOKIE
            ))
            .into());
        }

        // Step 3: look up the associate OID for the logged-in employee.
        let response = self
            .client
            .get(self.portal_url(IDENTITY_PATH))
            .send()
            .await
            .context("Failed to fetch identity")?;
        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .context("Failed to read identity response body")?;

        if looks_like_html(&text) {
            return Err(ApiError::Authentication(
                "Identity lookup returned the login page instead of JSON".to_string(),
            )
            .into());
        }

        let identity: IdentityResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Identity response: {}", e)))?;
        debug!(associate_oid = %identity.associateoid, "Identity resolved");

        // Step 4: seed the cookies the statement endpoints expect from the
        // front-end.
        self.add_cookie("idtoken", &identity.associateoid)?;
        self.add_cookie("ADPLangLocalCookie", &system_locale())?;

        Ok(SessionData {
            associate_oid: identity.associateoid,
            username: credentials.username.clone(),
            created_at: Utc::now(),
        })
    }

    /// List the most recent pay statements, newest first as the portal
    /// returns them. Calling this twice in one session is a plain re-read.
    pub async fn fetch_statements(&self, limit: u32) -> Result<Vec<PayStatement>> {
        let query = [
            ("adjustments", ADJUSTMENTS.to_string()),
            ("numberoflastpaydates", limit.to_string()),
        ];
        let response = self
            .client
            .get(self.portal_url(STATEMENTS_PATH))
            .query(&query)
            .send()
            .await
            .context("Failed to fetch statement list")?;

        let response = Self::check_response(response).await?;
        let text = response
            .text()
            .await
            .context("Failed to read statement list body")?;
        debug!("Statement list response received");

        if looks_like_html(&text) {
            return Err(ApiError::Authentication(
                "Statement listing returned the login page - session was not accepted".to_string(),
            )
            .into());
        }

        let parsed: StatementsResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Statement list: {}", e)))?;

        let mut statements = Vec::with_capacity(parsed.pay_statements.len());
        for raw in parsed.pay_statements {
            statements.push(raw.into_statement(&self.portal_origin)?);
        }
        Ok(statements)
    }

    /// Fetch one statement's PDF bytes.
    pub async fn download_statement(&self, statement: &PayStatement) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&statement.document_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch statement for {}", statement.pay_date))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body).into());
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html"));

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read statement body for {}", statement.pay_date))?;

        // A success status carrying HTML means the session bounced back to
        // the login page; saving that as a PDF would be silent corruption.
        if is_html || looks_like_html(&String::from_utf8_lossy(&bytes[..bytes.len().min(64)])) {
            return Err(ApiError::Authentication(format!(
                "Download for {} returned the login page - session was not accepted",
                statement.pay_date
            ))
            .into());
        }

        if bytes.is_empty() {
            return Err(ApiError::InvalidResponse(format!(
                "Empty document body for {}",
                statement.pay_date
            ))
            .into());
        }

        debug!(pay_date = %statement.pay_date, bytes = bytes.len(), "Statement downloaded");
        Ok(bytes.to_vec())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    fn portal_url(&self, path: &str) -> String {
        format!("{}{}", self.portal_origin, path)
    }

    // Host-only cookie on the portal origin, the way the front-end sets them
    fn add_cookie(&self, name: &str, value: &str) -> Result<()> {
        let origin = self.origin_url()?;
        self.jar
            .add_cookie_str(&format!("{}={}; Path=/", name, value), &origin);
        Ok(())
    }

    fn has_cookie(&self, name: &str) -> Result<bool> {
        let origin = self.origin_url()?;
        let Some(header) = self.jar.cookies(&origin) else {
            return Ok(false);
        };
        let prefix = format!("{}=", name);
        Ok(header
            .to_str()
            .map(|cookies| cookies.split("; ").any(|c| c.starts_with(&prefix)))
            .unwrap_or(false))
    }

    fn origin_url(&self) -> Result<Url> {
        self.portal_origin
            .parse()
            .with_context(|| format!("Invalid portal origin {}", self.portal_origin))
    }
}
