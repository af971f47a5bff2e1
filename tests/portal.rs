//! Integration tests driving the client and the full fetch sequence against
//! a stub portal.

use std::fs;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adp_fetch::api::{ApiError, PortalClient};
use adp_fetch::auth::Credentials;
use adp_fetch::fetcher::PaycheckFetcher;
use adp_fetch::store::StatementStore;

fn credentials() -> Credentials {
    Credentials {
        username: "someone".to_string(),
        password: "hunter2".to_string(),
    }
}

fn client_for(server: &MockServer) -> PortalClient {
    PortalClient::with_origins(
        &format!("{}/siteminderagent/forms/login.fcc", server.uri()),
        &server.uri(),
    )
    .expect("client builds")
}

/// Stub the login sequence: form POST, landing page handing out SMSESSION,
/// and the identity lookup.
async fn stub_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/siteminderagent/forms/login.fcc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/static/redbox/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "SMSESSION=stub-session; Path=/"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/redboxapi/identity/v1/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "associateoid": "G3ABCDEF12345678"
        })))
        .mount(server)
        .await;
}

async fn stub_two_statements(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1_0/O/A/payStatements"))
        .and(query_param("adjustments", "yes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "payStatements": [
                {
                    "payDate": "2024-02-29",
                    "statementImageUri": { "href": "/l2/v1_0/O/A/payStatement/feb" }
                },
                {
                    "payDate": "2024-01-31",
                    "statementImageUri": { "href": "/l2/v1_0/O/A/payStatement/jan" }
                }
            ]
        })))
        .mount(server)
        .await;

    for doc in ["feb", "jan"] {
        Mock::given(method("GET"))
            .and(path(format!("/v1_0/O/A/payStatement/{}", doc)))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(format!("%PDF-1.7 stub statement {}", doc).into_bytes()),
            )
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn full_run_downloads_each_listed_statement_once() {
    let server = MockServer::start().await;
    stub_login(&server).await;
    stub_two_statements(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = PaycheckFetcher::new(
        client_for(&server),
        StatementStore::new(dir.path().to_path_buf()).unwrap(),
    );

    let summary = fetcher.run(&credentials(), 30).await.expect("run succeeds");
    assert_eq!(summary.listed, 2);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.skipped, 0);

    for name in ["2024-01-31.pdf", "2024-02-29.pdf"] {
        let contents = fs::read(dir.path().join(name)).expect("file exists");
        assert!(!contents.is_empty());
    }

    // A second run over the same directory finds everything already on disk
    let summary = fetcher.run(&credentials(), 30).await.expect("rerun succeeds");
    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.skipped, 2);
}

#[tokio::test]
async fn login_without_session_cookie_is_an_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/siteminderagent/forms/login.fcc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    // Landing page loads fine but hands out no SMSESSION cookie, which is
    // what a rejected login looks like
    Mock::given(method("GET"))
        .and(path("/static/redbox/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .authenticate(&credentials())
        .await
        .expect_err("login must fail");
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Authentication(_))
    ));
}

#[tokio::test]
async fn listing_twice_in_one_session_returns_the_same_statements() {
    let server = MockServer::start().await;
    stub_login(&server).await;
    stub_two_statements(&server).await;

    let client = client_for(&server);
    client
        .authenticate(&credentials())
        .await
        .expect("login succeeds");

    let first = client.fetch_statements(30).await.expect("first listing");
    let second = client.fetch_statements(30).await.expect("second listing");
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn html_statement_listing_is_an_authentication_error() {
    let server = MockServer::start().await;
    stub_login(&server).await;

    // Expired or rejected sessions get bounced to the HTML login page with a
    // 200 status instead of a 401
    Mock::given(method("GET"))
        .and(path("/v1_0/O/A/payStatements"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<!DOCTYPE html><html><body>Sign in</body></html>"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .authenticate(&credentials())
        .await
        .expect("login succeeds");

    let err = client
        .fetch_statements(30)
        .await
        .expect_err("listing must fail");
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Authentication(_))
    ));
}
