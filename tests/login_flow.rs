//! Full login against a mocked backend

mod common;

use audi_connect::api::auth::{AuthState, TokenType};
use audi_connect::{AudiConnect, ConnectError};
use common::{config, mount_discovery, mount_login};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_populates_all_tokens() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    mount_login(&server).await;

    let account = AudiConnect::new(config(&server)).unwrap();
    account.connect().await.unwrap();

    let auth = account.auth();
    assert_eq!(auth.state().await, AuthState::Authenticated);
    assert!(account.is_connected().await);

    assert_eq!(auth.token(TokenType::Idk).await.access_token.as_deref(), Some("idk-access"));
    assert_eq!(auth.token(TokenType::Audi).await.access_token.as_deref(), Some("audi-access"));
    assert_eq!(auth.token(TokenType::Mbb).await.access_token.as_deref(), Some("mbb-access"));
    assert_eq!(auth.token(TokenType::Here).await.access_token.as_deref(), Some("here-access"));
    assert_eq!(auth.token(TokenType::Mbb).await.refresh_token.as_deref(), Some("mbb-refresh"));

    let client_id = auth.x_client_id().await.unwrap();
    assert!(!client_id.is_empty());
    assert_eq!(auth.user_id().await, "user-1");
    assert!(auth.mbb_expires_at().await.is_some());
}

#[tokio::test]
async fn test_connect_twice_logs_in_once() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    mount_login(&server).await;

    let account = AudiConnect::new(config(&server)).unwrap();
    account.connect().await.unwrap();
    account.connect().await.unwrap();

    let authorize_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/signin/authorize")
        .count();
    assert_eq!(authorize_calls, 1);
}

#[tokio::test]
async fn test_session_snapshot_resumes_without_login() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    mount_login(&server).await;

    let account = AudiConnect::new(config(&server)).unwrap();
    account.connect().await.unwrap();
    let snapshot = serde_json::to_string(&account.session().await.unwrap()).unwrap();

    let resumed = AudiConnect::new(config(&server)).unwrap();
    assert!(!resumed.is_connected().await);
    resumed.restore_session(serde_json::from_str(&snapshot).unwrap()).await;

    assert!(resumed.is_connected().await);
    assert_eq!(
        resumed.auth().token(TokenType::Mbb).await.access_token.as_deref(),
        Some("mbb-access")
    );
}

#[tokio::test]
async fn test_rejected_password_fails_authorization() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    Mock::given(method("GET"))
        .and(path("/signin/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form action="/signin/identifier"><input type="hidden" name="_csrf" value="c"/></form>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/signin/identifier"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"hmac":"ff00"}"#))
        .mount(&server)
        .await;
    // wrong password: the page is shown again instead of a redirect
    Mock::given(method("POST"))
        .and(path("/signin/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Invalid credentials</html>"))
        .mount(&server)
        .await;

    let account = AudiConnect::new(config(&server)).unwrap();
    let err = account.connect().await.unwrap_err();

    assert!(matches!(err, ConnectError::AuthorizationError { .. }));
    assert_eq!(account.auth().state().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_unknown_country_fails_discovery() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    let mut config = config(&server);
    config.country = "FR".to_string();
    let account = AudiConnect::new(config).unwrap();

    let err = account.connect().await.unwrap_err();
    assert!(matches!(err, ConnectError::DiscoveryFailed { .. }));
}
