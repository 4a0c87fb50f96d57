//! Mock backend shared by the integration tests
//!
//! Every vendor host is served from one wiremock server. Paths follow
//! `Endpoints::rooted_at` plus the URLs announced by the mocked market
//! configuration (`/azs`, `/cv`, `/oidc`, ...).

#![allow(dead_code)]

use audi_connect::api::auth::{Session, TokenSet};
use audi_connect::api::ServiceUris;
use audi_connect::{AudiConnect, ConnectConfig, Endpoints};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const VIN: &str = "WAUZZZ4G7EN000001";

pub fn config(server: &MockServer) -> ConnectConfig {
    ConnectConfig::builder("user@example.com", "secret")
        .country("DE")
        .spin("1234")
        .endpoints(Endpoints::rooted_at(&server.uri()))
        .poll_interval(Duration::from_millis(5))
        .max_poll_attempts(10)
        .login_attempts(2)
        .login_retry_delay(Duration::from_millis(5))
        .build()
        .expect("valid test config")
}

fn token(access: &str) -> TokenSet {
    TokenSet {
        access_token: Some(access.to_string()),
        id_token: Some(format!("{access}-id")),
        refresh_token: Some(format!("{access}-refresh")),
        expires_in: Some(3600),
        token_type: Some("bearer".to_string()),
        scope: None,
    }
}

/// Authenticated session pointing at the mock server
pub fn session(server: &MockServer) -> Session {
    let base = server.uri();
    Session {
        uris: ServiceUris {
            client_id: "client@apps".to_string(),
            token_endpoint: format!("{base}/token"),
            audi_url: format!("{base}/azs"),
            mbb_url: format!("{base}/mbbcoauth"),
            here_url: format!("{base}/here/api/v1"),
            cv_url: format!("{base}/cv"),
            language: "de".to_string(),
            country: "DE".to_string(),
            ..Default::default()
        },
        idk: token("idk"),
        mbb: token("mbb"),
        audi: token("audi"),
        here: token("here"),
        mbb_expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        x_client_id: Some("x-client-1".to_string()),
        user_id: "user-1".to_string(),
    }
}

/// Account with a restored session and the single vehicle [`VIN`]
pub async fn account_with_vehicle(server: &MockServer) -> AudiConnect {
    mount_vehicle_list(server).await;

    let mut account = AudiConnect::new(config(server)).expect("client");
    account.restore_session(session(server)).await;
    account.fetch_vehicles().await.expect("vehicle list");
    account
}

pub async fn mount_vehicle_list(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/vgql/v1/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"userVehicles": [{
                "vin": VIN.to_lowercase(),
                "vehicle": {
                    "core": {"modelYear": 2021},
                    "media": {"shortName": "A6", "longName": "Audi A6 Avant"}
                },
                "nickname": "Family car"
            }]}
        })))
        .mount(server)
        .await;
}

/// Home region lookup answering the default setter host
pub async fn mount_home_region(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/cs/vds/v1/vehicles/{VIN}/homeRegion")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "homeRegion": {"baseUri": {"content": format!("{}/api", server.uri())}}
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Login
// ============================================================================

pub async fn mount_discovery(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/configurations/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "countries": {"countrySpecifications": {"DE": {"defaultLanguage": "de"}}}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/configurations/market"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vehicleDomainGraphQLServiceURLLive": format!("{base}/vgql")
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/configurations/market/DE/de"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idkClientIDAndroidLive": "client@apps",
            "myAudiAuthorizationServerProxyServiceURLProduction": format!("{base}/azs"),
            "idkCustomerProfileMicroserviceBaseURLLive": format!("{base}/profile"),
            "connectedVehicleVehicleServiceBaseURLProduction": format!("{base}/cv"),
            "idkLoginServiceConfigurationURLProduction": format!("{base}/oidc")
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oidc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_endpoint": format!("{base}/signin/authorize"),
            "token_endpoint": format!("{base}/token"),
            "revocation_endpoint": format!("{base}/revoke")
        })))
        .mount(server)
        .await;
}

/// Login pages, redirect chain and token endpoints
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/signin/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><form method="post" action="/signin/identifier">
                <input type="hidden" name="_csrf" value="csrf-1"/>
                <input type="hidden" name="relayState" value="relay-1"/>
                <input type="email" name="email"/>
            </form></body></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/signin/identifier"))
        .and(body_string_contains("email=user%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><script>window._IDK = {"templateModel": {"hmac":"a1b2c3d4"}};</script></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/signin/authenticate"))
        .and(body_string_contains("hmac=a1b2c3d4"))
        .and(body_string_contains("password=secret"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/redirect/1?userId=user-1"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/redirect/1"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/redirect/2"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/redirect/2"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/redirect/3"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/redirect/3"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "myaudi:///?code=auth-code-1"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=auth-code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "idk-access",
            "id_token": "idk-id",
            "refresh_token": "idk-refresh",
            "expires_in": 3600,
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/azs/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "audi-access",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mbbcoauth/mobile/register/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"client_id": "x-client-1"})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mbbcoauth/mobile/oauth2/v1/token"))
        .and(body_string_contains("scope=sc2%3Afal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mbb-access",
            "refresh_token": "mbb-refresh",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mbbcoauth/mobile/oauth2/v1/token"))
        .and(body_string_contains("here_a_t21-s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "here-access",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}
