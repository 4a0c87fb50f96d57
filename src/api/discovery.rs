// Audi Connect - Vehicle Cloud Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Service discovery
//!
//! Resolves every base URL the client talks to, in four requests:
//! 1. `{market}/markets`: default language of the configured country
//! 2. `{market}/market`: GraphQL vehicle service
//! 3. `{market}/market/{country}/{lang}`: IDK client id, AZS proxy, customer
//!    profile, MBB OAuth, mobile device key, connected-vehicle service and the
//!    OpenID configuration URL
//! 4. OpenID configuration: authorization, token and revocation endpoints
//!
//! Any failure, including an unknown country, is a `DiscoveryFailed`.

use crate::api::client::{header_map, ApiClient, ApiRequest};
use crate::config::{ConnectConfig, HDR_USER_AGENT, HDR_XAPP_VERSION};
use crate::error::{ConnectError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolved base URLs of one account session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUris {
    pub client_id: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub revocation_endpoint: String,
    /// AZS (myAudi authorization server proxy)
    pub audi_url: String,
    /// Customer profile, with `/v3` appended
    pub profil_url: String,
    pub mbb_url: String,
    pub here_url: String,
    /// Mobile device key service
    pub mdk_url: String,
    /// Connected-vehicle service (selective status, capabilities, ...)
    pub cv_url: String,
    pub user_url: String,
    /// Vehicle domain GraphQL service
    pub vdgqs_url: String,
    pub language: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketsResponse {
    countries: Countries,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Countries {
    country_specifications: HashMap<String, CountrySpecification>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountrySpecification {
    default_language: String,
}

#[derive(Debug, Default, Deserialize)]
struct MarketResponse {
    #[serde(rename = "vehicleDomainGraphQLServiceURLLive", default)]
    vehicle_domain_graphql_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LocaleMarketResponse {
    #[serde(rename = "idkClientIDAndroidLive", default)]
    client_id: Option<String>,
    #[serde(rename = "myAudiAuthorizationServerProxyServiceURLProduction", default)]
    audi_url: Option<String>,
    #[serde(rename = "idkCustomerProfileMicroserviceBaseURLLive", default)]
    profil_url: Option<String>,
    #[serde(rename = "mbbOAuthBaseURLLive", default)]
    mbb_url: Option<String>,
    #[serde(rename = "mobileDeviceKeyBaseURLProduction", default)]
    mdk_url: Option<String>,
    #[serde(rename = "connectedVehicleVehicleServiceBaseURLProduction", default)]
    cv_url: Option<String>,
    #[serde(rename = "idkLoginServiceConfigurationURLProduction", default)]
    oidc_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenIdConfiguration {
    #[serde(default)]
    authorization_endpoint: String,
    #[serde(default)]
    token_endpoint: String,
    #[serde(default)]
    revocation_endpoint: String,
}

/// Resolve the service URLs for the configured country
pub async fn discover(client: &ApiClient, config: &ConnectConfig) -> Result<ServiceUris> {
    fetch(client, config).await.map_err(|e| match e {
        ConnectError::DiscoveryFailed { .. } => e,
        other => ConnectError::DiscoveryFailed {
            message: other.to_string(),
        },
    })
}

async fn fetch(client: &ApiClient, config: &ConnectConfig) -> Result<ServiceUris> {
    let market_url = config.endpoints.market_url.trim_end_matches('/');
    let country = config.country.as_str();
    let headers = header_map(&[
        ("Accept", "application/json"),
        ("Accept-Charset", "utf-8"),
        ("User-Agent", HDR_USER_AGENT),
        ("X-App-Name", "myAudi"),
        ("X-App-Version", HDR_XAPP_VERSION),
    ])?;

    let markets: MarketsResponse = client
        .typed(ApiRequest::get(format!("{}/markets", market_url)).headers(headers.clone()))
        .await?;

    let language = markets
        .countries
        .country_specifications
        .get(country)
        .map(|spec| spec.default_language.clone())
        .ok_or_else(|| ConnectError::DiscoveryFailed {
            message: format!("Country not found: {}", country),
        })?;

    let market: MarketResponse = client
        .typed(ApiRequest::get(format!("{}/market", market_url)).headers(headers.clone()))
        .await?;

    let services: LocaleMarketResponse = client
        .typed(
            ApiRequest::get(format!("{}/market/{}/{}", market_url, country, language))
                .headers(headers.clone()),
        )
        .await?;

    let oidc_url = services.oidc_url.ok_or_else(|| ConnectError::DiscoveryFailed {
        message: "Market configuration has no login service configuration URL".to_string(),
    })?;
    tracing::debug!(url = %oidc_url, "IDK base url");

    let openid: OpenIdConfiguration = client
        .typed(ApiRequest::get(oidc_url).headers(headers))
        .await?;

    let uris = ServiceUris {
        client_id: services
            .client_id
            .unwrap_or_else(|| config.endpoints.default_client_id.clone()),
        authorization_endpoint: openid.authorization_endpoint,
        token_endpoint: openid.token_endpoint,
        revocation_endpoint: openid.revocation_endpoint,
        audi_url: services.audi_url.unwrap_or_default(),
        profil_url: format!("{}/v3", services.profil_url.unwrap_or_default()),
        mbb_url: services
            .mbb_url
            .unwrap_or_else(|| config.endpoints.mbb_url.clone()),
        here_url: config.endpoints.here_url.clone(),
        mdk_url: services.mdk_url.unwrap_or_default(),
        cv_url: services.cv_url.unwrap_or_default(),
        user_url: config.endpoints.user_info_url.clone(),
        vdgqs_url: market.vehicle_domain_graphql_url.unwrap_or_default(),
        language,
        country: country.to_string(),
    };

    tracing::debug!(?uris, "service urls");
    Ok(uris)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_markets(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/configurations/markets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "countries": {"countrySpecifications": {"DE": {"defaultLanguage": "de"}}}
            })))
            .mount(server)
            .await;
    }

    fn config_for(server: &MockServer, country: &str) -> ConnectConfig {
        ConnectConfig::builder("user@example.com", "pw")
            .country(country)
            .endpoints(Endpoints::rooted_at(&server.uri()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_discover_resolves_all_urls() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_markets(&server).await;

        Mock::given(method("GET"))
            .and(path("/configurations/market"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vehicleDomainGraphQLServiceURLLive": format!("{base}/vgql")
            })))
            .mount(&server)
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
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oidc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authorization_endpoint": format!("{base}/authorize"),
                "token_endpoint": format!("{base}/token"),
                "revocation_endpoint": format!("{base}/revoke")
            })))
            .mount(&server)
            .await;

        let config = config_for(&server, "DE");
        let client = ApiClient::new(config.client.clone()).unwrap();
        let uris = discover(&client, &config).await.unwrap();

        assert_eq!(uris.client_id, "client@apps");
        assert_eq!(uris.language, "de");
        assert_eq!(uris.country, "DE");
        assert_eq!(uris.profil_url, format!("{base}/profile/v3"));
        assert_eq!(uris.mbb_url, format!("{base}/mbbcoauth"));
        assert_eq!(uris.token_endpoint, format!("{base}/token"));
        assert_eq!(uris.vdgqs_url, format!("{base}/vgql"));
        assert_eq!(uris.here_url, config.endpoints.here_url);
    }

    #[tokio::test]
    async fn test_discover_unknown_country() {
        let server = MockServer::start().await;
        mount_markets(&server).await;

        let config = config_for(&server, "FR");
        let client = ApiClient::new(config.client.clone()).unwrap();
        let err = discover(&client, &config).await.unwrap_err();

        assert!(matches!(err, ConnectError::DiscoveryFailed { .. }));
        assert!(err.to_string().contains("Country not found"));
    }

    #[tokio::test]
    async fn test_discover_wraps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/configurations/markets"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = config_for(&server, "DE");
        let client = ApiClient::new(config.client.clone()).unwrap();
        let err = discover(&client, &config).await.unwrap_err();

        assert!(matches!(err, ConnectError::DiscoveryFailed { .. }));
    }
}
