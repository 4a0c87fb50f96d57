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

//! Authentication, token store and header construction
//!
//! # Login Flow
//!
//! 1. **Discovery** (see [`crate::api::discovery`]): market and OpenID config
//! 2. **Identity provider login** (HTML forms):
//!    - GET the authorization endpoint with a PKCE challenge
//!    - POST the e-mail form (redirects followed)
//!    - POST the password form, either to the `authenticate` variant of the
//!      e-mail URL with the embedded `hmac`, or to the form of the returned page
//!    - Follow three redirect hops by hand; the last `Location`
//!      (`myaudi:///?code=...`) carries the authorization code
//! 3. **Token exchanges**:
//!    - IDK: authorization code + PKCE verifier → access/id/refresh token
//!    - AZS: IDK id_token → myAudi token (GraphQL vehicle list)
//!    - Register: mobile client registration → `X-Client-ID`
//!    - MBB: IDK id_token → token, then one immediate refresh; the refresh
//!      token of the first exchange is kept
//!    - HERE: IDK id_token → location token
//!
//! # Token Lifecycle
//!
//! Only the MBB expiry is tracked. Every header build checks it and, once
//! past, refreshes MBB, IDK, AZS and HERE in that order. A failing refresh is
//! logged and swallowed: the session drops back to `Unauthenticated` and the
//! stale tokens are still sent, so the call that needed them fails on its own.
//!
//! The store lives behind a `tokio::sync::Mutex`, so concurrent callers wait
//! for a running refresh instead of starting their own.
//!
//! # HERE refresh token
//!
//! When the HERE exchange returns a `refresh_token`, it replaces the MBB
//! refresh token. Both come from the same MBB OAuth endpoint and the backend
//! accepts either for the next MBB refresh.

use crate::api::client::{header_map, ApiClient, ApiRequest};
use crate::api::discovery::{self, ServiceUris};
use crate::api::scrape::{extract_form_action, extract_hidden_fields, extract_hmac};
use crate::config::{ConnectConfig, HDR_USER_AGENT, HDR_XAPP_VERSION, OKHTTP_USER_AGENT};
use crate::error::{ConnectError, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fmt;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

/// Redirect URI registered for the myAudi app
const REDIRECT_URI: &str = "myaudi:///";

/// Prefix of the final login redirect
const CODE_LOCATION_PREFIX: &str = "myaudi:///?";

/// Scopes requested at the identity provider
const IDK_SCOPE: &str = "address badge birthdate birthplace email gallery mbb name \
nationalIdentifier nationality nickname phone picture profession profile vin openid";

const MBB_SCOPE: &str = "sc2:fal";
const HERE_SCOPE: &str = "sc2:here_a_t21-s";

/// Redirect hops between the password POST and the authorization code
const LOGIN_REDIRECT_HOPS: usize = 3;

// ============================================================================
// PKCE
// ============================================================================

/// PKCE code verifier and challenge pair
///
/// Reference: RFC 7636 - https://tools.ietf.org/html/rfc7636
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// 32 random bytes, base64-url without padding; sent with the token exchange
    pub verifier: String,

    /// SHA-256 of the verifier, base64-url without padding; sent with the
    /// authorization request
    pub challenge: String,

    /// Always "S256"
    pub method: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let verifier_bytes: [u8; 32] = rng.gen();
        let verifier = general_purpose::URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let challenge = general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());

        Self {
            verifier,
            challenge,
            method: "S256".to_string(),
        }
    }
}

/// Random `state` / `nonce` parameter
#[derive(Debug, Clone)]
pub struct OAuthState {
    pub value: String,
}

impl OAuthState {
    pub fn generate() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
        }
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Which token a request is authorized with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Identity provider token: connected-vehicle service
    Idk,
    /// MBB token: legacy `/bs/` services, home region, actions
    Mbb,
    /// AZS token: GraphQL vehicle list
    Audi,
    /// HERE token: vehicle location
    Here,
}

/// OAuth token response
///
/// Every field is optional; the exchanges differ in what they return.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenSet {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
    }

    fn require_id_token(&self, token: &str) -> Result<String> {
        self.id_token.clone().ok_or_else(|| {
            ConnectError::invalid_response(format!("{} token response has no id_token", token), None)
        })
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("TokenSet")
            .field("access_token", &mask(&self.access_token))
            .field("id_token", &mask(&self.id_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    ServiceDiscovered,
    LoggingIn,
    Authenticated,
    Refreshing,
}

/// Serializable snapshot of an authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uris: ServiceUris,
    pub idk: TokenSet,
    pub mbb: TokenSet,
    pub audi: TokenSet,
    pub here: TokenSet,
    pub mbb_expires_at: Option<DateTime<Utc>>,
    pub x_client_id: Option<String>,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug)]
struct TokenStore {
    state: AuthState,
    uris: Option<ServiceUris>,
    idk: TokenSet,
    mbb: TokenSet,
    audi: TokenSet,
    here: TokenSet,
    mbb_expires_at: Option<DateTime<Utc>>,
    x_client_id: Option<String>,
    user_id: String,
}

impl TokenStore {
    fn new() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            uris: None,
            idk: TokenSet::default(),
            mbb: TokenSet::default(),
            audi: TokenSet::default(),
            here: TokenSet::default(),
            mbb_expires_at: None,
            x_client_id: None,
            user_id: String::new(),
        }
    }

    fn token(&self, token_type: TokenType) -> &TokenSet {
        match token_type {
            TokenType::Idk => &self.idk,
            TokenType::Mbb => &self.mbb,
            TokenType::Audi => &self.audi,
            TokenType::Here => &self.here,
        }
    }

    fn mbb_expired(&self) -> bool {
        self.mbb_expires_at
            .map(|expires_at| Utc::now() > expires_at)
            .unwrap_or(false)
    }
}

/// Result of one login sequence, committed to the store as a whole
struct LoginTokens {
    idk: TokenSet,
    audi: TokenSet,
    mbb: TokenSet,
    here: TokenSet,
    mbb_expires_at: DateTime<Utc>,
    x_client_id: String,
    user_id: String,
}

enum IdkGrant<'a> {
    AuthorizationCode { code: &'a str, verifier: &'a str },
    RefreshToken(&'a str),
}

enum MbbGrant<'a> {
    IdToken(&'a str),
    RefreshToken(&'a str),
}

// ============================================================================
// Auth
// ============================================================================

/// Authenticated access to the vendor backend
#[derive(Debug)]
pub struct Auth {
    client: ApiClient,
    config: ConnectConfig,
    store: Mutex<TokenStore>,
}

impl Auth {
    pub fn new(config: ConnectConfig) -> Result<Self> {
        let client = ApiClient::new(config.client.clone())?;
        Ok(Self {
            client,
            config,
            store: Mutex::new(TokenStore::new()),
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub async fn state(&self) -> AuthState {
        self.store.lock().await.state
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == AuthState::Authenticated
    }

    /// Service URLs of the current session
    pub async fn uris(&self) -> Result<ServiceUris> {
        self.store
            .lock()
            .await
            .uris
            .clone()
            .ok_or_else(|| ConnectError::auth_failed("Not connected: service urls unknown"))
    }

    pub async fn user_id(&self) -> String {
        self.store.lock().await.user_id.clone()
    }

    pub async fn x_client_id(&self) -> Option<String> {
        self.store.lock().await.x_client_id.clone()
    }

    pub async fn token(&self, token_type: TokenType) -> TokenSet {
        self.store.lock().await.token(token_type).clone()
    }

    pub async fn mbb_expires_at(&self) -> Option<DateTime<Utc>> {
        self.store.lock().await.mbb_expires_at
    }

    // ========================================================================
    // Connect
    // ========================================================================

    /// Discover services and log in
    ///
    /// No-op when already authenticated. Transport failures and timeouts
    /// retry the whole login up to `login_attempts` times.
    ///
    /// # Errors
    /// - `DiscoveryFailed` when the market or OpenID configuration fails
    /// - `AuthorizationError` when every login attempt failed
    pub async fn connect(&self) -> Result<()> {
        let mut store = self.store.lock().await;
        if store.state == AuthState::Authenticated {
            return Ok(());
        }

        let uris = match discovery::discover(&self.client, &self.config).await {
            Ok(uris) => uris,
            Err(e) => {
                store.state = AuthState::Unauthenticated;
                return Err(e);
            }
        };
        store.uris = Some(uris.clone());
        store.state = AuthState::ServiceDiscovered;

        let attempts = self.config.login_attempts.max(1);
        let mut attempt = 1;
        loop {
            store.state = AuthState::LoggingIn;
            match self.login(&uris).await {
                Ok(tokens) => {
                    store.idk = tokens.idk;
                    store.audi = tokens.audi;
                    store.mbb = tokens.mbb;
                    store.here = tokens.here;
                    store.mbb_expires_at = Some(tokens.mbb_expires_at);
                    store.x_client_id = Some(tokens.x_client_id);
                    store.user_id = tokens.user_id;
                    store.state = AuthState::Authenticated;
                    tracing::info!("Logged in to Audi connect");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        error = %e,
                        "Login failed, retrying in {:?}",
                        self.config.login_retry_delay
                    );
                    attempt += 1;
                    tokio::time::sleep(self.config.login_retry_delay).await;
                }
                Err(e) => {
                    store.state = AuthState::Unauthenticated;
                    return Err(ConnectError::auth_failed(format!(
                        "Login to Audi service failed: {}",
                        e
                    )));
                }
            }
        }
    }

    /// Take over a previously captured session without logging in
    pub async fn restore_session(&self, session: Session) {
        let mut store = self.store.lock().await;
        store.uris = Some(session.uris);
        store.idk = session.idk;
        store.mbb = session.mbb;
        store.audi = session.audi;
        store.here = session.here;
        store.mbb_expires_at = session.mbb_expires_at;
        store.x_client_id = session.x_client_id;
        store.user_id = session.user_id;
        store.state = AuthState::Authenticated;
    }

    /// Snapshot of the current session, `None` before discovery
    pub async fn session(&self) -> Option<Session> {
        let store = self.store.lock().await;
        let uris = store.uris.clone()?;
        Some(Session {
            uris,
            idk: store.idk.clone(),
            mbb: store.mbb.clone(),
            audi: store.audi.clone(),
            here: store.here.clone(),
            mbb_expires_at: store.mbb_expires_at,
            x_client_id: store.x_client_id.clone(),
            user_id: store.user_id.clone(),
        })
    }

    async fn login(&self, uris: &ServiceUris) -> Result<LoginTokens> {
        let pkce = PkceChallenge::generate();
        let headers = base_headers()?;
        let language = uris.language.as_str();

        // Login page
        let params = vec![
            ("response_type", "code".to_string()),
            ("client_id", uris.client_id.clone()),
            ("redirect_uri", REDIRECT_URI.to_string()),
            ("scope", IDK_SCOPE.to_string()),
            ("state", OAuthState::generate().value),
            ("nonce", OAuthState::generate().value),
            ("prompt", "login".to_string()),
            ("code_challenge", pkce.challenge.clone()),
            ("code_challenge_method", pkce.method.clone()),
            ("ui_locales", format!("{0}-{0} {0}", language)),
        ];
        let login_page = self
            .client
            .send(
                ApiRequest::get(uris.authorization_endpoint.as_str())
                    .headers(headers.clone())
                    .query(params),
            )
            .await?;

        // E-mail
        let mut form = extract_hidden_fields(&login_page.text);
        form.set("email", self.config.username.as_str());
        let email_url = extract_form_action(&login_page.text, &uris.authorization_endpoint)?;
        let email_page = self
            .client
            .send(
                ApiRequest::post(email_url.as_str())
                    .headers(headers.clone())
                    .form(form.clone().into_pairs()),
            )
            .await?;

        // Password
        let (password_url, form) = match extract_hmac(&email_page.text) {
            Some(hmac) => {
                form.set("hmac", hmac);
                form.set("password", self.config.password.as_str());
                (email_url.replace("identifier", "authenticate"), form)
            }
            None => {
                let mut form = extract_hidden_fields(&email_page.text);
                form.set("password", self.config.password.as_str());
                (extract_form_action(&email_page.text, &email_url)?, form)
            }
        };
        let password_rsp = self
            .client
            .send(
                ApiRequest::post(password_url.as_str())
                    .headers(headers.clone())
                    .form(form.into_pairs())
                    .no_redirects(),
            )
            .await?;

        let mut location = password_rsp
            .location()
            .ok_or_else(|| ConnectError::auth_failed("Password step did not redirect"))?
            .to_string();
        let mut current_url = password_url;
        let user_id = query_param(&location, "userId").unwrap_or_default();

        // Redirect hops, the last one points at myaudi:///
        for hop in 1..=LOGIN_REDIRECT_HOPS {
            let next_url = resolve_location(&current_url, &location)?;
            let rsp = self
                .client
                .send(
                    ApiRequest::get(next_url.as_str())
                        .headers(headers.clone())
                        .no_redirects(),
                )
                .await?;
            location = rsp
                .location()
                .ok_or_else(|| {
                    ConnectError::auth_failed(format!("Login redirect {} has no location", hop))
                })?
                .to_string();
            current_url = next_url;
        }

        let code = extract_authorization_code(&location)
            .ok_or_else(|| ConnectError::auth_failed("Authorization code missing from redirect"))?;

        // Token exchanges
        let idk = self
            .idk_token(
                uris,
                IdkGrant::AuthorizationCode {
                    code: &code,
                    verifier: &pkce.verifier,
                },
            )
            .await?;
        let id_token = idk.require_id_token("IDK")?;

        let audi = self.azs_token(uris, &id_token).await?;
        let x_client_id = self.register(uris).await?;

        let first = self
            .mbb_token(uris, &x_client_id, MBB_SCOPE, MbbGrant::IdToken(&id_token))
            .await?;
        let first_refresh = first.refresh_token.clone().ok_or_else(|| {
            ConnectError::invalid_response("MBB token response has no refresh_token", None)
        })?;
        let mut mbb = self
            .mbb_token(uris, &x_client_id, MBB_SCOPE, MbbGrant::RefreshToken(&first_refresh))
            .await?;
        mbb.refresh_token = Some(first_refresh);
        let mbb_expires_at = expiry(&mbb)?;

        let here = self
            .mbb_token(uris, &x_client_id, HERE_SCOPE, MbbGrant::IdToken(&id_token))
            .await?;
        if here.refresh_token.is_some() {
            mbb.refresh_token = here.refresh_token.clone();
        }

        Ok(LoginTokens {
            idk,
            audi,
            mbb,
            here,
            mbb_expires_at,
            x_client_id,
            user_id,
        })
    }

    // ========================================================================
    // Token Exchanges
    // ========================================================================

    async fn idk_token(&self, uris: &ServiceUris, grant: IdkGrant<'_>) -> Result<TokenSet> {
        let headers = header_map(&[
            ("Accept", "application/json"),
            ("Accept-Charset", "utf-8"),
            ("User-Agent", HDR_USER_AGENT),
            ("Content-Type", "application/x-www-form-urlencoded"),
        ])?;

        let mut form = vec![("client_id".to_string(), uris.client_id.clone())];
        match grant {
            IdkGrant::AuthorizationCode { code, verifier } => {
                form.push(("grant_type".to_string(), "authorization_code".to_string()));
                form.push(("code".to_string(), code.to_string()));
                form.push(("redirect_uri".to_string(), REDIRECT_URI.to_string()));
                form.push(("response_type".to_string(), "token id_token".to_string()));
                form.push(("code_verifier".to_string(), verifier.to_string()));
            }
            IdkGrant::RefreshToken(refresh_token) => {
                form.push(("grant_type".to_string(), "refresh_token".to_string()));
                form.push(("refresh_token".to_string(), refresh_token.to_string()));
                form.push(("response_type".to_string(), "token id_token".to_string()));
            }
        }

        let token = self
            .client
            .typed(
                ApiRequest::post(uris.token_endpoint.as_str())
                    .headers(headers)
                    .form(form)
                    .no_redirects(),
            )
            .await?;
        tracing::debug!(?token, "IDK token");
        Ok(token)
    }

    async fn azs_token(&self, uris: &ServiceUris, id_token: &str) -> Result<TokenSet> {
        let headers = header_map(&[
            ("Accept", "application/json"),
            ("Accept-Charset", "utf-8"),
            ("User-Agent", HDR_USER_AGENT),
            ("X-App-Name", "myAudi"),
            ("X-App-Version", HDR_XAPP_VERSION),
            ("Content-Type", "application/json"),
        ])?;
        let body = json!({
            "grant_type": "id_token",
            "token": id_token,
            "stage": "live",
            "config": "myaudi",
        });

        let token = self
            .client
            .typed(
                ApiRequest::post(format!("{}/token", uris.audi_url))
                    .headers(headers)
                    .json(body)
                    .no_redirects(),
            )
            .await?;
        tracing::debug!(?token, "AZS token");
        Ok(token)
    }

    /// Register the mobile client, returns the `X-Client-ID`
    async fn register(&self, uris: &ServiceUris) -> Result<String> {
        let headers = header_map(&[
            ("Accept", "application/json"),
            ("Accept-Charset", "utf-8"),
            ("User-Agent", HDR_USER_AGENT),
            ("Content-Type", "application/json"),
        ])?;
        let body = json!({
            "client_name": "SM-A405FN",
            "platform": "google",
            "client_brand": "Audi",
            "appName": "myAudi",
            "appVersion": HDR_XAPP_VERSION,
            "appId": "de.myaudi.mobile.assistant",
        });

        #[derive(Deserialize)]
        struct Registration {
            #[serde(default)]
            client_id: Option<String>,
        }

        let registration: Registration = self
            .client
            .typed(
                ApiRequest::post(format!("{}/mobile/register/v1", uris.mbb_url))
                    .headers(headers)
                    .json(body)
                    .no_redirects(),
            )
            .await?;

        Ok(registration.client_id.unwrap_or_default())
    }

    /// MBB OAuth token endpoint, shared by MBB (`sc2:fal`) and HERE
    async fn mbb_token(
        &self,
        uris: &ServiceUris,
        x_client_id: &str,
        scope: &str,
        grant: MbbGrant<'_>,
    ) -> Result<TokenSet> {
        let mut pairs = vec![
            ("Accept", "application/json"),
            ("Accept-Charset", "utf-8"),
            ("User-Agent", HDR_USER_AGENT),
        ];
        if scope == MBB_SCOPE {
            pairs.push(("X-App-Name", "myAudi"));
            pairs.push(("X-App-Version", HDR_XAPP_VERSION));
        }
        pairs.push(("X-Client-ID", x_client_id));
        pairs.push(("Content-Type", "application/x-www-form-urlencoded"));
        let headers = header_map(&pairs)?;

        let (grant_type, token) = match grant {
            MbbGrant::IdToken(token) => ("id_token", token),
            MbbGrant::RefreshToken(token) => ("refresh_token", token),
        };
        let form = vec![
            ("grant_type".to_string(), grant_type.to_string()),
            ("token".to_string(), token.to_string()),
            ("scope".to_string(), scope.to_string()),
        ];

        let token: TokenSet = self
            .client
            .typed(
                ApiRequest::post(format!("{}/mobile/oauth2/v1/token", uris.mbb_url))
                    .headers(headers)
                    .form(form)
                    .no_redirects(),
            )
            .await?;
        tracing::debug!(?token, scope, "MBB token");
        Ok(token)
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Refresh every token if the MBB token has expired
    ///
    /// Failures are logged and leave the session `Unauthenticated`.
    async fn refresh_if_expired(&self, store: &mut TokenStore) {
        if !store.mbb_expired() {
            return;
        }

        store.state = AuthState::Refreshing;
        match self.refresh(store).await {
            Ok(()) => store.state = AuthState::Authenticated,
            Err(e) => {
                tracing::error!(error = %e, "Refresh token failed");
                store.state = AuthState::Unauthenticated;
            }
        }
    }

    async fn refresh(&self, store: &mut TokenStore) -> Result<()> {
        let uris = store
            .uris
            .clone()
            .ok_or_else(|| ConnectError::auth_failed("Not connected: service urls unknown"))?;
        let x_client_id = store.x_client_id.clone().unwrap_or_default();

        tracing::debug!("Refresh MBB token");
        let refresh_token = store.mbb.refresh_token.clone().ok_or_else(|| {
            ConnectError::auth_failed("No MBB refresh token available")
        })?;
        let mut mbb = self
            .mbb_token(&uris, &x_client_id, MBB_SCOPE, MbbGrant::RefreshToken(&refresh_token))
            .await?;
        if mbb.refresh_token.is_none() {
            tracing::debug!("refresh token not provided");
            mbb.refresh_token = Some(refresh_token);
        }
        store.mbb_expires_at = Some(expiry(&mbb)?);
        store.mbb = mbb;

        tracing::debug!("Refresh IDK token");
        let idk_refresh = store.idk.refresh_token.clone().ok_or_else(|| {
            ConnectError::auth_failed("No IDK refresh token available")
        })?;
        store.idk = self
            .idk_token(&uris, IdkGrant::RefreshToken(&idk_refresh))
            .await?;
        let id_token = store.idk.require_id_token("IDK")?;

        tracing::debug!("Refresh Audi token");
        store.audi = self.azs_token(&uris, &id_token).await?;

        tracing::debug!("Refresh Here token");
        store.here = self
            .mbb_token(&uris, &x_client_id, HERE_SCOPE, MbbGrant::IdToken(&id_token))
            .await?;
        if store.here.refresh_token.is_some() {
            store.mbb.refresh_token = store.here.refresh_token.clone();
        }

        Ok(())
    }

    // ========================================================================
    // Headers
    // ========================================================================

    /// Headers for a request authorized with `token_type`
    ///
    /// Defaults, then `Authorization` and `X-Client-ID`, then `extra`; later
    /// entries override earlier ones. Refreshes expired tokens first.
    pub async fn auth_headers(&self, token_type: TokenType, extra: HeaderMap) -> Result<HeaderMap> {
        let mut headers = base_headers()?;

        let mut store = self.store.lock().await;
        self.refresh_if_expired(&mut store).await;

        if let Some(ref token) = store.token(token_type).access_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ConnectError::InvalidInput(format!("Invalid access token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(ref client_id) = store.x_client_id {
            if !client_id.is_empty() {
                headers.extend(header_map(&[("X-Client-ID", client_id.as_str())])?);
            }
        }
        drop(store);

        headers.extend(extra);
        Ok(headers)
    }

    /// Headers for a remote command
    ///
    /// The security token goes to `x-mbbSecToken`, or to `X-securityToken`
    /// when `x_security` is set.
    pub async fn action_headers(
        &self,
        content_type: &str,
        security_token: Option<&str>,
        x_security: bool,
    ) -> Result<HeaderMap> {
        let mut pairs = vec![("Content-Type", content_type), ("User-Agent", OKHTTP_USER_AGENT)];
        if let Some(token) = security_token {
            let name = if x_security { "X-securityToken" } else { "x-mbbSecToken" };
            pairs.push((name, token));
        }
        self.auth_headers(TokenType::Mbb, header_map(&pairs)?).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn base_headers() -> Result<HeaderMap> {
    header_map(&[
        ("Accept", "application/json"),
        ("Accept-Charset", "utf-8"),
        ("User-Agent", HDR_USER_AGENT),
        ("X-App-Name", "myAudi"),
        ("X-App-Version", HDR_XAPP_VERSION),
    ])
}

fn expiry(token: &TokenSet) -> Result<DateTime<Utc>> {
    let expires_in = token.expires_in.ok_or_else(|| {
        ConnectError::invalid_response("MBB token response has no expires_in", None)
    })?;
    Ok(Utc::now() + ChronoDuration::seconds(expires_in))
}

fn resolve_location(current_url: &str, location: &str) -> Result<String> {
    if location.starts_with("http") {
        return Ok(location.to_string());
    }
    Ok(Url::parse(current_url)?.join(location)?.to_string())
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?').map(|(_, q)| q)?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Authorization code from the final login redirect
pub fn extract_authorization_code(location: &str) -> Option<String> {
    let query = location
        .strip_prefix(CODE_LOCATION_PREFIX)
        .or_else(|| location.split_once('?').map(|(_, q)| q))
        .or_else(|| location.get(CODE_LOCATION_PREFIX.len()..))?;

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
}

// ===== TESTS =====

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> ConnectConfig {
        ConnectConfig::builder("user@example.com", "pw")
            .endpoints(Endpoints::rooted_at(&server.uri()))
            .login_retry_delay(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    fn test_session(base: &str, expires_at: DateTime<Utc>) -> Session {
        Session {
            uris: ServiceUris {
                client_id: "client@apps".to_string(),
                token_endpoint: format!("{base}/oidc/token"),
                audi_url: format!("{base}/azs"),
                mbb_url: format!("{base}/mbbcoauth"),
                language: "de".to_string(),
                country: "DE".to_string(),
                ..Default::default()
            },
            idk: TokenSet {
                access_token: Some("idk-old".to_string()),
                id_token: Some("id-old".to_string()),
                refresh_token: Some("idk-refresh".to_string()),
                ..Default::default()
            },
            mbb: TokenSet {
                access_token: Some("mbb-old".to_string()),
                refresh_token: Some("mbb-refresh".to_string()),
                expires_in: Some(3600),
                ..Default::default()
            },
            audi: TokenSet {
                access_token: Some("audi-old".to_string()),
                ..Default::default()
            },
            here: TokenSet {
                access_token: Some("here-old".to_string()),
                ..Default::default()
            },
            mbb_expires_at: Some(expires_at),
            x_client_id: Some("xcid".to_string()),
            user_id: "user-1".to_string(),
        }
    }

    async fn mount_refresh_endpoints(server: &MockServer, here_body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/mbbcoauth/mobile/oauth2/v1/token"))
            .and(body_string_contains("scope=sc2%3Afal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mbb-new",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/mbbcoauth/mobile/oauth2/v1/token"))
            .and(body_string_contains("here_a_t21-s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(here_body))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oidc/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "idk-new",
                "id_token": "id-new",
                "refresh_token": "idk-refresh-2"
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/azs/token"))
            .and(body_string_contains("id-new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "audi-new"
            })))
            .mount(server)
            .await;
    }

    // ========== PKCE Tests ==========

    #[test]
    fn test_pkce_challenge_generate() {
        let pkce = PkceChallenge::generate();

        assert_eq!(pkce.method, "S256");
        assert_eq!(pkce.verifier.len(), 43);
        assert_ne!(pkce.verifier, pkce.challenge);
        assert!(!pkce.challenge.contains('='));
        assert!(!pkce.challenge.contains('+'));
        assert!(!pkce.challenge.contains('/'));
    }

    #[test]
    fn test_pkce_challenge_matches_verifier() {
        let pkce = PkceChallenge::generate();

        let mut hasher = Sha256::new();
        hasher.update(pkce.verifier.as_bytes());
        let expected = general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());

        assert_eq!(pkce.challenge, expected);
        assert_ne!(PkceChallenge::generate().verifier, pkce.verifier);
    }

    #[test]
    fn test_oauth_state_is_uuid() {
        let state = OAuthState::generate();
        assert!(Uuid::parse_str(&state.value).is_ok());
        assert_ne!(OAuthState::generate().value, state.value);
    }

    // ========== Redirect Parsing Tests ==========

    #[test]
    fn test_extract_authorization_code() {
        assert_eq!(
            extract_authorization_code("myaudi:///?code=abc123&token_type=bearer"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_authorization_code("http://xxxxcode=12345"),
            Some("12345".to_string())
        );
        assert_eq!(
            extract_authorization_code("https://idp.example.com/cb?state=1&code=zz"),
            Some("zz".to_string())
        );
        assert_eq!(extract_authorization_code("myaudi:///?error=denied"), None);
    }

    #[test]
    fn test_query_param_user_id() {
        let location = "https://idp.example.com/consent?relayState=r&userId=8f2c-11";
        assert_eq!(query_param(location, "userId"), Some("8f2c-11".to_string()));
        assert_eq!(query_param("https://idp.example.com/consent", "userId"), None);
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("https://idp.example.com/a/b", "/c?d=1").unwrap(),
            "https://idp.example.com/c?d=1"
        );
        assert_eq!(
            resolve_location("https://idp.example.com/a", "https://other.example.com/x").unwrap(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_token_set_debug_masks_tokens() {
        let token = TokenSet {
            access_token: Some("secret-access".to_string()),
            expires_in: Some(60),
            ..Default::default()
        };
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret-access"));
        assert!(debug.contains("60"));
    }

    // ========== Header Tests ==========

    #[tokio::test]
    async fn test_auth_headers_layering() {
        let server = MockServer::start().await;
        let auth = Auth::new(test_config(&server)).unwrap();
        auth.restore_session(test_session(&server.uri(), Utc::now() + ChronoDuration::hours(1)))
            .await;

        let extra = header_map(&[("User-Agent", OKHTTP_USER_AGENT), ("X-Extra", "1")]).unwrap();
        let headers = auth.auth_headers(TokenType::Here, extra).await.unwrap();

        assert_eq!(headers.get("authorization").unwrap(), "Bearer here-old");
        assert_eq!(headers.get("x-client-id").unwrap(), "xcid");
        assert_eq!(headers.get("user-agent").unwrap(), OKHTTP_USER_AGENT);
        assert_eq!(headers.get("x-app-name").unwrap(), "myAudi");
        assert_eq!(headers.get("x-extra").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_action_headers_security_token_placement() {
        let server = MockServer::start().await;
        let auth = Auth::new(test_config(&server)).unwrap();
        auth.restore_session(test_session(&server.uri(), Utc::now() + ChronoDuration::hours(1)))
            .await;

        let headers = auth
            .action_headers("application/json", Some("sec"), false)
            .await
            .unwrap();
        assert_eq!(headers.get("x-mbbSecToken").unwrap(), "sec");
        assert!(headers.get("X-securityToken").is_none());
        assert_eq!(headers.get("authorization").unwrap(), "Bearer mbb-old");
        assert_eq!(headers.get("content-type").unwrap(), "application/json");

        let headers = auth
            .action_headers("application/json", Some("sec"), true)
            .await
            .unwrap();
        assert_eq!(headers.get("X-securityToken").unwrap(), "sec");
        assert!(headers.get("x-mbbSecToken").is_none());

        let headers = auth.action_headers("text/xml", None, false).await.unwrap();
        assert!(headers.get("x-mbbSecToken").is_none());
    }

    // ========== Refresh Tests ==========

    #[tokio::test]
    async fn test_refresh_preserves_refresh_token_when_omitted() {
        let server = MockServer::start().await;
        mount_refresh_endpoints(&server, json!({"access_token": "here-new"})).await;

        let auth = Auth::new(test_config(&server)).unwrap();
        auth.restore_session(test_session(&server.uri(), Utc::now() - ChronoDuration::seconds(5)))
            .await;

        let headers = auth.auth_headers(TokenType::Mbb, HeaderMap::new()).await.unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer mbb-new");

        let mbb = auth.token(TokenType::Mbb).await;
        assert_eq!(mbb.refresh_token.as_deref(), Some("mbb-refresh"));
        assert_eq!(auth.token(TokenType::Idk).await.access_token.as_deref(), Some("idk-new"));
        assert_eq!(auth.token(TokenType::Audi).await.access_token.as_deref(), Some("audi-new"));
        assert_eq!(auth.token(TokenType::Here).await.access_token.as_deref(), Some("here-new"));
        assert!(auth.mbb_expires_at().await.unwrap() > Utc::now());
        assert!(auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_here_token_overrides_mbb_refresh_token() {
        let server = MockServer::start().await;
        mount_refresh_endpoints(
            &server,
            json!({"access_token": "here-new", "refresh_token": "from-here"}),
        )
        .await;

        let auth = Auth::new(test_config(&server)).unwrap();
        auth.restore_session(test_session(&server.uri(), Utc::now() - ChronoDuration::seconds(5)))
            .await;

        auth.auth_headers(TokenType::Idk, HeaderMap::new()).await.unwrap();

        let mbb = auth.token(TokenType::Mbb).await;
        assert_eq!(mbb.refresh_token.as_deref(), Some("from-here"));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mbbcoauth/mobile/oauth2/v1/token"))
            .and(header("x-client-id", "xcid"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let auth = Auth::new(test_config(&server)).unwrap();
        auth.restore_session(test_session(&server.uri(), Utc::now() - ChronoDuration::seconds(5)))
            .await;

        let headers = auth.auth_headers(TokenType::Mbb, HeaderMap::new()).await.unwrap();

        assert_eq!(headers.get("authorization").unwrap(), "Bearer mbb-old");
        assert_eq!(auth.state().await, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_no_refresh_before_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let auth = Auth::new(test_config(&server)).unwrap();
        auth.restore_session(test_session(&server.uri(), Utc::now() + ChronoDuration::hours(1)))
            .await;

        let headers = auth.auth_headers(TokenType::Audi, HeaderMap::new()).await.unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer audi-old");
    }

    // ========== Session Tests ==========

    #[tokio::test]
    async fn test_session_roundtrip_through_json() {
        let server = MockServer::start().await;
        let auth = Auth::new(test_config(&server)).unwrap();
        assert!(auth.session().await.is_none());

        let session = test_session(&server.uri(), Utc::now());
        auth.restore_session(session.clone()).await;

        let json = serde_json::to_string(&auth.session().await.unwrap()).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
        assert_eq!(auth.user_id().await, "user-1");
    }

    #[tokio::test]
    async fn test_connect_discovery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let auth = Auth::new(test_config(&server)).unwrap();
        let err = auth.connect().await.unwrap_err();

        assert!(matches!(err, ConnectError::DiscoveryFailed { .. }));
        assert_eq!(auth.state().await, AuthState::Unauthenticated);
    }
}
