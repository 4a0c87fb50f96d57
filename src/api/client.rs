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


//! HTTP transport for the vendor backend
//!
//! Thin wrapper over `reqwest` that every other module goes through:
//! - Wall-clock timeout per request (120 s by default) → `TimeoutExceeded`
//! - Non-2xx statuses → `ServiceNotFound` with the backend's own message
//! - Connection-level failures → `HttpRequestError`
//! - JSON / text / raw response modes
//!
//! # Architecture
//!
//! ## Redirects
//! The login flow must observe individual `Location` headers, so the client
//! holds two `reqwest::Client`s built from the same configuration and sharing
//! one cookie jar: one follows redirects, the other never does. A request
//! picks one with [`ApiRequest::no_redirects`].
//!
//! ## Form bodies
//! The identity provider rejects `+` for spaces in form bodies. Forms are
//! therefore encoded by hand with `%20` (see [`encode_form`]).
//!
//! ## Response modes
//! - [`ApiClient::send`] returns the [`RawResponse`] (status, headers, body)
//! - [`ApiClient::json`] returns `serde_json::Value`; an empty body on a
//!   request that accepts JSON yields `{}`
//! - [`ApiClient::text`] returns the body as text

use crate::error::{ConnectError, Result};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Characters of a failing body kept in error messages
const ERROR_BODY_SNIPPET: usize = 800;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for ApiClient
/// Provides a builder pattern for client customization
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub enable_cookies: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: crate::config::HDR_USER_AGENT.to_string(),
            enable_cookies: true,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn enable_cookies(mut self, enable: bool) -> Self {
        self.config.enable_cookies = enable;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Request body variants used by the backend
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded` with `%20` for spaces
    Form(Vec<(String, String)>),
    /// Pre-rendered body (XML or JSON) sent with the caller's Content-Type
    Text(String),
}

/// A single request against the backend
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: RequestBody,
    follow_redirects: bool,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: Method, url: S) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            follow_redirects: true,
        }
    }

    pub fn get<S: Into<String>>(url: S) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post<S: Into<String>>(url: S) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, pairs: Vec<(K, V)>) -> Self {
        self.query = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(pairs);
        self
    }

    pub fn text<S: Into<String>>(mut self, body: S) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    /// Do not follow redirects; the 3xx response is returned as is
    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn accepts_json(&self) -> bool {
        self.headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("application/json"))
            .unwrap_or(false)
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// JSON value, or the text wrapped in `Value::String`
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Final URL after redirects
    pub url: Url,
    pub headers: HeaderMap,
    pub text: String,
    accepts_json: bool,
}

impl RawResponse {
    /// `Location` header of a redirect
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn is_json(&self) -> bool {
        is_json_content(&self.headers)
    }

    /// Body in the mode the response declares
    ///
    /// JSON content is parsed. An empty body on a request that asked for JSON
    /// becomes `{}`. Everything else is returned as text.
    pub fn body(&self) -> Result<ResponseBody> {
        if self.is_json() {
            if self.text.trim().is_empty() {
                return Ok(ResponseBody::Json(Value::Object(Default::default())));
            }
            let value = serde_json::from_str(&self.text).map_err(|e| {
                ConnectError::invalid_response(
                    format!("Invalid JSON from {}: {}", self.url, e),
                    Some(snippet(&self.text)),
                )
            })?;
            return Ok(ResponseBody::Json(value));
        }

        if self.accepts_json && self.text.trim().is_empty() {
            tracing::debug!("Accept is JSON but response body is empty");
            return Ok(ResponseBody::Json(Value::Object(Default::default())));
        }

        Ok(ResponseBody::Text(self.text.clone()))
    }

    /// Deserialize the body into a typed structure
    ///
    /// Falls back to parsing text bodies, since several backend services
    /// declare `text/plain` for JSON payloads.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match self.body()? {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => serde_json::from_str(&text).map_err(|e| {
                ConnectError::invalid_response(
                    format!("Expected JSON from {}: {}", self.url, e),
                    Some(snippet(&text)),
                )
            })?,
        };

        serde_json::from_value(value).map_err(|e| {
            ConnectError::invalid_response(
                format!("Unexpected response shape from {}: {}", self.url, e),
                Some(snippet(&self.text)),
            )
        })
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client shared by every module of the crate
///
/// # Example
/// ```rust,no_run
/// use audi_connect::api::client::{ApiClient, ApiRequest, ClientConfig};
///
/// # async fn example() -> audi_connect::error::Result<()> {
/// let client = ApiClient::new(ClientConfig::default())?;
/// let markets = client
///     .json(ApiRequest::get("https://content.app.my.audi.com/service/mobileapp/configurations/markets"))
///     .await?;
/// println!("{}", markets);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Follows redirects
    client: Client,
    /// Never follows redirects
    no_redirect_client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new ApiClient
    ///
    /// # Errors
    /// Returns error if the user agent is not a valid header value or the
    /// TLS backend cannot be initialized
    pub fn new(config: ClientConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let client = Self::build_client(&config, &jar, Policy::default())?;
        let no_redirect_client = Self::build_client(&config, &jar, Policy::none())?;

        Ok(Self {
            client,
            no_redirect_client,
            config,
        })
    }

    fn build_client(config: &ClientConfig, jar: &Arc<Jar>, policy: Policy) -> Result<Client> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ConnectError::InvalidInput(format!("Invalid user agent: {}", e)))?;

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent)
            .redirect(policy)
            .pool_idle_timeout(Duration::from_secs(90));

        if config.enable_cookies {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| ConnectError::http(format!("Failed to build HTTP client: {}", e)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a request and classify the outcome
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let accepts_json = request.accepts_json();
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        tracing::debug!(method = %request.method, url = %request.url, "request");

        let mut builder = client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(ref value) => builder.json(value),
            RequestBody::Form(ref pairs) => {
                let builder = if request.headers.contains_key(CONTENT_TYPE) {
                    builder
                } else {
                    builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                };
                builder.body(encode_form(pairs))
            }
            RequestBody::Text(ref text) => builder.body(text.clone()),
        };

        let response = builder.send().await.map_err(classify_transport_error)?;

        let status = response.status().as_u16();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(classify_transport_error)?;

        tracing::debug!(status, url = %url, "response");
        tracing::trace!(body = %text, "response body");

        if status >= 400 {
            return Err(ConnectError::ServiceNotFound {
                url: request.url,
                status,
                message: error_message(&headers, &text),
            });
        }

        Ok(RawResponse {
            status,
            url,
            headers,
            text,
            accepts_json,
        })
    }

    /// Execute a request and return its body as JSON
    pub async fn json(&self, request: ApiRequest) -> Result<Value> {
        Ok(self.send(request).await?.body()?.into_value())
    }

    /// Execute a request and deserialize its body
    pub async fn typed<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.json()
    }

    /// Execute a request and return its body as text
    pub async fn text(&self, request: ApiRequest) -> Result<String> {
        Ok(self.send(request).await?.text)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Build a HeaderMap from name/value pairs; later pairs override earlier ones
pub fn header_map<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes())
            .map_err(|e| ConnectError::InvalidInput(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::from_str(value.as_ref())
            .map_err(|e| ConnectError::InvalidInput(format!("Invalid header value: {}", e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// URL-encode form pairs with `%20` for spaces
pub fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false)
}

/// Error message of a failed response: `error.message` when the body is JSON
fn error_message(headers: &HeaderMap, text: &str) -> String {
    if is_json_content(headers) {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            if let Some(message) = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
            {
                return message.to_string();
            }
        }
    }
    snippet(text)
}

fn classify_transport_error(error: reqwest::Error) -> ConnectError {
    if error.is_timeout() {
        ConnectError::timeout(format!(
            "Timeout occurred while connecting to Audi connect: {}",
            error
        ))
    } else {
        ConnectError::http(format!(
            "Error occurred while communicating with Audi connect: {}",
            error
        ))
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(ERROR_BODY_SNIPPET).collect()
}

// ===== TESTS =====
