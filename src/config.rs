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


//! Client configuration
//!
//! Everything the client needs is passed in code: credentials, country,
//! optional security PIN, unit system and timing. Nothing is read from the
//! environment.
//!
//! # Example
//! ```rust
//! use audi_connect::config::{ConnectConfig, UnitSystem};
//! use std::time::Duration;
//!
//! let config = ConnectConfig::builder("user@example.com", "secret")
//!     .country("de")
//!     .spin("1234")
//!     .unit_system(UnitSystem::Imperial)
//!     .poll_interval(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.country, "DE");
//! ```

use crate::api::client::ClientConfig;
use crate::api::commands::ApiLevels;
use crate::error::{ConnectError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Vendor Constants
// ============================================================================

/// Brand segment used in every `/bs/...` service path
pub const BRAND: &str = "Audi";

/// User agent of the official Android app
pub const HDR_USER_AGENT: &str =
    "Android/4.24.2 (Build 800240338.root project 'onetouch-android'.ext.buildTime) Android/11";

/// App version announced in `X-App-Version`
pub const HDR_XAPP_VERSION: &str = "4.24.2";

/// User agent the backend expects on remote-command calls
pub const OKHTTP_USER_AGENT: &str = "okhttp/3.11.0";

/// Delay between login attempts
pub const LOGIN_RETRY_DELAY_SECS: u64 = 10;

/// Login attempts before giving up
pub const LOGIN_ATTEMPTS: u32 = 3;

/// Sleep before each action status poll
pub const REQUEST_STATUS_SLEEP_SECS: u64 = 10;

/// Status polls before an action counts as timed out
pub const MAX_RESPONSE_ATTEMPTS: u32 = 10;

const MARKET_URL: &str = "https://content.app.my.audi.com/service/mobileapp/configurations";
const MBB_URL: &str = "https://mbboauth-1d.prd.ece.vwg-connect.com/mbbcoauth";
const URL_HOME_REGION: &str = "https://msg.volkswagen.de/fs-car";
const URL_HOME_REGION_SETTER: &str = "https://mal-1a.prd.ece.vwg-connect.com/api";
const URL_INFO_VEHICLE: &str = "https://app-api.live-my.audi.com/vgql/v1/graphql";
const URL_INFO_VEHICLE_US: &str = "https://app-api.my.aoa.audi.com/vgql/v1/graphql";
const URL_HERE_COM: &str = "https://csm.cc.api.here.com/api/v1";
const URL_INFO_USER: &str = "https://userinformationservice.apps.emea.vwapps.io";
const CLIENT_ID: &str = "09b6cbec-cd19-4589-82fd-363dfa8c24da@apps_vw-dilab_com";

// ============================================================================
// Unit System
// ============================================================================

/// Unit system applied to distances during attribute mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Kilometers (vendor native)
    #[default]
    Metric,
    /// Miles
    Imperial,
}

impl UnitSystem {
    /// Parse "metric" / "imperial" (case-insensitive)
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "metric" => Some(Self::Metric),
            "imperial" => Some(Self::Imperial),
            _ => None,
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Fixed vendor base URLs that are not delivered by service discovery
///
/// Overridable so the client can be pointed at a proxy or a mock server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Mobile app market configuration root
    pub market_url: String,
    /// MBB OAuth base, used when the market config has none
    pub mbb_url: String,
    /// Default home region (read URL)
    pub home_region_url: String,
    /// Default home region setter, also hosts the homeRegion lookup
    pub home_region_setter_url: String,
    /// GraphQL vehicle list
    pub vehicle_info_url: String,
    /// GraphQL vehicle list for the US market
    pub vehicle_info_url_us: String,
    /// HERE location service
    pub here_url: String,
    /// User information service
    pub user_info_url: String,
    /// IDK client id used when the market config has none
    pub default_client_id: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            market_url: MARKET_URL.to_string(),
            mbb_url: MBB_URL.to_string(),
            home_region_url: URL_HOME_REGION.to_string(),
            home_region_setter_url: URL_HOME_REGION_SETTER.to_string(),
            vehicle_info_url: URL_INFO_VEHICLE.to_string(),
            vehicle_info_url_us: URL_INFO_VEHICLE_US.to_string(),
            here_url: URL_HERE_COM.to_string(),
            user_info_url: URL_INFO_USER.to_string(),
            default_client_id: CLIENT_ID.to_string(),
        }
    }
}

impl Endpoints {
    /// All fixed endpoints below a single origin (local mock, recording proxy)
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            market_url: format!("{base}/configurations"),
            mbb_url: format!("{base}/mbbcoauth"),
            home_region_url: format!("{base}/fs-car"),
            home_region_setter_url: format!("{base}/api"),
            vehicle_info_url: format!("{base}/vgql/v1/graphql"),
            vehicle_info_url_us: format!("{base}/us/vgql/v1/graphql"),
            here_url: format!("{base}/here/api/v1"),
            user_info_url: format!("{base}/userinformation"),
            default_client_id: CLIENT_ID.to_string(),
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Timing of the action-confirmation poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep before every status request
    pub interval: Duration,
    /// Status requests before giving up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(REQUEST_STATUS_SLEEP_SECS),
            max_attempts: MAX_RESPONSE_ATTEMPTS,
        }
    }
}

// ============================================================================
// Connect Config
// ============================================================================

/// Complete configuration of an account client
#[derive(Clone)]
pub struct ConnectConfig {
    /// myAudi login (e-mail)
    pub username: String,
    /// myAudi password
    pub password: String,
    /// Two-letter country code, uppercase
    pub country: String,
    /// Security PIN for lock/unlock and heating commands
    pub spin: Option<String>,
    /// Distance units for mapped attributes
    pub unit_system: UnitSystem,
    /// Fixed vendor base URLs
    pub endpoints: Endpoints,
    /// HTTP transport settings
    pub client: ClientConfig,
    /// Action-confirmation timing
    pub poll: PollConfig,
    /// Login attempts on transport failures
    pub login_attempts: u32,
    /// Delay between login attempts
    pub login_retry_delay: Duration,
    /// API levels assigned to newly discovered vehicles
    pub api_levels: ApiLevels,
}

impl fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("country", &self.country)
            .field("spin", &self.spin.as_ref().map(|_| "***"))
            .field("unit_system", &self.unit_system)
            .field("endpoints", &self.endpoints)
            .field("client", &self.client)
            .field("poll", &self.poll)
            .field("login_attempts", &self.login_attempts)
            .field("login_retry_delay", &self.login_retry_delay)
            .field("api_levels", &self.api_levels)
            .finish()
    }
}

impl ConnectConfig {
    pub fn builder<U: Into<String>, P: Into<String>>(username: U, password: P) -> ConnectConfigBuilder {
        ConnectConfigBuilder::new(username, password)
    }
}

/// Builder for ConnectConfig
#[derive(Debug)]
pub struct ConnectConfigBuilder {
    config: ConnectConfig,
}

impl ConnectConfigBuilder {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            config: ConnectConfig {
                username: username.into(),
                password: password.into(),
                country: "DE".to_string(),
                spin: None,
                unit_system: UnitSystem::default(),
                endpoints: Endpoints::default(),
                client: ClientConfig::default(),
                poll: PollConfig::default(),
                login_attempts: LOGIN_ATTEMPTS,
                login_retry_delay: Duration::from_secs(LOGIN_RETRY_DELAY_SECS),
                api_levels: ApiLevels::default(),
            },
        }
    }

    pub fn country<S: Into<String>>(mut self, country: S) -> Self {
        self.config.country = country.into().to_uppercase();
        self
    }

    pub fn spin<S: Into<String>>(mut self, spin: S) -> Self {
        self.config.spin = Some(spin.into());
        self
    }

    pub fn unit_system(mut self, unit_system: UnitSystem) -> Self {
        self.config.unit_system = unit_system;
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    pub fn client(mut self, client: ClientConfig) -> Self {
        self.config.client = client;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll.interval = interval;
        self
    }

    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.poll.max_attempts = attempts;
        self
    }

    pub fn login_attempts(mut self, attempts: u32) -> Self {
        self.config.login_attempts = attempts;
        self
    }

    pub fn login_retry_delay(mut self, delay: Duration) -> Self {
        self.config.login_retry_delay = delay;
        self
    }

    pub fn api_levels(mut self, levels: ApiLevels) -> Self {
        self.config.api_levels = levels;
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// `InvalidInput` for empty credentials, a country code that is not two
    /// letters, a zero attempt count, or a PIN that is not hex.
    pub fn build(self) -> Result<ConnectConfig> {
        let config = self.config;

        if config.username.trim().is_empty() || config.password.is_empty() {
            return Err(ConnectError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }
        if config.country.len() != 2 || !config.country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConnectError::InvalidInput(format!(
                "invalid country code: {}",
                config.country
            )));
        }
        if config.login_attempts == 0 || config.poll.max_attempts == 0 {
            return Err(ConnectError::InvalidInput(
                "attempt counts must be at least 1".to_string(),
            ));
        }
        if let Some(ref spin) = config.spin {
            if spin.is_empty() || !spin.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConnectError::InvalidInput(
                    "security PIN must consist of hex digits".to_string(),
                ));
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ConnectConfig::builder("user@example.com", "pw").build().unwrap();

        assert_eq!(config.country, "DE");
        assert_eq!(config.spin, None);
        assert_eq!(config.unit_system, UnitSystem::Metric);
        assert_eq!(config.poll.interval, Duration::from_secs(10));
        assert_eq!(config.poll.max_attempts, 10);
        assert_eq!(config.login_attempts, 3);
        assert_eq!(config.login_retry_delay, Duration::from_secs(10));
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConnectConfig::builder("user@example.com", "pw")
            .country("fr")
            .spin("1234")
            .unit_system(UnitSystem::Imperial)
            .poll_interval(Duration::from_millis(5))
            .max_poll_attempts(3)
            .login_attempts(1)
            .login_retry_delay(Duration::ZERO)
            .build()
            .unwrap();

        assert_eq!(config.country, "FR");
        assert_eq!(config.spin.as_deref(), Some("1234"));
        assert_eq!(config.unit_system, UnitSystem::Imperial);
        assert_eq!(config.poll.max_attempts, 3);
        assert_eq!(config.login_attempts, 1);
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(ConnectConfig::builder("", "pw").build().is_err());
        assert!(ConnectConfig::builder("u", "").build().is_err());
        assert!(ConnectConfig::builder("u", "pw").country("DEU").build().is_err());
        assert!(ConnectConfig::builder("u", "pw").spin("12x4").build().is_err());
        assert!(ConnectConfig::builder("u", "pw").max_poll_attempts(0).build().is_err());
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = ConnectConfig::builder("user@example.com", "hunter2")
            .spin("9876")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);

        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("9876"));
    }

    #[test]
    fn test_unit_system_parse() {
        assert_eq!(UnitSystem::from_str("Imperial"), Some(UnitSystem::Imperial));
        assert_eq!(UnitSystem::from_str("metric"), Some(UnitSystem::Metric));
        assert_eq!(UnitSystem::from_str("nautical"), None);
    }

    #[test]
    fn test_endpoints_rooted_at() {
        let endpoints = Endpoints::rooted_at("http://127.0.0.1:8080/");
        assert_eq!(endpoints.market_url, "http://127.0.0.1:8080/configurations");
        assert_eq!(endpoints.home_region_setter_url, "http://127.0.0.1:8080/api");
        assert_eq!(endpoints.default_client_id, CLIENT_ID);
    }
}
