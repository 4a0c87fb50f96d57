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


//! Vehicle data accessors
//!
//! Read-only requests, grouped by the service that answers them:
//!
//! | Data | Endpoint | Token |
//! |---|---|---|
//! | vehicle list | GraphQL `userVehicles` | AZS |
//! | selective status, capabilities, parking position | `{cv_url}/vehicles/{vin}/…` | IDK |
//! | saved locations | `{here_url}/location` | HERE |
//! | charger, climater, pre-heater, stored data | `{url}/bs/…` of the home region | MBB |
//! | trip statistics | `{url_setter}/bs/tripstatistics/…` | MBB |
//!
//! Each accessor returns the mapped attribute group; the raw documents never
//! leave this module.

use crate::api::auth::{Auth, TokenType};
use crate::api::client::{header_map, ApiRequest};
use crate::api::region::HomeRegion;
use crate::config::BRAND;
use crate::error::{ConnectError, Result};
use crate::model::info::{UserVehiclesData, VehicleInfo, USER_VEHICLES_QUERY};
use crate::model::legacy::{ChargerState, ClimaterState, PreheaterState, StoredData};
use crate::model::path::get_path;
use crate::model::position::{Location, Position};
use crate::model::status::{Capability, SelectiveStatus};
use crate::model::trip::{TripKind, TripStatistics};
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::header::HeaderMap;
use serde_json::{json, Value};

/// Trip statistics cover everything up to this far in the future
const TRIP_WINDOW_LEAD_MINUTES: i64 = 90;

const TRIP_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

impl Auth {
    // ========================================================================
    // Account
    // ========================================================================

    /// List the vehicles of the account
    ///
    /// # Errors
    /// `InvalidApiResponse` when the answer carries no `data` member.
    pub async fn vehicle_list(&self) -> Result<Vec<VehicleInfo>> {
        let uris = self.uris().await?;
        let endpoints = &self.config().endpoints;
        let url = if uris.country == "US" {
            &endpoints.vehicle_info_url_us
        } else {
            &endpoints.vehicle_info_url
        };

        let language = format!("{}-{}", uris.language, uris.country);
        let extra = header_map(&[
            ("Accept-Language", language.as_str()),
            ("Content-Type", "application/json"),
            ("X-User-Country", uris.country.as_str()),
        ])?;
        let headers = self.auth_headers(TokenType::Audi, extra).await?;

        let body = self
            .client()
            .json(
                ApiRequest::post(url.as_str())
                    .headers(headers)
                    .json(json!({ "query": USER_VEHICLES_QUERY }))
                    .no_redirects(),
            )
            .await?;

        let data = body.get("data").cloned().ok_or_else(|| {
            ConnectError::invalid_response(
                "Invalid json in vehicle information",
                Some(body.to_string()),
            )
        })?;
        let data: UserVehiclesData = serde_json::from_value(data)?;

        tracing::debug!(count = data.user_vehicles.len(), "vehicle list");
        Ok(data.user_vehicles)
    }

    // ========================================================================
    // Connected-vehicle service
    // ========================================================================

    /// Selective status of `vin`
    ///
    /// The user capabilities are requested first; their ids are the jobs of
    /// the second, full request.
    pub async fn selective_status(&self, vin: &str) -> Result<SelectiveStatus> {
        let base = format!("{}/vehicles/{}/selectivestatus", self.uris().await?.cv_url, vin);

        let capabilities = self.idk_json(&format!("{}?jobs=userCapabilities", base)).await?;
        let jobs = capability_jobs(&capabilities);
        tracing::debug!(vin, jobs = %jobs, "selective status jobs");

        // job list goes out with literal commas
        let body = self.idk_json(&format!("{}?jobs={}", base, jobs)).await?;
        SelectiveStatus::from_value(body, self.config().unit_system)
    }

    /// Capabilities of `vin`
    pub async fn capabilities(&self, vin: &str) -> Result<Vec<Capability>> {
        let url = format!("{}/vehicles/{}/capabilities", self.uris().await?.cv_url, vin);
        let body = self.idk_json(&url).await?;

        match body.get("capabilities") {
            Some(list) => Ok(serde_json::from_value(list.clone())?),
            None => Ok(Vec::new()),
        }
    }

    /// Last parking position; `None` while the vehicle is moving
    pub async fn parking_position(&self, vin: &str) -> Result<Option<Position>> {
        let url = format!("{}/vehicles/{}/parkingposition", self.uris().await?.cv_url, vin);
        let body = self.idk_json(&url).await?;
        Ok(Position::from_response(&body))
    }

    /// Locations saved with the HERE service
    pub async fn location(&self) -> Result<Location> {
        let url = format!("{}/location", self.uris().await?.here_url);
        let headers = self.auth_headers(TokenType::Here, HeaderMap::new()).await?;
        let body = self.client().json(ApiRequest::get(url).headers(headers)).await?;
        Ok(Location::from_response(&body))
    }

    // ========================================================================
    // Legacy MBB services
    // ========================================================================

    /// `None` when the vehicle has neither charger settings nor status
    pub async fn charger(&self, region: &HomeRegion, vin: &str) -> Result<Option<ChargerState>> {
        let body = self.mbb_json(&self.legacy_url(region, "batterycharge", vin, "charger").await?).await?;
        Ok(ChargerState::from_response(&body, self.config().unit_system))
    }

    pub async fn climater(&self, region: &HomeRegion, vin: &str) -> Result<Option<ClimaterState>> {
        let body = self.mbb_json(&self.legacy_url(region, "climatisation", vin, "climater").await?).await?;
        Ok(ClimaterState::from_response(&body))
    }

    pub async fn preheater(&self, region: &HomeRegion, vin: &str) -> Result<Option<PreheaterState>> {
        let body = self.mbb_json(&self.legacy_url(region, "rs", vin, "status").await?).await?;
        Ok(PreheaterState::from_response(&body))
    }

    pub async fn stored_data(&self, region: &HomeRegion, vin: &str) -> Result<StoredData> {
        let body = self.mbb_json(&self.legacy_url(region, "vsr", vin, "status").await?).await?;
        StoredData::from_response(&body, self.config().unit_system)
    }

    /// Trip statistics of one aggregation period
    pub async fn trip_data(&self, region: &HomeRegion, vin: &str, kind: TripKind) -> Result<TripStatistics> {
        let url = format!(
            "{}/bs/tripstatistics/v1/vehicles/{}/tripdata/{}",
            region.url_setter,
            vin,
            kind.as_str()
        );
        let to = (Utc::now() + ChronoDuration::minutes(TRIP_WINDOW_LEAD_MINUTES))
            .format(TRIP_TIME_FORMAT)
            .to_string();

        let headers = self.auth_headers(TokenType::Mbb, HeaderMap::new()).await?;
        let body = self
            .client()
            .json(ApiRequest::get(url).headers(headers).query(vec![
                ("type", "list".to_string()),
                ("from", "1970-01-01T00:00:00Z".to_string()),
                ("to", to),
            ]))
            .await?;

        TripStatistics::from_response(&body)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn legacy_url(&self, region: &HomeRegion, service: &str, vin: &str, resource: &str) -> Result<String> {
        let country = self.uris().await?.country;
        Ok(format!(
            "{}/bs/{}/v1/{}/{}/vehicles/{}/{}",
            region.url, service, BRAND, country, vin, resource
        ))
    }

    async fn idk_json(&self, url: &str) -> Result<Value> {
        let headers = self.auth_headers(TokenType::Idk, HeaderMap::new()).await?;
        self.client().json(ApiRequest::get(url).headers(headers)).await
    }

    async fn mbb_json(&self, url: &str) -> Result<Value> {
        let headers = self.auth_headers(TokenType::Mbb, HeaderMap::new()).await?;
        self.client().json(ApiRequest::get(url).headers(headers)).await
    }
}

/// `jobs` parameter for the full selective status request
fn capability_jobs(capabilities: &Value) -> String {
    let mut jobs: Vec<String> = get_path(capabilities, "userCapabilities.capabilitiesStatus.value")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_str))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    jobs.push("userCapabilities".to_string());
    jobs.join(",")
}
