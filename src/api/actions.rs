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


//! Remote commands
//!
//! Every command goes to the vehicle's home region:
//! `{url}/bs/{service}/v1/Audi/{country}/vehicles/{vin}/…`
//!
//! 1. Fetch a security token when the operation is PIN-gated
//! 2. POST the payload of the vehicle's API level
//! 3. Poll the returned request or action id until the vehicle confirms
//!
//! Pre-heating, ventilation and honk/flash return no id and are not polled.

use crate::api::auth::TokenType;
use crate::api::client::ApiRequest;
use crate::api::commands::{self, ApiLevels, CommandPayload, HeaterSource, HonkFlashMode, SeatZones};
use crate::api::poller::ActionPoller;
use crate::api::region::HomeRegion;
use crate::api::security;
use crate::config::BRAND;
use crate::connect::AudiConnect;
use crate::error::{ConnectError, Result};
use crate::model::path::get_string;
use reqwest::header::HeaderMap;
use serde_json::Value;

const REQUEST_SUCCESSFUL: &str = "request_successful";
const REQUEST_FAILED: &str = "request_failed";
const SUCCEEDED: &str = "succeeded";
const FAILED: &str = "failed";
const SUCCESSFUL: &str = "successful";

/// Where a command for one vehicle goes
#[derive(Debug, Clone)]
struct Target {
    vin: String,
    region: HomeRegion,
    country: String,
    levels: ApiLevels,
}

impl Target {
    fn service_url(&self, service: &str) -> String {
        format!(
            "{}/bs/{}/v1/{}/{}/vehicles/{}",
            self.region.url, service, BRAND, self.country, self.vin
        )
    }
}

impl AudiConnect {
    // ========================================================================
    // Locking
    // ========================================================================

    /// Lock or unlock the doors
    pub async fn set_lock(&mut self, vin: &str, lock: bool) -> Result<()> {
        let target = self.target(vin).await?;
        let operation = if lock { "LOCK" } else { "UNLOCK" };
        let token = self
            .security_token(&target, &format!("rlu_v1/operations/{}", operation))
            .await?;

        let base = target.service_url("rlu");
        let body = self
            .post_action(&format!("{}/actions", base), &commands::lock(lock), token.as_deref(), false)
            .await?;
        let request_id = get_string(&body, "rluActionResponse.requestId").unwrap_or_default();

        self.poller()
            .poll(
                &format!("{}/requests/{}/status", base, request_id),
                if lock { "lock vehicle" } else { "unlock vehicle" },
                REQUEST_SUCCESSFUL,
                Some(REQUEST_FAILED),
                "requestStatusResponse.status",
            )
            .await
    }

    // ========================================================================
    // Climatisation
    // ========================================================================

    /// Start or stop climatisation
    ///
    /// A non-electric heater source sends its token as `X-securityToken`.
    pub async fn set_climater(&mut self, vin: &str, start: bool, source: HeaterSource) -> Result<()> {
        let target = self.target(vin).await?;
        let operation = match source {
            HeaterSource::Electric => "P_START_CLIMA_EL",
            _ => "P_START_CLIMA_AU",
        };
        let token = self
            .security_token(&target, &format!("rclima_v1/operations/{}", operation))
            .await?;

        let payload = commands::climater(target.levels.climatisation, start, source);
        self.climater_action(
            &target,
            &payload,
            token.as_deref(),
            source != HeaterSource::Electric,
            if start { "start climatisation" } else { "stop climatisation" },
        )
        .await
    }

    /// Set the target temperature in °C
    pub async fn set_climater_temp(
        &mut self,
        vin: &str,
        temperature: f64,
        source: HeaterSource,
        glass_heating: bool,
        seats: SeatZones,
    ) -> Result<()> {
        let target = self.target(vin).await?;
        let payload = commands::climater_temp(
            target.levels.climatisation,
            commands::target_temperature_dk(temperature),
            source,
            glass_heating,
            seats,
        );
        self.climater_action(&target, &payload, None, false, "set target temperature")
            .await
    }

    pub async fn set_window_heating(&mut self, vin: &str, start: bool) -> Result<()> {
        let target = self.target(vin).await?;
        let payload = commands::window_heating(target.levels.window_heating, start);
        self.climater_action(
            &target,
            &payload,
            None,
            false,
            if start { "start window heating" } else { "stop window heating" },
        )
        .await
    }

    // ========================================================================
    // Auxiliary heater
    // ========================================================================

    pub async fn set_pre_heating(&mut self, vin: &str, start: bool, duration_min: u32) -> Result<()> {
        let target = self.target(vin).await?;
        let payload = commands::pre_heating(target.levels.ventilation, start, duration_min);
        self.heater_action(&target, start, &payload).await
    }

    pub async fn set_ventilation(&mut self, vin: &str, start: bool, duration_min: u32) -> Result<()> {
        let target = self.target(vin).await?;
        let payload = commands::ventilation(target.levels.ventilation, start, duration_min);
        self.heater_action(&target, start, &payload).await
    }

    // ========================================================================
    // Charging
    // ========================================================================

    /// Start or stop charging; `timer` selects timer-based charging on `JsonV2`
    pub async fn set_battery_charger(&mut self, vin: &str, start: bool, timer: bool) -> Result<()> {
        let target = self.target(vin).await?;
        let payload = commands::battery_charger(target.levels.charger, start, timer);
        self.charger_action(&target, &payload, if start { "start charger" } else { "stop charger" })
            .await
    }

    /// Maximum AC charge current in amperes
    pub async fn set_charger_max(&mut self, vin: &str, current_amps: u32) -> Result<()> {
        let target = self.target(vin).await?;
        let payload = commands::charger_max(target.levels.charger, current_amps);
        self.charger_action(&target, &payload, "set charger max current").await
    }

    // ========================================================================
    // Misc
    // ========================================================================

    /// Honk and flash, or flash only, at the last known parking position
    ///
    /// # Errors
    /// `UnsupportedCapability` when no parking position is known.
    pub async fn set_honkflash(&mut self, vin: &str, mode: HonkFlashMode, duration_secs: u32) -> Result<()> {
        let position = self.vehicle_mut(vin)?.state.position;
        let Some(position) = position else {
            return Err(ConnectError::UnsupportedCapability {
                vin: vin.to_uppercase(),
                capability: "honk and flash without a known position".to_string(),
            });
        };

        let target = self.target(vin).await?;
        let payload = commands::honkflash(mode, duration_secs, position.latitude, position.longitude);
        self.post_action(
            &format!("{}/honkAndFlash", target.service_url("rhf")),
            &payload,
            None,
            false,
        )
        .await?;
        Ok(())
    }

    /// Wake the vehicle so that it uploads fresh data
    pub async fn refresh_vehicle_data(&mut self, vin: &str) -> Result<()> {
        let vin = self.vehicle_mut(vin)?.vin.clone();
        let cv_url = self.auth.uris().await?.cv_url;

        let headers = self.auth.auth_headers(TokenType::Idk, HeaderMap::new()).await?;
        let body = self
            .auth
            .client()
            .json(ApiRequest::post(format!("{}/vehicles/{}/vehiclewakeup", cv_url, vin)).headers(headers))
            .await?;
        let request_id = get_string(&body, "data.requestID").unwrap_or_default();

        self.poller()
            .poll_pending(
                &format!("{}/vehicles/{}/pendingrequests", cv_url, vin),
                "refresh vehicle data",
                SUCCESSFUL,
                Some(FAILED),
                &request_id,
            )
            .await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn target(&mut self, vin: &str) -> Result<Target> {
        let vehicle = self.vehicle_mut(vin)?;
        let vin = vehicle.vin.clone();
        let levels = vehicle.api_levels;
        let region = self.home_region(&vin).await?;
        let country = self.auth.uris().await?.country;

        Ok(Target {
            vin,
            region,
            country,
            levels,
        })
    }

    fn poller(&self) -> ActionPoller<'_> {
        ActionPoller::new(&self.auth, self.auth.config().poll)
    }

    async fn security_token(&self, target: &Target, operation: &str) -> Result<Option<String>> {
        security::security_token(&self.auth, &target.region.url_setter, &target.vin, operation).await
    }

    async fn post_action(
        &self,
        url: &str,
        payload: &CommandPayload,
        security_token: Option<&str>,
        x_security: bool,
    ) -> Result<Value> {
        let headers = self
            .auth
            .action_headers(payload.content_type, security_token, x_security)
            .await?;
        self.auth
            .client()
            .json(ApiRequest::post(url).headers(headers).text(payload.body.clone()))
            .await
    }

    async fn climater_action(
        &self,
        target: &Target,
        payload: &CommandPayload,
        security_token: Option<&str>,
        x_security: bool,
        action: &str,
    ) -> Result<()> {
        let base = format!("{}/climater/actions", target.service_url("climatisation"));
        let body = self.post_action(&base, payload, security_token, x_security).await?;
        self.poll_action(&base, &body, action).await
    }

    async fn charger_action(&self, target: &Target, payload: &CommandPayload, action: &str) -> Result<()> {
        let base = format!("{}/charger/actions", target.service_url("batterycharge"));
        let body = self.post_action(&base, payload, None, false).await?;
        self.poll_action(&base, &body, action).await
    }

    async fn poll_action(&self, base: &str, body: &Value, action: &str) -> Result<()> {
        let action_id = get_string(body, "action.actionId").unwrap_or_default();
        self.poller()
            .poll(
                &format!("{}/{}", base, action_id),
                action,
                SUCCEEDED,
                Some(FAILED),
                "action.actionState",
            )
            .await
    }

    async fn heater_action(&self, target: &Target, start: bool, payload: &CommandPayload) -> Result<()> {
        let operation = if start { "P_QSACT" } else { "P_QSTOPACT" };
        let token = self
            .security_token(target, &format!("rheating_v1/operations/{}", operation))
            .await?;
        self.post_action(
            &format!("{}/action", target.service_url("rs")),
            payload,
            token.as_deref(),
            false,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::commands::ChargerApi;

    #[test]
    fn test_service_url() {
        let target = Target {
            vin: "WAUZZZ".to_string(),
            region: HomeRegion {
                url: "https://fal-1a.example.com/fs-car".to_string(),
                url_setter: "https://mal-1a.example.com/api".to_string(),
            },
            country: "DE".to_string(),
            levels: ApiLevels {
                charger: ChargerApi::JsonV3,
                ..Default::default()
            },
        };

        assert_eq!(
            target.service_url("rlu"),
            "https://fal-1a.example.com/fs-car/bs/rlu/v1/Audi/DE/vehicles/WAUZZZ"
        );
    }
}
