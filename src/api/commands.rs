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


//! Remote command payloads
//!
//! Vehicle generations accept different payload formats for the same
//! command. Each vehicle carries an [`ApiLevels`] selecting one strategy per
//! command family; the builders here turn a command into the exact content
//! type and body that generation expects.
//!
//! | Family | Strategies | Default |
//! |---|---|---|
//! | climatisation | `Json`, `Xml` (e-tron) | `Json` |
//! | ventilation / pre-heating | `Xml`, `Json` | `Xml` |
//! | charger | `Xml`, `JsonV2`, `JsonV3` | `Xml` |
//! | window heating | `Xml`, `Json` | `Xml` |

use crate::error::{ConnectError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const CT_JSON: &str = "application/json";
const CT_LOCK: &str = "application/vnd.vwg.mbb.RemoteLockUnlock_v1_0_0+xml";
const CT_CLIMATER_XML: &str = "application/vnd.vwg.mbb.ClimaterAction_v1_0_0+xml;charset=utf-8";
const CT_WINDOW_HEATING_XML: &str = "application/vnd.vwg.mbb.ClimaterAction_v1_0_0+xml";
const CT_HEATER_XML: &str = "application/vnd.vwg.mbb.RemoteStandheizung_v2_0_0+xml";
const CT_VENTILATION_JSON: &str = "application/vnd.vwg.mbb.RemoteStandheizung_v2_0_2+json";
const CT_CHARGER_XML: &str = "application/vnd.vwg.mbb.ChargerAction_v1_0_0+xml";

/// Target temperature used when climatisation is started (dK)
const DEFAULT_TARGET_TEMPERATURE_DK: i64 = 2940;

// ============================================================================
// API Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimatisationApi {
    #[default]
    Json,
    /// Heater-source XML format of e-tron vehicles
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VentilationApi {
    #[default]
    Xml,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargerApi {
    #[default]
    Xml,
    JsonV2,
    JsonV3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowHeatingApi {
    #[default]
    Xml,
    Json,
}

/// Payload strategy per command family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiLevels {
    pub climatisation: ClimatisationApi,
    /// Also selects the pre-heating format
    pub ventilation: VentilationApi,
    pub charger: ChargerApi,
    pub window_heating: WindowHeatingApi,
}

/// A single API level change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiLevel {
    Climatisation(ClimatisationApi),
    Ventilation(VentilationApi),
    Charger(ChargerApi),
    WindowHeating(WindowHeatingApi),
}

impl ApiLevel {
    /// Parse the vendor's numeric levels (`climatisation=3`, `charger=2`, …)
    pub fn from_numeric(family: &str, level: u8) -> Result<Self> {
        let level = match (family, level) {
            ("climatisation", 3) => Self::Climatisation(ClimatisationApi::Xml),
            ("climatisation", _) => Self::Climatisation(ClimatisationApi::Json),
            ("ventilation", 1) => Self::Ventilation(VentilationApi::Xml),
            ("ventilation", _) => Self::Ventilation(VentilationApi::Json),
            ("charger", 2) => Self::Charger(ChargerApi::JsonV2),
            ("charger", 3) => Self::Charger(ChargerApi::JsonV3),
            ("charger", _) => Self::Charger(ChargerApi::Xml),
            ("window_heating", 2) => Self::WindowHeating(WindowHeatingApi::Json),
            ("window_heating", _) => Self::WindowHeating(WindowHeatingApi::Xml),
            (other, _) => {
                return Err(ConnectError::InvalidInput(format!(
                    "unknown API level family: {}",
                    other
                )))
            }
        };
        Ok(level)
    }
}

impl ApiLevels {
    pub fn apply(&mut self, level: ApiLevel) {
        match level {
            ApiLevel::Climatisation(api) => self.climatisation = api,
            ApiLevel::Ventilation(api) => self.ventilation = api,
            ApiLevel::Charger(api) => self.charger = api,
            ApiLevel::WindowHeating(api) => self.window_heating = api,
        }
    }
}

// ============================================================================
// Command Parameters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaterSource {
    #[default]
    Electric,
    Auxiliary,
    Automatic,
}

impl HeaterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electric => "electric",
            Self::Auxiliary => "auxiliary",
            Self::Automatic => "automatic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HonkFlashMode {
    Honk,
    Flash,
}

/// Seat zones heated along with the cabin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeatZones {
    pub front_left: bool,
    pub front_right: bool,
    pub rear_left: bool,
    pub rear_right: bool,
}

/// Content type and body of one command request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPayload {
    pub content_type: &'static str,
    pub body: String,
}

impl CommandPayload {
    fn json(content_type: &'static str, body: Value) -> Self {
        Self {
            content_type,
            body: body.to_string(),
        }
    }

    fn xml(content_type: &'static str, body: String) -> Self {
        Self { content_type, body }
    }
}

/// Celsius to the deci-Kelvin the backend expects
pub fn target_temperature_dk(celsius: f64) -> i64 {
    ((celsius * 10.0).round() + 2731.0).trunc() as i64
}

// ============================================================================
// Builders
// ============================================================================

pub fn lock(lock: bool) -> CommandPayload {
    CommandPayload::xml(
        CT_LOCK,
        format!(
            r#"<?xml version="1.0" encoding= "UTF-8" ?><rluAction xmlns="http://audi.de/connect/rlu"><action>{}</action></rluAction>"#,
            if lock { "lock" } else { "unlock" }
        ),
    )
}

pub fn climater(api: ClimatisationApi, start: bool, source: HeaterSource) -> CommandPayload {
    let action = if start { "startClimatisation" } else { "stopClimatisation" };
    match api {
        ClimatisationApi::Xml => CommandPayload::xml(
            CT_CLIMATER_XML,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><action><type>{}</type><settings><heaterSource>{}</heaterSource></settings></action>"#,
                action,
                source.as_str()
            ),
        ),
        ClimatisationApi::Json if start => CommandPayload::json(
            CT_JSON,
            json!({
                "action": {
                    "type": action,
                    "settings": {
                        "targetTemperature": DEFAULT_TARGET_TEMPERATURE_DK,
                        "climatisationWithoutHVpower": true,
                        "heaterSource": source.as_str(),
                        "climaterElementSettings": {
                            "isClimatisationAtUnlock": false,
                            "isMirrorHeatingEnabled": true,
                        }
                    }
                }
            }),
        ),
        ClimatisationApi::Json => CommandPayload::json(CT_JSON, json!({"action": {"type": action}})),
    }
}

pub fn climater_temp(
    api: ClimatisationApi,
    temperature_dk: i64,
    source: HeaterSource,
    glass_heating: bool,
    seats: SeatZones,
) -> CommandPayload {
    match api {
        ClimatisationApi::Xml => CommandPayload::xml(
            CT_CLIMATER_XML,
            format!(
                concat!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><action><type>setSettings</type><settings>"#,
                    "<targetTemperature>{}</targetTemperature>",
                    "<climatisationWithoutHVpower>false</climatisationWithoutHVpower>",
                    "<heaterSource>{}</heaterSource>",
                    "</settings></action>"
                ),
                temperature_dk,
                source.as_str()
            ),
        ),
        ClimatisationApi::Json => {
            let zone = |enabled: bool, position: &str| {
                json!({"value": {"isEnabled": enabled, "position": position}})
            };
            CommandPayload::json(
                CT_JSON,
                json!({
                    "action": {
                        "type": "setSettings",
                        "settings": {
                            "targetTemperature": temperature_dk,
                            "climatisationWithoutHVpower": true,
                            "heaterSource": source.as_str(),
                            "climaterElementSettings": {
                                "isClimatisationAtUnlock": false,
                                "isMirrorHeatingEnabled": glass_heating,
                                "zoneSettings": {
                                    "zoneSetting": [
                                        zone(seats.front_left, "frontLeft"),
                                        zone(seats.front_right, "frontRight"),
                                        zone(seats.rear_left, "rearLeft"),
                                        zone(seats.rear_right, "rearRight"),
                                    ]
                                }
                            }
                        }
                    }
                }),
            )
        }
    }
}

pub fn pre_heating(api: VentilationApi, start: bool, duration_min: u32) -> CommandPayload {
    match api {
        VentilationApi::Xml => CommandPayload::xml(
            CT_HEATER_XML,
            format!(
                r#"<?xml version="1.0" encoding= "UTF-8" ?><performAction xmlns="http://audi.de/connect/rs"><quickstart><active>{}</active></quickstart></performAction>"#,
                start
            ),
        ),
        VentilationApi::Json => CommandPayload::json(CT_JSON, quick_action("heating", start, duration_min)),
    }
}

pub fn ventilation(api: VentilationApi, start: bool, duration_min: u32) -> CommandPayload {
    match api {
        VentilationApi::Xml => {
            let content = if start {
                format!(
                    "<active>true</active><climatisationDuration>{}</climatisationDuration><startMode>ventilation</startMode>",
                    duration_min
                )
            } else {
                "<active>false</active>".to_string()
            };
            CommandPayload::xml(
                CT_HEATER_XML,
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" ?><performAction xmlns="http://audi.de/connect/rs"><quickstart>{}</quickstart></performAction>"#,
                    content
                ),
            )
        }
        VentilationApi::Json => CommandPayload::json(
            CT_VENTILATION_JSON,
            quick_action("ventilation", start, duration_min),
        ),
    }
}

fn quick_action(start_mode: &str, start: bool, duration_min: u32) -> Value {
    if start {
        json!({
            "performAction": {
                "quickstart": {
                    "startMode": start_mode,
                    "active": true,
                    "climatisationDuration": duration_min,
                }
            }
        })
    } else {
        json!({"performAction": {"quickstop": {"active": false}}})
    }
}

pub fn battery_charger(api: ChargerApi, start: bool, timer: bool) -> CommandPayload {
    match api {
        ChargerApi::JsonV2 => {
            let body = if start && timer {
                json!({
                    "action": {
                        "type": "selectChargingMode",
                        "settings": {"chargeModeSelection": {"value": "timerBasedCharging"}}
                    }
                })
            } else {
                json!({"action": {"type": if start { "start" } else { "stop" }}})
            };
            CommandPayload::json(CT_JSON, body)
        }
        ChargerApi::JsonV3 => CommandPayload::json(
            CT_JSON,
            json!({
                "action": {
                    "type": if start { "startBatteryCharging" } else { "stopBatteryCharging" }
                }
            }),
        ),
        ChargerApi::Xml => CommandPayload::xml(
            CT_CHARGER_XML,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" ?><action><type>{}</type></action>"#,
                if start { "start" } else { "stop" }
            ),
        ),
    }
}

pub fn charger_max(api: ChargerApi, current_amps: u32) -> CommandPayload {
    match api {
        ChargerApi::JsonV2 => CommandPayload::json(
            CT_JSON,
            json!({
                "action": {
                    "settings": {"maxChargeCurrent": current_amps},
                    "type": "setSettings",
                }
            }),
        ),
        _ => CommandPayload::xml(
            CT_CHARGER_XML,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" ?><action><type>setSettings</type><settings><maxChargeCurrent>{}</maxChargeCurrent></settings></action>"#,
                current_amps
            ),
        ),
    }
}

pub fn window_heating(api: WindowHeatingApi, start: bool) -> CommandPayload {
    let action = if start { "startWindowHeating" } else { "stopWindowHeating" };
    match api {
        WindowHeatingApi::Json => CommandPayload::json(CT_JSON, json!({"action": {"type": action}})),
        WindowHeatingApi::Xml => CommandPayload::xml(
            CT_WINDOW_HEATING_XML,
            format!(
                r#"<?xml version="1.0" encoding= "UTF-8" ?><action><type>{}</type></action>"#,
                action
            ),
        ),
    }
}

pub fn honkflash(mode: HonkFlashMode, duration_secs: u32, latitude: f64, longitude: f64) -> CommandPayload {
    let operation = match mode {
        HonkFlashMode::Honk => "HONK_AND_FLASH",
        HonkFlashMode::Flash => "FLASH_ONLY",
    };
    CommandPayload::json(
        CT_JSON,
        json!({
            "honkAndFlashRequest": {
                "serviceOperationCode": operation,
                "serviceDuration": duration_secs,
                "userPosition": {"latitude": latitude, "longitude": longitude}
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(payload: &CommandPayload) -> Value {
        serde_json::from_str(&payload.body).unwrap()
    }

    #[test]
    fn test_default_api_levels() {
        let levels = ApiLevels::default();
        assert_eq!(levels.climatisation, ClimatisationApi::Json);
        assert_eq!(levels.ventilation, VentilationApi::Xml);
        assert_eq!(levels.charger, ChargerApi::Xml);
        assert_eq!(levels.window_heating, WindowHeatingApi::Xml);
    }

    #[test]
    fn test_api_level_from_numeric() {
        let mut levels = ApiLevels::default();
        levels.apply(ApiLevel::from_numeric("climatisation", 3).unwrap());
        levels.apply(ApiLevel::from_numeric("charger", 2).unwrap());
        levels.apply(ApiLevel::from_numeric("ventilation", 2).unwrap());

        assert_eq!(levels.climatisation, ClimatisationApi::Xml);
        assert_eq!(levels.charger, ChargerApi::JsonV2);
        assert_eq!(levels.ventilation, VentilationApi::Json);
        assert!(ApiLevel::from_numeric("sunroof", 1).is_err());
    }

    #[test]
    fn test_target_temperature_dk() {
        assert_eq!(target_temperature_dk(19.5), 2926);
        assert_eq!(target_temperature_dk(21.0), 2941);
        assert_eq!(target_temperature_dk(16.04), 2891);
    }

    #[test]
    fn test_lock_payload() {
        let payload = lock(true);
        assert_eq!(payload.content_type, CT_LOCK);
        assert!(payload.body.ends_with("<action>lock</action></rluAction>"));
        assert!(lock(false).body.contains("<action>unlock</action>"));
    }

    #[test]
    fn test_climater_payloads() {
        let payload = climater(ClimatisationApi::Json, true, HeaterSource::Auxiliary);
        assert_eq!(payload.content_type, "application/json");
        let body = body_json(&payload);
        assert_eq!(body["action"]["type"], "startClimatisation");
        assert_eq!(body["action"]["settings"]["targetTemperature"], 2940);
        assert_eq!(body["action"]["settings"]["heaterSource"], "auxiliary");

        let body = body_json(&climater(ClimatisationApi::Json, false, HeaterSource::Electric));
        assert_eq!(body, json!({"action": {"type": "stopClimatisation"}}));

        let payload = climater(ClimatisationApi::Xml, true, HeaterSource::Electric);
        assert_eq!(payload.content_type, CT_CLIMATER_XML);
        assert!(payload
            .body
            .contains("<type>startClimatisation</type><settings><heaterSource>electric</heaterSource>"));
    }

    #[test]
    fn test_climater_temp_zones() {
        let seats = SeatZones {
            front_left: true,
            ..Default::default()
        };
        let body = body_json(&climater_temp(
            ClimatisationApi::Json,
            2926,
            HeaterSource::Electric,
            false,
            seats,
        ));
        let element = &body["action"]["settings"]["climaterElementSettings"];
        assert_eq!(element["isMirrorHeatingEnabled"], false);
        assert_eq!(element["zoneSettings"]["zoneSetting"][0]["value"]["isEnabled"], true);
        assert_eq!(element["zoneSettings"]["zoneSetting"][3]["value"]["position"], "rearRight");

        let xml = climater_temp(ClimatisationApi::Xml, 2926, HeaterSource::Electric, true, seats);
        assert!(xml.body.contains("<targetTemperature>2926</targetTemperature>"));
        assert!(xml.body.contains("<climatisationWithoutHVpower>false</climatisationWithoutHVpower>"));
    }

    #[test]
    fn test_heater_payloads() {
        let payload = pre_heating(VentilationApi::Xml, true, 30);
        assert_eq!(payload.content_type, CT_HEATER_XML);
        assert!(payload.body.contains("<quickstart><active>true</active></quickstart>"));

        let body = body_json(&pre_heating(VentilationApi::Json, true, 30));
        assert_eq!(body["performAction"]["quickstart"]["startMode"], "heating");
        assert_eq!(body["performAction"]["quickstart"]["climatisationDuration"], 30);

        let payload = ventilation(VentilationApi::Xml, true, 20);
        assert!(payload.body.contains(
            "<active>true</active><climatisationDuration>20</climatisationDuration><startMode>ventilation</startMode>"
        ));

        let payload = ventilation(VentilationApi::Json, false, 20);
        assert_eq!(payload.content_type, CT_VENTILATION_JSON);
        assert_eq!(
            body_json(&payload),
            json!({"performAction": {"quickstop": {"active": false}}})
        );
    }

    #[test]
    fn test_charger_payloads() {
        let body = body_json(&battery_charger(ChargerApi::JsonV2, true, true));
        assert_eq!(body["action"]["type"], "selectChargingMode");
        assert_eq!(
            body["action"]["settings"]["chargeModeSelection"]["value"],
            "timerBasedCharging"
        );
        assert_eq!(
            body_json(&battery_charger(ChargerApi::JsonV2, false, true)),
            json!({"action": {"type": "stop"}})
        );
        assert_eq!(
            body_json(&battery_charger(ChargerApi::JsonV3, true, false)),
            json!({"action": {"type": "startBatteryCharging"}})
        );

        let xml = battery_charger(ChargerApi::Xml, true, false);
        assert_eq!(xml.content_type, CT_CHARGER_XML);
        assert!(xml.body.ends_with("<action><type>start</type></action>"));

        let body = body_json(&charger_max(ChargerApi::JsonV2, 16));
        assert_eq!(body["action"]["settings"]["maxChargeCurrent"], 16);
        assert!(charger_max(ChargerApi::Xml, 32)
            .body
            .contains("<maxChargeCurrent>32</maxChargeCurrent>"));
    }

    #[test]
    fn test_window_heating_and_honkflash_payloads() {
        assert_eq!(
            body_json(&window_heating(WindowHeatingApi::Json, true)),
            json!({"action": {"type": "startWindowHeating"}})
        );
        let xml = window_heating(WindowHeatingApi::Xml, false);
        assert_eq!(xml.content_type, CT_WINDOW_HEATING_XML);
        assert!(xml.body.contains("<type>stopWindowHeating</type>"));

        let body = body_json(&honkflash(HonkFlashMode::Flash, 15, 48.1, 11.5));
        assert_eq!(body["honkAndFlashRequest"]["serviceOperationCode"], "FLASH_ONLY");
        assert_eq!(body["honkAndFlashRequest"]["userPosition"]["latitude"], 48.1);
    }
}
