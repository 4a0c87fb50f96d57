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


//! Legacy MBB service documents
//!
//! Older vehicles report through the `bs/*` services of their home region:
//!
//! | Document | Shape |
//! |---|---|
//! | stored vehicle data (`bs/vsr`) | `field[]` entries with hex ids and string values |
//! | charger (`bs/batterycharge`) | values wrapped in `{"content": …}` |
//! | climater (`bs/climatisation`) | values wrapped in `{"content": …}` |
//! | pre-heater (`bs/rs`) | `statusResponse.climatisationStateReport` |
//!
//! The string sentinels of stored data become booleans: lock states are
//! locked at `"2"`, open states and windows are closed at `"3"`, tyre
//! pressure differences are fine at `"1"`.

use crate::config::UnitSystem;
use crate::error::{ConnectError, Result};
use crate::model::path::{get_f64, get_i64, get_path, get_string};
use crate::model::units::Distance;
use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Remaining charging time while not charging
const UNKNOWN_CHARGING_TIME: i64 = 65535;

lazy_static! {
    static ref FIELD_NAMES: HashMap<&'static str, &'static str> = [
        ("0x0101010001", "utc_time"),
        ("0x0101010002", "utc_time_and_kilometer_status"),
        ("0x0202", "active_instrument_cluster_warning"),
        ("0x0203010001", "maintenance_interval_distance_to_oil_change"),
        ("0x0203010002", "maintenance_interval_time_to_oil_change"),
        ("0x0203010003", "maintenance_interval_distance_to_inspection"),
        ("0x0203010004", "maintenance_interval_time_to_inspection"),
        ("0x0203010005", "warning_oil_change"),
        ("0x0203010006", "maintenance_interval_alarm_inspection"),
        ("0x0203010007", "maintenance_interval_monthly_mileage"),
        ("0x0204040001", "oil_level_amount_in_liters"),
        ("0x0204040002", "oil_level_minimum_warning"),
        ("0x0204040003", "oil_level_dipsticks_percentage"),
        ("0x0204040004", "oil_display"),
        ("0x0204040005", "oil_level_valid"),
        ("0x0204040006", "oil_level_percentage"),
        ("0x02040C0001", "adblue_range"),
        ("0x02040C0002", "src_no_driveability"),
        ("0x0301010001", "light_status"),
        ("0x0301020001", "temperature_outside"),
        ("0x0301030001", "braking_status"),
        ("0x0301030002", "state_of_charge"),
        ("0x0301030003", "bem_ok"),
        ("0x0301030005", "total_range"),
        ("0x0301030006", "primary_range"),
        ("0x0301030007", "primary_drive"),
        ("0x0301030008", "secondary_range"),
        ("0x0301030009", "secondary_drive"),
        ("0x030103000A", "tank_level_in_percentage"),
        ("0x030103000D", "tank_level_error"),
        ("0x0301040001", "lock_state_left_front_door"),
        ("0x0301040002", "open_state_left_front_door"),
        ("0x0301040003", "safety_state_left_front_door"),
        ("0x0301040004", "lock_state_left_rear_door"),
        ("0x0301040005", "open_state_left_rear_door"),
        ("0x0301040006", "safety_state_left_rear_door"),
        ("0x0301040007", "lock_state_right_front_door"),
        ("0x0301040008", "open_state_right_front_door"),
        ("0x0301040009", "safety_state_right_front_door"),
        ("0x030104000A", "lock_state_right_rear_door"),
        ("0x030104000B", "open_state_right_rear_door"),
        ("0x030104000C", "safety_state_right_rear_door"),
        ("0x030104000D", "lock_state_trunk_lid"),
        ("0x030104000E", "open_state_trunk_lid"),
        ("0x030104000F", "safety_state_trunk_lid"),
        ("0x0301040010", "lock_state_hood"),
        ("0x0301040011", "open_state_hood"),
        ("0x0301040012", "safety_state_hood"),
        ("0x0301050001", "state_left_front_window"),
        ("0x0301050002", "position_left_front_window"),
        ("0x0301050003", "state_left_rear_window"),
        ("0x0301050004", "position_left_rear_window"),
        ("0x0301050005", "state_right_front_window"),
        ("0x0301050006", "position_right_front_window"),
        ("0x0301050007", "state_right_rear_window"),
        ("0x0301050008", "position_right_rear_window"),
        ("0x0301050009", "state_deck"),
        ("0x030105000A", "position_deck"),
        ("0x030105000B", "state_sun_roof_motor_cover"),
        ("0x030105000C", "position_sun_roof_motor_cover"),
        ("0x030105000D", "state_sun_roof_rear_motor_cover_3"),
        ("0x030105000E", "position_sun_roof_rear_motor_cover_3"),
        ("0x030105000F", "state_service_flap"),
        ("0x0301050011", "state_spoiler"),
        ("0x0301050012", "position_spoiler"),
        ("0x0301060001", "tyre_pressure_left_front_current_value"),
        ("0x0301060002", "tyre_pressure_left_front_desired_value"),
        ("0x0301060003", "tyre_pressure_left_rear_current_value"),
        ("0x0301060004", "tyre_pressure_left_rear_desired_value"),
        ("0x0301060005", "tyre_pressure_right_front_current_value"),
        ("0x0301060006", "tyre_pressure_right_front_desired_value"),
        ("0x0301060007", "tyre_pressure_right_rear_current_value"),
        ("0x0301060008", "tyre_pressure_right_rear_desired_value"),
        ("0x0301060009", "tyre_pressure_spare_tyre_current_value"),
        ("0x030106000A", "tyre_pressure_spare_tyre_desired_value"),
        ("0x030106000B", "tyre_pressure_left_front_tyre_difference"),
        ("0x030106000C", "tyre_pressure_left_rear_tyre_difference"),
        ("0x030106000D", "tyre_pressure_right_front_tyre_difference"),
        ("0x030106000E", "tyre_pressure_right_rear_tyre_difference"),
        ("0x030106000F", "tyre_pressure_spare_tyre_difference"),
    ]
    .into_iter()
    .collect();
}

const DOOR_LOCKS: [&str; 4] = [
    "lock_state_left_front_door",
    "lock_state_left_rear_door",
    "lock_state_right_front_door",
    "lock_state_right_rear_door",
];

const DOOR_OPENINGS: [&str; 6] = [
    "open_state_left_front_door",
    "open_state_left_rear_door",
    "open_state_right_front_door",
    "open_state_right_rear_door",
    "open_state_trunk_lid",
    "open_state_hood",
];

const WINDOWS: [&str; 4] = [
    "state_left_front_window",
    "state_left_rear_window",
    "state_right_front_window",
    "state_right_rear_window",
];

const TYRE_DIFFERENCES: [&str; 5] = [
    "tyre_pressure_left_front_tyre_difference",
    "tyre_pressure_left_rear_tyre_difference",
    "tyre_pressure_right_front_tyre_difference",
    "tyre_pressure_right_rear_tyre_difference",
    "tyre_pressure_spare_tyre_difference",
];

// ============================================================================
// Stored vehicle data
// ============================================================================

/// Evaluated value of one stored-data field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Integer(i64),
    Number(f64),
    Distance(Distance),
    Text(String),
}

#[derive(Debug, Clone, Copy)]
enum Evaluation {
    Integer,
    AbsInteger,
    Number,
    Kilometers,
    AbsKilometers,
    Is(&'static str),
    IsNot(&'static str),
}

fn evaluation(name: &str) -> Option<Evaluation> {
    use Evaluation::*;

    let eval = match name {
        "utc_time_and_kilometer_status" | "total_range" => Kilometers,
        "maintenance_interval_distance_to_oil_change"
        | "maintenance_interval_distance_to_inspection" => AbsKilometers,
        "maintenance_interval_time_to_oil_change" | "maintenance_interval_time_to_inspection" => {
            AbsInteger
        }
        "warning_oil_change" | "oil_display" => Is("1"),
        "oil_level_dipsticks_percentage" => Number,
        "adblue_range" | "bem_ok" | "tank_level_in_percentage" => Integer,
        "light_status" | "braking_status" => IsNot("2"),
        "state_sun_roof_motor_cover" => Is("2"),
        n if n.starts_with("lock_state_") => IsNot("2"),
        n if n.starts_with("open_state_") => IsNot("3"),
        n if n.starts_with("state_") && n.ends_with("_window") => IsNot("3"),
        n if n.ends_with("_tyre_difference") => IsNot("1"),
        _ => return None,
    };
    Some(eval)
}

fn evaluate(name: &str, raw: &str, units: UnitSystem) -> FieldValue {
    let Some(eval) = evaluation(name) else {
        return FieldValue::Text(raw.to_string());
    };
    if raw.is_empty() {
        return FieldValue::Text(String::new());
    }

    let int = || raw.trim().parse::<i64>().ok();
    let value = match eval {
        Evaluation::Is(expected) => Some(FieldValue::Flag(raw == expected)),
        Evaluation::IsNot(expected) => Some(FieldValue::Flag(raw != expected)),
        Evaluation::Integer => int().map(FieldValue::Integer),
        Evaluation::AbsInteger => int().map(|v| FieldValue::Integer(v.abs())),
        Evaluation::Number => raw.trim().parse::<f64>().ok().map(FieldValue::Number),
        Evaluation::Kilometers => int().map(|v| FieldValue::Distance(Distance::from_km(v as f64, units))),
        Evaluation::AbsKilometers => {
            int().map(|v| FieldValue::Distance(Distance::from_km(v.abs() as f64, units)))
        }
    };

    value.unwrap_or_else(|| {
        tracing::warn!(field = name, value = raw, "cannot evaluate stored data field");
        FieldValue::Text(raw.to_string())
    })
}

/// Fields of the stored vehicle data, by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoredData {
    pub fields: BTreeMap<String, FieldValue>,
    /// Any tyre pressure difference reported; only when all five are known
    pub any_tyre_problem: Option<bool>,
    pub any_door_unlocked: Option<bool>,
    /// Doors, trunk lid and hood
    pub any_door_open: Option<bool>,
    pub any_window_open: Option<bool>,
}

impl StoredData {
    /// Read a `StoredVehicleDataResponse`
    pub fn from_response(body: &Value, units: UnitSystem) -> Result<Self> {
        let blocks = get_path(body, "StoredVehicleDataResponse.vehicleData.data")
            .ok_or_else(|| ConnectError::invalid_response("Stored vehicle data missing", None))?;

        let mut data = StoredData::default();
        for block in as_list(blocks) {
            let Some(fields) = block.get("field") else { continue };
            for field in as_list(fields) {
                let Some(id) = field.get("id").and_then(Value::as_str) else { continue };
                let Some(name) = FIELD_NAMES.get(id) else {
                    tracing::debug!(id, "unknown stored data field");
                    continue;
                };
                let raw = get_string(field, "value").unwrap_or_default();
                data.fields.insert(name.to_string(), evaluate(name, &raw, units));
            }
        }

        data.any_tyre_problem = data.all_flags(&TYRE_DIFFERENCES).map(|f| f.iter().any(|&p| p));
        data.any_door_unlocked = data.any_flag(&DOOR_LOCKS);
        data.any_door_open = data.any_flag(&DOOR_OPENINGS);
        data.any_window_open = data.any_flag(&WINDOWS);
        Ok(data)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            FieldValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    fn any_flag(&self, names: &[&str]) -> Option<bool> {
        let flags: Vec<bool> = names.iter().filter_map(|n| self.flag(n)).collect();
        (!flags.is_empty()).then(|| flags.iter().any(|&f| f))
    }

    fn all_flags(&self, names: &[&str]) -> Option<Vec<bool>> {
        names.iter().map(|n| self.flag(n)).collect()
    }
}

/// The backend sends a bare object where a list has one entry
fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

// ============================================================================
// Charger
// ============================================================================

/// `bs/batterycharge/v1/.../charger`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChargerState {
    /// Amperes
    pub max_charge_current: Option<f64>,
    pub charging_state: Option<String>,
    pub actual_charge_rate: Option<f64>,
    /// `km/h` style unit label
    pub actual_charge_rate_unit: Option<String>,
    pub charging_power_kw: Option<f64>,
    pub charging_mode: Option<String>,
    pub energy_flow: Option<String>,
    pub primary_engine_type: Option<String>,
    pub secondary_engine_type: Option<String>,
    pub hybrid_range: Option<Distance>,
    pub primary_engine_range: Option<Distance>,
    pub secondary_engine_range: Option<Distance>,
    pub plug_state: Option<String>,
    pub plug_lock: Option<String>,
    pub led_color: Option<String>,
    pub led_state: Option<String>,
    pub state_of_charge: Option<i64>,
    /// Minutes; `None` while the vehicle does not estimate one
    pub remaining_charging_time_min: Option<i64>,
}

impl ChargerState {
    /// `None` when the document carries neither settings nor status
    pub fn from_response(body: &Value, units: UnitSystem) -> Option<Self> {
        let settings = get_path(body, "charger.settings");
        let status = get_path(body, "charger.status");
        if settings.is_none() && status.is_none() {
            return None;
        }

        let empty = Value::Null;
        let settings = settings.unwrap_or(&empty);
        let status = status.unwrap_or(&empty);
        let km = |path: &str| get_f64(status, path).map(|v| Distance::from_km(v, units));

        Some(Self {
            max_charge_current: get_f64(settings, "maxChargeCurrent.content"),
            charging_state: get_string(status, "chargingStatusData.chargingState.content"),
            actual_charge_rate: get_f64(status, "chargingStatusData.actualChargeRate.content")
                .map(|v| v / 10.0),
            actual_charge_rate_unit: get_string(status, "chargingStatusData.chargeRateUnit.content")
                .map(|u| u.replace("_per_", "/")),
            charging_power_kw: get_f64(status, "chargingStatusData.chargingPower.content")
                .map(|w| w / 1000.0),
            charging_mode: get_string(status, "chargingStatusData.chargingMode.content"),
            energy_flow: get_string(status, "chargingStatusData.energyFlow.content"),
            primary_engine_type: get_string(status, "cruisingRangeStatusData.engineTypeFirstEngine.content"),
            secondary_engine_type: get_string(status, "cruisingRangeStatusData.engineTypeSecondEngine.content"),
            hybrid_range: km("cruisingRangeStatusData.hybridRange.content"),
            primary_engine_range: km("cruisingRangeStatusData.primaryEngineRange.content"),
            secondary_engine_range: km("cruisingRangeStatusData.secondaryEngineRange.content"),
            plug_state: get_string(status, "plugStatusData.plugState.content"),
            plug_lock: get_string(status, "plugStatusData.lockState.content"),
            led_color: get_string(status, "ledStatusData.ledColor.content"),
            led_state: get_string(status, "ledStatusData.ledState.content"),
            state_of_charge: get_i64(status, "batteryStatusData.stateOfCharge.content"),
            remaining_charging_time_min: get_i64(status, "batteryStatusData.remainingChargingTime.content")
                .filter(|&minutes| minutes != UNKNOWN_CHARGING_TIME),
        })
    }
}

// ============================================================================
// Climater
// ============================================================================

/// `bs/climatisation/v1/.../climater`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClimaterState {
    pub heater_source: Option<String>,
    /// Deci-Kelvin as configured in the vehicle
    pub target_temperature_dk: Option<i64>,
    pub climatisation_state: Option<String>,
    pub remaining_climatisation_time_min: Option<i64>,
    pub outdoor_temperature_c: Option<f64>,
}

impl ClimaterState {
    pub fn from_response(body: &Value) -> Option<Self> {
        let settings = get_path(body, "climater.settings");
        let status = get_path(body, "climater.status");
        if settings.is_none() && status.is_none() {
            return None;
        }

        let empty = Value::Null;
        let settings = settings.unwrap_or(&empty);
        let status = status.unwrap_or(&empty);

        Some(Self {
            heater_source: get_string(settings, "heaterSource.content"),
            target_temperature_dk: get_i64(settings, "targetTemperature.content"),
            climatisation_state: get_string(status, "climatisationStatusData.climatisationState.content"),
            remaining_climatisation_time_min: get_i64(
                status,
                "climatisationStatusData.remainingClimatisationTime.content",
            ),
            outdoor_temperature_c: get_f64(status, "temperatureStatusData.outdoorTemperature.content")
                .map(decikelvin_to_celsius),
        })
    }
}

/// `round(dK / 10 - 273, 1)`
pub fn decikelvin_to_celsius(dk: f64) -> f64 {
    ((dk / 10.0 - 273.0) * 10.0).round() / 10.0
}

// ============================================================================
// Pre-heater
// ============================================================================

/// `bs/rs/v1/.../status` → `statusResponse.climatisationStateReport`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreheaterState {
    /// `true` unless the heater reports `off`
    pub active: Option<bool>,
    pub duration_min: Option<i64>,
    pub remaining_min: Option<i64>,
}

impl PreheaterState {
    pub fn from_response(body: &Value) -> Option<Self> {
        let report = get_path(body, "statusResponse.climatisationStateReport")?;

        Some(Self {
            active: get_string(report, "climatisationState").map(|s| s != "off"),
            duration_min: get_i64(report, "climatisationDuration"),
            remaining_min: get_i64(report, "remainingClimateTime"),
        })
    }
}
