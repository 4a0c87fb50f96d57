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


//! `climatisation` and `climatisationTimers` jobs of the selective status

use crate::model::path::{not_off, unwrap_value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Climatisation {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub window_heating_status: Option<WindowHeatingStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub climatisation_status: Option<ClimatisationStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub climatisation_settings: Option<ClimatisationSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowHeatingStatus {
    #[serde(default)]
    pub window_heating_status: Vec<WindowHeating>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowHeating {
    pub window_location: String,
    pub window_heating_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimatisationStatus {
    #[serde(default, rename = "remainingClimatisationTime_min")]
    pub remaining_climatisation_time_min: Option<i64>,
    /// `true` unless the backend reports `off`
    #[serde(default, deserialize_with = "not_off")]
    pub climatisation_state: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimatisationSettings {
    #[serde(default, rename = "targetTemperature_C")]
    pub target_temperature_c: Option<f64>,
    #[serde(default, rename = "targetTemperature_F")]
    pub target_temperature_f: Option<f64>,
    #[serde(default)]
    pub unit_in_car: Option<String>,
    #[serde(default)]
    pub climatization_at_unlock: Option<bool>,
    #[serde(default)]
    pub window_heating_enabled: Option<bool>,
    #[serde(default)]
    pub zone_front_left_enabled: Option<bool>,
    #[serde(default)]
    pub zone_front_right_enabled: Option<bool>,
    #[serde(default)]
    pub zone_rear_left_enabled: Option<bool>,
    #[serde(default)]
    pub zone_rear_right_enabled: Option<bool>,
}

// ============================================================================
// Timers
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimatisationTimers {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub climatisation_timers_status: Option<ClimatisationTimersStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimatisationTimersStatus {
    #[serde(default)]
    pub time_in_car: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timers: Vec<Timer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: i64,
    pub enabled: bool,
    #[serde(default)]
    pub single_timer: Option<SingleTimer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleTimer {
    #[serde(rename = "startDateTime")]
    pub start: DateTime<Utc>,
    #[serde(rename = "targetDateTime")]
    pub target: DateTime<Utc>,
}
