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


//! `charging` job of the selective status

use crate::config::UnitSystem;
use crate::model::path::{is_charging, is_connected, is_locked, not_off, unwrap_value};
use crate::model::units::{Distance, Normalize};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charging {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub battery_status: Option<BatteryStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub charging_status: Option<ChargingStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub charging_settings: Option<ChargingSettings>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub plug_status: Option<PlugStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub charge_mode: Option<ChargeMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    #[serde(default, rename = "currentSOC_pct")]
    pub current_soc_pct: Option<i64>,
    #[serde(default, rename = "cruisingRangeElectric_km")]
    pub cruising_range_electric: Option<Distance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStatus {
    /// Minutes until the target state of charge
    #[serde(default, rename = "remainingChargingTimeToComplete_min")]
    pub remaining_min: Option<i64>,
    /// `true` while charging
    #[serde(default, deserialize_with = "is_charging")]
    pub charging_state: Option<bool>,
    #[serde(default)]
    pub charge_mode: Option<String>,
    #[serde(default, rename = "chargePower_kW")]
    pub charge_power_kw: Option<f64>,
    #[serde(default, rename = "chargeRate_kmph")]
    pub charge_rate_kmph: Option<f64>,
    #[serde(default)]
    pub charge_type: Option<String>,
    #[serde(default)]
    pub charging_settings: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSettings {
    /// `maximum`, `reduced`, or an ampere value as text
    #[serde(default, rename = "maxChargeCurrentAC")]
    pub max_charge_current_ac: Option<String>,
    #[serde(default, deserialize_with = "not_off")]
    pub auto_unlock_plug_when_charged: Option<bool>,
    #[serde(default, rename = "autoUnlockPlugWhenChargedAC", deserialize_with = "not_off")]
    pub auto_unlock_plug_when_charged_ac: Option<bool>,
    #[serde(default, rename = "targetSOC_pct")]
    pub target_soc_pct: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlugStatus {
    /// `true` when a cable is connected
    #[serde(default, deserialize_with = "is_connected")]
    pub plug_connection_state: Option<bool>,
    /// `true` when the plug is locked
    #[serde(default, deserialize_with = "is_locked")]
    pub plug_lock_state: Option<bool>,
    #[serde(default)]
    pub external_power: Option<String>,
    #[serde(default)]
    pub led_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeMode {
    #[serde(default)]
    pub preferred_charge_mode: Option<String>,
    #[serde(default)]
    pub available_charge_modes: Vec<String>,
}

impl Normalize for Charging {
    fn normalize(&mut self, units: UnitSystem) {
        if let Some(battery) = self.battery_status.as_mut() {
            battery.cruising_range_electric.normalize(units);
        }
    }
}
