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


//! Selective status of the connected-vehicle service
//!
//! `GET {cv_url}/vehicles/{vin}/selectivestatus?jobs=a,b,c` answers with one
//! object per job. Each job holds named groups and every group wraps its
//! payload in `{"value": …}`:
//!
//! ```json
//! {"measurements": {"odometerStatus": {"value": {"odometer": 12345}}}}
//! ```
//!
//! Known jobs decode into typed structs. Jobs this crate has no struct for
//! are kept in [`SelectiveStatus::extra`] as flattened snake_case keys
//! (`departure_timers.departure_timers_status.min_soc_pct`).

use crate::config::UnitSystem;
use crate::error::Result;
use crate::model::access::{AccessStatus, LightsStatus};
use crate::model::charging::Charging;
use crate::model::climatisation::{Climatisation, ClimatisationTimers};
use crate::model::path::{flatten_into, strip_values, unwrap_value};
use crate::model::units::{Distance, Normalize};
use chrono::{DateTime, Utc};
use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Jobs decoded into typed fields
const TYPED_JOBS: [&str; 11] = [
    "userCapabilities",
    "access",
    "charging",
    "climatisationTimers",
    "climatisation",
    "fuelStatus",
    "vehicleHealthInspection",
    "vehicleLights",
    "measurements",
    "oilLevel",
    "vehicleHealthWarnings",
];

/// Decoded selective status of one vehicle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectiveStatus {
    #[serde(default)]
    pub user_capabilities: Option<UserCapabilities>,
    #[serde(default)]
    pub access: Option<Access>,
    #[serde(default)]
    pub charging: Option<Charging>,
    #[serde(default)]
    pub climatisation_timers: Option<ClimatisationTimers>,
    #[serde(default)]
    pub climatisation: Option<Climatisation>,
    #[serde(default)]
    pub fuel_status: Option<FuelStatus>,
    #[serde(default)]
    pub vehicle_health_inspection: Option<VehicleHealthInspection>,
    #[serde(default)]
    pub vehicle_lights: Option<VehicleLights>,
    #[serde(default)]
    pub measurements: Option<Measurements>,
    #[serde(default)]
    pub oil_level: Option<OilLevel>,
    #[serde(default)]
    pub vehicle_health_warnings: Option<VehicleHealthWarnings>,
    /// Jobs without a typed struct, flattened
    #[serde(default, skip_deserializing)]
    pub extra: BTreeMap<String, Value>,
}

impl SelectiveStatus {
    /// Decode a selectivestatus response and convert distances to `units`
    pub fn from_value(body: Value, units: UnitSystem) -> Result<Self> {
        let mut status: SelectiveStatus = serde_json::from_value(body.clone())?;

        if let Value::Object(jobs) = body {
            for (job, groups) in jobs {
                if TYPED_JOBS.contains(&job.as_str()) {
                    continue;
                }
                flatten_into(&job.to_snake_case(), &strip_values(groups), &mut status.extra);
            }
        }

        status.normalize(units);
        Ok(status)
    }

    /// Time the vehicle captured its access state
    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        self.access
            .as_ref()?
            .access_status
            .as_ref()?
            .car_captured_timestamp
    }

    /// Ids of the capabilities the user may use
    pub fn capability_ids(&self) -> Vec<String> {
        self.user_capabilities
            .as_ref()
            .and_then(|caps| caps.capabilities_status.as_ref())
            .map(|caps| caps.iter().map(|c| c.id.clone()).collect())
            .unwrap_or_default()
    }
}

impl Normalize for SelectiveStatus {
    fn normalize(&mut self, units: UnitSystem) {
        self.charging.normalize(units);
        self.fuel_status.normalize(units);
        self.vehicle_health_inspection.normalize(units);
        self.measurements.normalize(units);
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// A vehicle capability; fields beyond `id` vary per service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCapabilities {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub capabilities_status: Option<Vec<Capability>>,
}

// ============================================================================
// Access and lights
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub access_status: Option<AccessStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLights {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub lights_status: Option<LightsStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleHealthWarnings {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub warning_lights: Option<LightsStatus>,
}

// ============================================================================
// Fuel and range
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelStatus {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub range_status: Option<FuelRangeStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelRangeStatus {
    #[serde(default)]
    pub car_type: Option<String>,
    #[serde(default)]
    pub primary_engine: Option<Engine>,
    #[serde(default)]
    pub secondary_engine: Option<Engine>,
    #[serde(default, rename = "totalRange_km")]
    pub total_range: Option<Distance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Engine {
    #[serde(default, rename = "type")]
    pub engine_type: Option<String>,
    #[serde(default, rename = "currentSOC_pct")]
    pub current_soc_pct: Option<f64>,
    #[serde(default, rename = "remainingRange_km")]
    pub remaining_range: Option<Distance>,
    #[serde(default, rename = "currentFuelLevel_pct")]
    pub current_fuel_level_pct: Option<f64>,
}

impl Normalize for FuelStatus {
    fn normalize(&mut self, units: UnitSystem) {
        if let Some(range) = self.range_status.as_mut() {
            range.total_range.normalize(units);
            for engine in [&mut range.primary_engine, &mut range.secondary_engine] {
                if let Some(engine) = engine.as_mut() {
                    engine.remaining_range.normalize(units);
                }
            }
        }
    }
}

// ============================================================================
// Maintenance
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OilLevel {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub oil_level_status: Option<OilLevelStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OilLevelStatus {
    #[serde(default)]
    pub value: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleHealthInspection {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub maintenance_status: Option<MaintenanceStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceStatus {
    #[serde(default, rename = "inspectionDue_days")]
    pub inspection_due_days: Option<i64>,
    #[serde(default, rename = "inspectionDue_km")]
    pub inspection_due: Option<Distance>,
    #[serde(default, rename = "mileage_km")]
    pub mileage: Option<Distance>,
    #[serde(default, rename = "oilServiceDue_days")]
    pub oil_service_due_days: Option<i64>,
    #[serde(default, rename = "oilServiceDue_km")]
    pub oil_service_due: Option<Distance>,
}

impl Normalize for VehicleHealthInspection {
    fn normalize(&mut self, units: UnitSystem) {
        if let Some(status) = self.maintenance_status.as_mut() {
            status.inspection_due.normalize(units);
            status.mileage.normalize(units);
            status.oil_service_due.normalize(units);
        }
    }
}

// ============================================================================
// Measurements
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    #[serde(default, deserialize_with = "unwrap_value")]
    pub range_status: Option<RangeStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub odometer_status: Option<OdometerStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub fuel_level_status: Option<FuelLevelStatus>,
    #[serde(default, deserialize_with = "unwrap_value")]
    pub temperature_battery_status: Option<TemperatureBatteryStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStatus {
    #[serde(default)]
    pub electric_range: Option<Distance>,
    #[serde(default)]
    pub gasoline_range: Option<Distance>,
    #[serde(default, rename = "totalRange_km")]
    pub total_range: Option<Distance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdometerStatus {
    #[serde(default)]
    pub odometer: Option<Distance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelLevelStatus {
    #[serde(default, rename = "currentSOC_pct")]
    pub current_soc_pct: Option<f64>,
    #[serde(default, rename = "currentFuelLevel_pct")]
    pub current_fuel_level_pct: Option<f64>,
    #[serde(default)]
    pub primary_engine_type: Option<String>,
    #[serde(default)]
    pub secondary_engine_type: Option<String>,
    #[serde(default)]
    pub car_type: Option<String>,
}

/// High-voltage battery temperatures in Kelvin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBatteryStatus {
    #[serde(default, rename = "temperatureHvBatteryMax_K")]
    pub max_k: Option<f64>,
    #[serde(default, rename = "temperatureHvBatteryMin_K")]
    pub min_k: Option<f64>,
}

impl Normalize for Measurements {
    fn normalize(&mut self, units: UnitSystem) {
        if let Some(range) = self.range_status.as_mut() {
            range.electric_range.normalize(units);
            range.gasoline_range.normalize(units);
            range.total_range.normalize(units);
        }
        if let Some(odometer) = self.odometer_status.as_mut() {
            odometer.odometer.normalize(units);
        }
    }
}
