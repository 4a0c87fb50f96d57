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


//! GraphQL vehicle list (`userVehicles`)

use serde::{Deserialize, Serialize};

/// Query sent to the vehicle GraphQL service
pub const USER_VEHICLES_QUERY: &str = "query vehicleList {
    userVehicles {
        vin
        mappingVin
        vehicle { core { modelYear } media { shortName longName } classification { driveTrain } }
        csid
        commissionNumber
        type
        devicePlatform
        mbbConnect
        userRole { role }
        vehicle { classification { driveTrain } }
        nickname
    }
}";

/// `data` member of the GraphQL response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVehiclesData {
    #[serde(default)]
    pub user_vehicles: Vec<VehicleInfo>,
}

/// One vehicle of the account as listed by the GraphQL service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    pub vin: String,
    #[serde(default)]
    pub mapping_vin: Option<String>,
    #[serde(default)]
    pub csid: Option<String>,
    #[serde(default)]
    pub commission_number: Option<String>,
    #[serde(default, rename = "type")]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub device_platform: Option<String>,
    #[serde(default)]
    pub mbb_connect: Option<bool>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub user_role: Option<UserRole>,
    #[serde(default)]
    pub vehicle: Option<VehicleDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDetails {
    #[serde(default)]
    pub core: Option<VehicleCore>,
    #[serde(default)]
    pub media: Option<VehicleMedia>,
    #[serde(default)]
    pub classification: Option<VehicleClassification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCore {
    #[serde(default)]
    pub model_year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMedia {
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleClassification {
    #[serde(default)]
    pub drive_train: Option<String>,
}

impl VehicleInfo {
    pub fn model_year(&self) -> Option<i32> {
        self.vehicle.as_ref()?.core.as_ref()?.model_year
    }

    pub fn short_name(&self) -> Option<&str> {
        self.vehicle.as_ref()?.media.as_ref()?.short_name.as_deref()
    }

    pub fn long_name(&self) -> Option<&str> {
        self.vehicle.as_ref()?.media.as_ref()?.long_name.as_deref()
    }

    pub fn drive_train(&self) -> Option<&str> {
        self.vehicle.as_ref()?.classification.as_ref()?.drive_train.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.user_role.as_ref()?.role.as_deref()
    }

    /// Nickname, else the long model name, else the VIN
    pub fn title(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.long_name())
            .unwrap_or(&self.vin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_user_vehicles() {
        let data: UserVehiclesData = serde_json::from_value(json!({
            "userVehicles": [{
                "vin": "WAUZZZGE1NB000001",
                "mappingVin": null,
                "vehicle": {
                    "core": {"modelYear": 2022},
                    "media": {"shortName": "e-tron GT", "longName": "Audi e-tron GT quattro"},
                    "classification": {"driveTrain": "BEV"}
                },
                "csid": "ABC123",
                "commissionNumber": "XX1234",
                "type": "Car",
                "devicePlatform": "E3",
                "mbbConnect": false,
                "userRole": {"role": "PRIMARY_USER"},
                "nickname": ""
            }]
        }))
        .unwrap();

        let info = &data.user_vehicles[0];
        assert_eq!(info.model_year(), Some(2022));
        assert_eq!(info.short_name(), Some("e-tron GT"));
        assert_eq!(info.drive_train(), Some("BEV"));
        assert_eq!(info.role(), Some("PRIMARY_USER"));
        assert_eq!(info.vehicle_type.as_deref(), Some("Car"));
        assert_eq!(info.mbb_connect, Some(false));
        assert_eq!(info.title(), "Audi e-tron GT quattro");
    }

    #[test]
    fn test_sparse_vehicle() {
        let info: VehicleInfo = serde_json::from_value(json!({"vin": "WAUZZZ"})).unwrap();
        assert_eq!(info.model_year(), None);
        assert_eq!(info.title(), "WAUZZZ");
    }
}
