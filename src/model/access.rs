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


//! Doors, windows and lights
//!
//! The backend lists every opening as `{"name": "frontLeft", "status":
//! ["locked", "closed"]}`. A door is unlocked when `locked` is missing from
//! its status and open when `closed` is missing. Roof cover and sun roof
//! report `unsupported` on vehicles without them and are left out then.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// One entry of a name/status list
#[derive(Debug, Clone, Deserialize)]
pub struct NamedStatus {
    pub name: String,
    #[serde(default, deserialize_with = "status_list")]
    pub status: Vec<String>,
}

/// `status` is a list on doors and windows and a plain string on lights
fn status_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Single(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::List(list)) => list,
        Some(Raw::Single(single)) => vec![single],
        None => Vec::new(),
    })
}

struct StatusMap<'a>(HashMap<&'a str, &'a [String]>);

impl<'a> StatusMap<'a> {
    fn new(entries: &'a [NamedStatus]) -> Self {
        Self(
            entries
                .iter()
                .map(|e| (e.name.as_str(), e.status.as_slice()))
                .collect(),
        )
    }

    fn lacks(&self, name: &str, state: &str) -> bool {
        !self
            .0
            .get(name)
            .map(|status| status.iter().any(|s| s == state))
            .unwrap_or(false)
    }

    fn has(&self, name: &str, state: &str) -> bool {
        !self.lacks(name, state)
    }
}

// ============================================================================
// Doors
// ============================================================================

/// Unlocked state per door; `true` means unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DoorLocked {
    pub left_front: bool,
    pub right_front: bool,
    pub left_rear: bool,
    pub right_rear: bool,
    pub trunk: bool,
    /// Any door unlocked and the trunk unlocked
    pub doors_trunk: bool,
    /// Any of the four doors unlocked
    pub any_doors_status: bool,
}

/// Open state per door; `true` means open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DoorOpened {
    pub left_front: bool,
    pub right_front: bool,
    pub left_rear: bool,
    pub right_rear: bool,
    pub trunk: bool,
    pub bonnet: bool,
    /// Any door, the trunk or the bonnet open
    pub any_doors_status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Doors {
    pub locked: DoorLocked,
    pub opened: DoorOpened,
}

impl Doors {
    pub fn from_status(entries: &[NamedStatus]) -> Self {
        let status = StatusMap::new(entries);
        let unlocked = |name| status.lacks(name, "locked");
        let open = |name| status.lacks(name, "closed");

        let mut locked = DoorLocked {
            left_front: unlocked("frontLeft"),
            right_front: unlocked("frontRight"),
            left_rear: unlocked("rearLeft"),
            right_rear: unlocked("rearRight"),
            trunk: unlocked("trunk"),
            ..Default::default()
        };
        locked.any_doors_status =
            locked.left_front || locked.right_front || locked.left_rear || locked.right_rear;
        locked.doors_trunk = locked.any_doors_status && locked.trunk;

        let mut opened = DoorOpened {
            left_front: open("frontLeft"),
            right_front: open("frontRight"),
            left_rear: open("rearLeft"),
            right_rear: open("rearRight"),
            trunk: open("trunk"),
            bonnet: open("bonnet"),
            ..Default::default()
        };
        opened.any_doors_status = opened.left_front
            || opened.right_front
            || opened.left_rear
            || opened.right_rear
            || opened.trunk
            || opened.bonnet;

        Self { locked, opened }
    }
}

// ============================================================================
// Windows
// ============================================================================

/// Open state per window; `true` means open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Windows {
    pub left_front: bool,
    pub right_front: bool,
    pub left_rear: bool,
    pub right_rear: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roof_cover: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sun_roof: Option<bool>,
    pub any_windows_status: bool,
}

impl Windows {
    pub fn from_status(entries: &[NamedStatus]) -> Self {
        let status = StatusMap::new(entries);
        let open = |name| status.lacks(name, "closed");
        let optional = |name| (!status.has(name, "unsupported")).then(|| open(name));

        let mut windows = Self {
            left_front: open("frontLeft"),
            right_front: open("frontRight"),
            left_rear: open("rearLeft"),
            right_rear: open("rearRight"),
            roof_cover: optional("roofCover"),
            sun_roof: optional("sunRoof"),
            any_windows_status: false,
        };
        windows.any_windows_status = windows.left_front
            || windows.right_front
            || windows.left_rear
            || windows.right_rear
            || windows.roof_cover.unwrap_or(false)
            || windows.sun_roof.unwrap_or(false);
        windows
    }
}

// ============================================================================
// Lights
// ============================================================================

/// `true` unless the light reports `off`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lights {
    pub left: bool,
    pub right: bool,
}

impl Lights {
    pub fn from_status(entries: &[NamedStatus]) -> Self {
        let status = StatusMap::new(entries);
        Self {
            left: status.lacks("left", "off"),
            right: status.lacks("right", "off"),
        }
    }
}

/// `vehicleLights.lightsStatus` and `vehicleHealthWarnings.warningLights`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightsStatus {
    #[serde(default, deserialize_with = "lights_from_list")]
    pub lights: Lights,
}

fn lights_from_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Lights, D::Error> {
    let entries = Vec::<NamedStatus>::deserialize(deserializer)?;
    Ok(Lights::from_status(&entries))
}

// ============================================================================
// Access status
// ============================================================================

/// `access.accessStatus`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAccessStatus")]
pub struct AccessStatus {
    pub car_captured_timestamp: Option<DateTime<Utc>>,
    pub overall_status: Option<String>,
    /// `true` when the backend reports `locked`
    pub door_lock_status: Option<bool>,
    pub doors: Option<Doors>,
    pub windows: Option<Windows>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccessStatus {
    #[serde(default)]
    car_captured_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    overall_status: Option<String>,
    #[serde(default)]
    door_lock_status: Option<String>,
    #[serde(default)]
    doors: Option<Vec<NamedStatus>>,
    #[serde(default)]
    windows: Option<Vec<NamedStatus>>,
}

impl From<RawAccessStatus> for AccessStatus {
    fn from(raw: RawAccessStatus) -> Self {
        Self {
            car_captured_timestamp: raw.car_captured_timestamp,
            overall_status: raw.overall_status,
            door_lock_status: raw.door_lock_status.map(|s| s == "locked"),
            doors: raw.doors.as_deref().map(Doors::from_status),
            windows: raw.windows.as_deref().map(Windows::from_status),
        }
    }
}
