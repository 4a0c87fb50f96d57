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


//! Parking position and HERE locations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Last parking position (`parkingposition` → `data`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
    #[serde(default, alias = "carCapturedTimestamp")]
    pub last_access: Option<DateTime<Utc>>,
}

impl Position {
    /// Read the position from a `parkingposition` response
    ///
    /// The backend answers 204 while the vehicle is moving; any body without
    /// `data.lat`/`data.lon` yields `None`.
    pub fn from_response(body: &Value) -> Option<Self> {
        let data = body.get("data")?;
        serde_json::from_value(data.clone()).ok()
    }
}

/// Saved HERE locations, split by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Entries without `proprietaryData` (vehicle-reported places)
    pub proprietaries: Vec<Value>,
    /// Entries with `proprietaryData` (user addresses)
    pub addresses: Vec<Value>,
}

impl Location {
    pub fn from_response(body: &Value) -> Self {
        let (addresses, proprietaries): (Vec<Value>, Vec<Value>) = body
            .get("data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .cloned()
                    .partition(|item| item.get("proprietaryData").is_some())
            })
            .unwrap_or_default();

        Self {
            proprietaries,
            addresses,
        }
    }
}
