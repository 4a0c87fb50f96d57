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


//! Trip statistics
//!
//! The backend returns every recorded trip segment. The newest entry (highest
//! `overallMileage`) is the running trip; it absorbs the id and start mileage
//! of older segments until their start mileage lies more than 2 km behind.
//! That first older entry is the trip as it was at the last reset.

use crate::error::{ConnectError, Result};
use crate::model::path::get_path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Start mileage gap that separates two trips
const RESET_GAP_KM: f64 = 2.0;

/// Aggregation period of the trip statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripKind {
    ShortTerm,
    LongTerm,
    Cyclic,
}

impl TripKind {
    pub const ALL: [TripKind; 3] = [TripKind::ShortTerm, TripKind::LongTerm, TripKind::Cyclic];

    /// Path segment of the tripdata resource
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "shortTerm",
            Self::LongTerm => "longTerm",
            Self::Cyclic => "cyclic",
        }
    }
}

/// Trip segment as delivered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrip {
    #[serde(rename = "tripID", default)]
    trip_id: Option<i64>,
    #[serde(default)]
    average_electric_engine_consumption: Option<f64>,
    #[serde(default)]
    average_fuel_consumption: Option<f64>,
    #[serde(default)]
    average_speed: Option<f64>,
    #[serde(default)]
    mileage: Option<f64>,
    #[serde(default)]
    start_mileage: Option<f64>,
    #[serde(default)]
    traveltime: Option<f64>,
    #[serde(default)]
    overall_mileage: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// One trip with consumptions scaled to their display units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: i64,
    /// kWh/100km
    pub average_electric_engine_consumption: f64,
    /// l/100km
    pub average_fuel_consumption: f64,
    pub average_speed: i64,
    pub mileage: i64,
    pub start_mileage: i64,
    /// Minutes
    pub traveltime: i64,
    pub overall_mileage: i64,
    pub timestamp: Option<String>,
}

impl RawTrip {
    fn to_trip(&self) -> Trip {
        let raw = self;
        let int = |v: Option<f64>| v.unwrap_or(0.0) as i64;
        Trip {
            trip_id: raw.trip_id.unwrap_or_default(),
            average_electric_engine_consumption: raw.average_electric_engine_consumption.unwrap_or(0.0) / 10.0,
            average_fuel_consumption: raw.average_fuel_consumption.unwrap_or(0.0) / 10.0,
            average_speed: int(raw.average_speed),
            mileage: int(raw.mileage),
            start_mileage: int(raw.start_mileage),
            traveltime: int(raw.traveltime),
            overall_mileage: int(raw.overall_mileage),
            timestamp: raw.timestamp.clone(),
        }
    }
}

/// Running trip and the trip at the last reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStatistics {
    pub current: Trip,
    pub reset: Option<Trip>,
}

impl TripStatistics {
    /// Read a `tripDataList` response
    ///
    /// # Errors
    /// `InvalidApiResponse` when the list is missing or empty.
    pub fn from_response(body: &Value) -> Result<Self> {
        let list = get_path(body, "tripDataList.tripData")
            .cloned()
            .ok_or_else(|| ConnectError::invalid_response("Trip data list missing", None))?;

        let trips = match list {
            Value::Array(_) => serde_json::from_value::<Vec<RawTrip>>(list)?,
            single => vec![serde_json::from_value::<RawTrip>(single)?],
        };

        Self::from_trips(trips)
            .ok_or_else(|| ConnectError::invalid_response("Trip data list empty", None))
    }

    fn from_trips(mut trips: Vec<RawTrip>) -> Option<Self> {
        trips.sort_by(|a, b| {
            let a = a.overall_mileage.unwrap_or(0.0);
            let b = b.overall_mileage.unwrap_or(0.0);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut current = trips.first()?.clone();
        let mut reset = None;

        for trip in &trips {
            let gap = current.start_mileage.unwrap_or(0.0) - trip.start_mileage.unwrap_or(0.0);
            if gap > RESET_GAP_KM {
                reset = Some(trip.to_trip());
                break;
            }
            current.trip_id = trip.trip_id;
            current.start_mileage = trip.start_mileage;
        }

        Some(Self {
            current: current.to_trip(),
            reset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trip(id: i64, start: i64, overall: i64) -> Value {
        json!({
            "tripID": id,
            "averageElectricEngineConsumption": 185,
            "averageFuelConsumption": 62,
            "averageSpeed": 48,
            "mileage": overall - start,
            "startMileage": start,
            "traveltime": 30,
            "overallMileage": overall,
            "timestamp": "2024-03-01T08:15:00Z"
        })
    }

    #[test]
    fn test_current_absorbs_adjacent_segments() {
        // segments 3, 2 and 1 are one trip split by short stops; 0 is older
        let body = json!({"tripDataList": {"tripData": [
            trip(1, 1000, 1002),
            trip(0, 900, 990),
            trip(3, 1003, 1010),
            trip(2, 1002, 1003)
        ]}});

        let stats = TripStatistics::from_response(&body).unwrap();

        assert_eq!(stats.current.overall_mileage, 1010);
        assert_eq!(stats.current.trip_id, 1);
        assert_eq!(stats.current.start_mileage, 1000);

        let reset = stats.reset.unwrap();
        assert_eq!(reset.trip_id, 0);
        assert_eq!(reset.start_mileage, 900);
    }

    #[test]
    fn test_consumptions_scaled() {
        let body = json!({"tripDataList": {"tripData": [trip(7, 10, 50)]}});
        let stats = TripStatistics::from_response(&body).unwrap();

        assert_eq!(stats.current.average_electric_engine_consumption, 18.5);
        assert_eq!(stats.current.average_fuel_consumption, 6.2);
        assert_eq!(stats.current.average_speed, 48);
        assert!(stats.reset.is_none());
    }

    #[test]
    fn test_missing_or_empty_list() {
        assert!(TripStatistics::from_response(&json!({})).is_err());
        assert!(TripStatistics::from_response(&json!({"tripDataList": {"tripData": []}})).is_err());
    }

    #[test]
    fn test_trip_kind_paths() {
        let paths: Vec<_> = TripKind::ALL.iter().map(TripKind::as_str).collect();
        assert_eq!(paths, vec!["shortTerm", "longTerm", "cyclic"]);
    }
}
