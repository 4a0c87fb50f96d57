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


//! Vehicle state
//!
//! A [`Vehicle`] is created from the account's vehicle list and keeps the
//! attribute groups of its most recent update. Every data source has a
//! support flag; a source the backend refuses with 401, 403 or 502 is switched
//! off and not asked again.

use crate::api::commands::{ApiLevel, ApiLevels};
use crate::api::region::HomeRegion;
use crate::model::info::VehicleInfo;
use crate::model::legacy::{ChargerState, ClimaterState, PreheaterState, StoredData};
use crate::model::position::{Location, Position};
use crate::model::status::{Capability, SelectiveStatus};
use crate::model::trip::{TripKind, TripStatistics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data sources of a vehicle update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    SelectiveStatus,
    Capabilities,
    Position,
    Location,
    Charger,
    Climater,
    Preheater,
    StoredData,
    TripShortTerm,
    TripLongTerm,
    TripCyclic,
}

impl DataSource {
    pub fn trip(kind: TripKind) -> Self {
        match kind {
            TripKind::ShortTerm => Self::TripShortTerm,
            TripKind::LongTerm => Self::TripLongTerm,
            TripKind::Cyclic => Self::TripCyclic,
        }
    }
}

/// Which data sources the vehicle answers; all assumed until refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportFlags {
    pub selective_status: bool,
    pub capabilities: bool,
    pub position: bool,
    pub location: bool,
    pub charger: bool,
    pub climater: bool,
    pub preheater: bool,
    pub stored_data: bool,
    pub trip_short_term: bool,
    pub trip_long_term: bool,
    pub trip_cyclic: bool,
}

impl Default for SupportFlags {
    fn default() -> Self {
        Self {
            selective_status: true,
            capabilities: true,
            position: true,
            location: true,
            charger: true,
            climater: true,
            preheater: true,
            stored_data: true,
            trip_short_term: true,
            trip_long_term: true,
            trip_cyclic: true,
        }
    }
}

impl SupportFlags {
    pub fn get(&self, source: DataSource) -> bool {
        *self.flag(source)
    }

    pub fn clear(&mut self, source: DataSource) {
        *self.flag_mut(source) = false;
    }

    fn flag(&self, source: DataSource) -> &bool {
        match source {
            DataSource::SelectiveStatus => &self.selective_status,
            DataSource::Capabilities => &self.capabilities,
            DataSource::Position => &self.position,
            DataSource::Location => &self.location,
            DataSource::Charger => &self.charger,
            DataSource::Climater => &self.climater,
            DataSource::Preheater => &self.preheater,
            DataSource::StoredData => &self.stored_data,
            DataSource::TripShortTerm => &self.trip_short_term,
            DataSource::TripLongTerm => &self.trip_long_term,
            DataSource::TripCyclic => &self.trip_cyclic,
        }
    }

    fn flag_mut(&mut self, source: DataSource) -> &mut bool {
        match source {
            DataSource::SelectiveStatus => &mut self.selective_status,
            DataSource::Capabilities => &mut self.capabilities,
            DataSource::Position => &mut self.position,
            DataSource::Location => &mut self.location,
            DataSource::Charger => &mut self.charger,
            DataSource::Climater => &mut self.climater,
            DataSource::Preheater => &mut self.preheater,
            DataSource::StoredData => &mut self.stored_data,
            DataSource::TripShortTerm => &mut self.trip_short_term,
            DataSource::TripLongTerm => &mut self.trip_long_term,
            DataSource::TripCyclic => &mut self.trip_cyclic,
        }
    }
}

/// Attribute groups of the most recent update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleState {
    pub status: Option<SelectiveStatus>,
    pub capabilities: Option<Vec<Capability>>,
    pub position: Option<Position>,
    pub location: Option<Location>,
    pub charger: Option<ChargerState>,
    pub climater: Option<ClimaterState>,
    pub preheater: Option<PreheaterState>,
    pub stored_data: Option<StoredData>,
    pub trips: BTreeMap<TripKind, TripStatistics>,
}

/// One vehicle of the account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    /// Uppercase
    pub vin: String,
    pub info: VehicleInfo,
    /// Resolved on first use
    pub home_region: Option<HomeRegion>,
    pub support: SupportFlags,
    pub api_levels: ApiLevels,
    pub state: VehicleState,
    pub last_update: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn new(info: VehicleInfo, api_levels: ApiLevels) -> Self {
        Self {
            vin: info.vin.to_uppercase(),
            info,
            home_region: None,
            support: SupportFlags::default(),
            api_levels,
            state: VehicleState::default(),
            last_update: None,
        }
    }

    pub fn title(&self) -> &str {
        self.info.title()
    }

    pub fn set_api_level(&mut self, level: ApiLevel) {
        self.api_levels.apply(level);
    }

    /// Capture time of the access state, when the selective status has one
    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        self.state.status.as_ref()?.last_access()
    }

    pub fn position(&self) -> Option<&Position> {
        self.state.position.as_ref()
    }
}
