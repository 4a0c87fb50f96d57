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


//! Vehicle attribute mapping
//!
//! Pure transformations from vendor payloads to typed attribute groups. The
//! backend speaks several schema generations at once:
//! - `status`, `access`, `charging`, `climatisation`: connected-vehicle
//!   selective status, every group wrapped in `{"value": …}`
//! - `legacy`: MBB stored data and `{"content": …}` service documents
//! - `info`: GraphQL vehicle list
//! - `position`, `trip`: parking position, HERE locations, trip statistics
//!
//! Distances are decoded in km and converted afterwards (see [`units`]).

pub mod access;
pub mod charging;
pub mod climatisation;
pub mod info;
pub mod legacy;
pub mod path;
pub mod position;
pub mod status;
pub mod trip;
pub mod units;

// Re-export commonly used types
pub use info::VehicleInfo;
pub use legacy::{ChargerState, ClimaterState, FieldValue, PreheaterState, StoredData};
pub use position::{Location, Position};
pub use status::{Capability, SelectiveStatus};
pub use trip::{Trip, TripKind, TripStatistics};
pub use units::{Distance, DistanceUnit, Normalize};
