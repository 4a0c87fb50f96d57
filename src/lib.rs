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


//! Client for the Audi connect vehicle cloud
//!
//! Logs in to myAudi, reads vehicle telemetry and sends remote commands
//! (locking, climatisation, charging, heating, honk/flash).
//!
//! - [`connect`]: account facade, start here
//! - [`api`]: login, accessors, commands
//! - [`model`]: typed attribute groups
//! - [`vehicle`]: per-vehicle state and support flags
//! - [`config`], [`error`]
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod api;
pub mod config;
pub mod connect;
pub mod error;
pub mod model;
pub mod vehicle;

pub use api::{ApiLevel, ApiLevels, HeaterSource, HonkFlashMode, SeatZones, Session};
pub use config::{ConnectConfig, Endpoints, UnitSystem};
pub use connect::AudiConnect;
pub use error::{ConnectError, Result};
pub use vehicle::{DataSource, Vehicle};
