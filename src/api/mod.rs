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


//! Audi connect backend client
//!
//! Authentication, service discovery, data accessors and remote commands.
//!
//! # Layers
//! - `client`: HTTP transport and error classification
//! - `scrape`, `discovery`, `auth`: login and token lifecycle
//! - `vehicles`: read accessors on [`Auth`]
//! - `commands`, `security`, `poller`, `region`, `actions`: remote commands

pub mod actions;
pub mod auth;
pub mod client;
pub mod commands;
pub mod discovery;
pub mod poller;
pub mod region;
pub mod scrape;
pub mod security;
pub mod vehicles;

// Re-export commonly used types
pub use auth::{Auth, AuthState, Session, TokenSet, TokenType};
pub use client::{ApiClient, ClientConfig};
pub use commands::{ApiLevel, ApiLevels, HeaterSource, HonkFlashMode, SeatZones};
pub use discovery::ServiceUris;
pub use poller::ActionPoller;
pub use region::HomeRegion;
