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


//! Account facade
//!
//! [`AudiConnect`] owns the session and the vehicles of one account.
//!
//! # Update cycle
//! 1. `connect()` if the session is not authenticated
//! 2. `fetch_vehicles()` if no vehicle is known yet
//! 3. `update_vehicle()` for each vehicle; one failing vehicle is logged and
//!    does not stop the others
//!
//! # Example
//! ```rust,no_run
//! use audi_connect::{AudiConnect, ConnectConfig};
//!
//! # async fn run() -> audi_connect::Result<()> {
//! let config = ConnectConfig::builder("user@example.com", "secret")
//!     .country("DE")
//!     .build()?;
//! let mut account = AudiConnect::new(config)?;
//!
//! account.update(None).await?;
//! for vehicle in account.vehicles() {
//!     println!("{} {:?}", vehicle.title(), vehicle.state.position);
//! }
//! # Ok(())
//! # }
//! ```

use crate::api::auth::{Auth, Session};
use crate::api::commands::ApiLevel;
use crate::api::region::{self, HomeRegion};
use crate::config::ConnectConfig;
use crate::error::{ConnectError, Result};
use crate::model::trip::TripKind;
use crate::vehicle::{DataSource, SupportFlags, Vehicle};
use chrono::Utc;
use std::collections::BTreeMap;
use std::future::Future;

/// Client for one myAudi account
#[derive(Debug)]
pub struct AudiConnect {
    pub(crate) auth: Auth,
    pub(crate) vehicles: BTreeMap<String, Vehicle>,
}

impl AudiConnect {
    pub fn new(config: ConnectConfig) -> Result<Self> {
        Ok(Self {
            auth: Auth::new(config)?,
            vehicles: BTreeMap::new(),
        })
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn config(&self) -> &ConnectConfig {
        self.auth.config()
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub async fn connect(&self) -> Result<()> {
        self.auth.connect().await
    }

    pub async fn is_connected(&self) -> bool {
        self.auth.is_authenticated().await
    }

    /// Snapshot to resume later without a new login
    pub async fn session(&self) -> Option<Session> {
        self.auth.session().await
    }

    pub async fn restore_session(&self, session: Session) {
        self.auth.restore_session(session).await
    }

    // ========================================================================
    // Vehicles
    // ========================================================================

    pub fn vehicle(&self, vin: &str) -> Option<&Vehicle> {
        self.vehicles.get(&vin.to_uppercase())
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn set_api_level(&mut self, vin: &str, level: ApiLevel) -> Result<()> {
        self.vehicle_mut(vin)?.set_api_level(level);
        Ok(())
    }

    /// Load the vehicle list; new VINs are added, known ones get fresh info
    pub async fn fetch_vehicles(&mut self) -> Result<()> {
        let infos = self.auth.vehicle_list().await?;
        let api_levels = self.auth.config().api_levels;

        for info in infos {
            let vin = info.vin.to_uppercase();
            match self.vehicles.get_mut(&vin) {
                Some(vehicle) => vehicle.info = info,
                None => {
                    tracing::info!(vin = %vin, "vehicle found");
                    self.vehicles.insert(vin, Vehicle::new(info, api_levels));
                }
            }
        }
        Ok(())
    }

    /// Update all vehicles, or only those listed in `vins`
    pub async fn update(&mut self, vins: Option<&[&str]>) -> Result<()> {
        if !self.is_connected().await {
            self.connect().await?;
        }
        if self.vehicles.is_empty() {
            self.fetch_vehicles().await?;
        }

        let wanted: Option<Vec<String>> = vins.map(|v| v.iter().map(|vin| vin.to_uppercase()).collect());
        let targets: Vec<String> = self
            .vehicles
            .keys()
            .filter(|vin| wanted.as_ref().map_or(true, |w| w.contains(vin)))
            .cloned()
            .collect();

        for vin in targets {
            if let Err(e) = self.update_vehicle(&vin).await {
                tracing::error!(vin = %vin, error = %e, "Error while updating vehicle");
            }
        }
        Ok(())
    }

    /// Fetch every supported data source of `vin`
    ///
    /// A source answering 401, 403 or 502 is marked unsupported and skipped
    /// from then on; any other error aborts the update.
    pub async fn update_vehicle(&mut self, vin: &str) -> Result<()> {
        let vin = vin.to_uppercase();
        let support = self.vehicle_mut(&vin)?.support;

        let needs_region = [
            DataSource::Charger,
            DataSource::Climater,
            DataSource::Preheater,
            DataSource::StoredData,
            DataSource::TripShortTerm,
            DataSource::TripLongTerm,
            DataSource::TripCyclic,
        ]
        .iter()
        .any(|&source| support.get(source));
        let region = if needs_region {
            Some(self.home_region(&vin).await?)
        } else {
            None
        };

        let auth = &self.auth;
        let vehicle = self
            .vehicles
            .get_mut(&vin)
            .ok_or_else(|| ConnectError::VehicleNotFound(vin.clone()))?;
        let support = &mut vehicle.support;
        let state = &mut vehicle.state;

        if let Some(status) = guarded(support, DataSource::SelectiveStatus, &vin, auth.selective_status(&vin)).await? {
            state.status = Some(status);
        }
        if let Some(capabilities) = guarded(support, DataSource::Capabilities, &vin, auth.capabilities(&vin)).await? {
            state.capabilities = Some(capabilities);
        }
        // keep the last known position while the vehicle is moving
        if let Some(Some(position)) = guarded(support, DataSource::Position, &vin, auth.parking_position(&vin)).await? {
            state.position = Some(position);
        }
        if let Some(location) = guarded(support, DataSource::Location, &vin, auth.location()).await? {
            state.location = Some(location);
        }

        if let Some(region) = region.as_ref() {
            if let Some(charger) = guarded(support, DataSource::Charger, &vin, auth.charger(region, &vin)).await? {
                if charger.is_none() {
                    tracing::debug!(vin = %vin, "charger not reported");
                    support.clear(DataSource::Charger);
                }
                state.charger = charger;
            }
            if let Some(climater) = guarded(support, DataSource::Climater, &vin, auth.climater(region, &vin)).await? {
                state.climater = climater;
            }
            if let Some(preheater) = guarded(support, DataSource::Preheater, &vin, auth.preheater(region, &vin)).await? {
                state.preheater = preheater;
            }
            if let Some(stored) = guarded(support, DataSource::StoredData, &vin, auth.stored_data(region, &vin)).await? {
                state.stored_data = Some(stored);
            }
            for kind in TripKind::ALL {
                let source = DataSource::trip(kind);
                if let Some(trips) = guarded(support, source, &vin, auth.trip_data(region, &vin, kind)).await? {
                    state.trips.insert(kind, trips);
                }
            }
        }

        vehicle.last_update = Some(Utc::now());
        tracing::debug!(vin = %vin, "vehicle updated");
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn vehicle_mut(&mut self, vin: &str) -> Result<&mut Vehicle> {
        let vin = vin.to_uppercase();
        self.vehicles
            .get_mut(&vin)
            .ok_or(ConnectError::VehicleNotFound(vin))
    }

    /// Home region of `vin`, resolved once and cached
    ///
    /// A failed lookup falls back to the default region and is retried on the
    /// next call.
    pub(crate) async fn home_region(&mut self, vin: &str) -> Result<HomeRegion> {
        if let Some(region) = self.vehicle_mut(vin)?.home_region.clone() {
            return Ok(region);
        }

        match region::resolve(&self.auth, &vin.to_uppercase()).await {
            Ok(region) => {
                self.vehicle_mut(vin)?.home_region = Some(region.clone());
                Ok(region)
            }
            Err(e) => {
                tracing::warn!(vin, error = %e, "Home region lookup failed, using defaults");
                Ok(HomeRegion::defaults(&self.auth.config().endpoints))
            }
        }
    }
}

/// Run `request` when `source` is supported
///
/// `Ok(None)` when the source is switched off or the backend just refused it.
async fn guarded<T, F>(support: &mut SupportFlags, source: DataSource, vin: &str, request: F) -> Result<Option<T>>
where
    F: Future<Output = Result<T>>,
{
    if !support.get(source) {
        return Ok(None);
    }

    match request.await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_unsupported_status() => {
            tracing::warn!(vin, ?source, error = %e, "data source not supported, disabling");
            support.clear(source);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
