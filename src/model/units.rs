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


//! Distance values and unit normalization
//!
//! The backend reports every distance in kilometers. Decoding produces
//! `Distance` values in km; [`Normalize`] converts a decoded group to the
//! configured [`UnitSystem`] afterwards.

use crate::config::UnitSystem;
use serde::{Deserialize, Deserializer, Serialize};

const KM_TO_MILES: f64 = 0.621371;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Km,
    Mi,
}

/// A distance with its unit label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub fn km(value: f64) -> Self {
        Self {
            value,
            unit: DistanceUnit::Km,
        }
    }

    /// Kilometers expressed in `units`
    pub fn from_km(value: f64, units: UnitSystem) -> Self {
        let mut distance = Self::km(value);
        distance.normalize(units);
        distance
    }

    fn to_miles(self) -> Self {
        match self.unit {
            DistanceUnit::Mi => self,
            DistanceUnit::Km => Self {
                value: round2(self.value * KM_TO_MILES),
                unit: DistanceUnit::Mi,
            },
        }
    }
}

/// Vendor payloads carry bare numbers (sometimes as strings); they are km
impl<'de> Deserialize<'de> for Distance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
            Labeled { value: f64, unit: DistanceUnit },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Self::km(value)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Self::km)
                .map_err(serde::de::Error::custom),
            Raw::Labeled { value, unit } => Ok(Self { value, unit }),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert every distance in a decoded group to the configured unit system
pub trait Normalize {
    fn normalize(&mut self, units: UnitSystem);
}

impl Normalize for Distance {
    fn normalize(&mut self, units: UnitSystem) {
        if units == UnitSystem::Imperial {
            *self = self.to_miles();
        }
    }
}

impl<T: Normalize> Normalize for Option<T> {
    fn normalize(&mut self, units: UnitSystem) {
        if let Some(inner) = self {
            inner.normalize(units);
        }
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalize(&mut self, units: UnitSystem) {
        for item in self.iter_mut() {
            item.normalize(units);
        }
    }
}
