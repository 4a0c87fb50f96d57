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


//! Home-region resolution
//!
//! Legacy MBB services live on regional hosts. The vehicle's home region is
//! looked up once on the default setter host; when it names another host,
//! reads go to its `fal-…/fs-car` twin and writes to the `mal-…/api` host.

use crate::api::auth::{Auth, TokenType};
use crate::api::client::ApiRequest;
use crate::config::Endpoints;
use crate::error::Result;
use crate::model::path::get_str;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Regional base URLs of one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeRegion {
    /// Read endpoints (`fs-car`)
    pub url: String,
    /// Write endpoints and security-PIN exchange (`api`)
    pub url_setter: String,
}

impl HomeRegion {
    pub fn defaults(endpoints: &Endpoints) -> Self {
        Self {
            url: endpoints.home_region_url.clone(),
            url_setter: endpoints.home_region_setter_url.clone(),
        }
    }
}

/// Apply a reported `baseUri` to the default region
pub fn derive_home_region(base_uri: Option<&str>, defaults: &HomeRegion) -> HomeRegion {
    match base_uri {
        Some(uri) if !uri.is_empty() && uri != defaults.url_setter => HomeRegion {
            url: uri.replace("mal-", "fal-").replace("/api", "/fs-car"),
            url_setter: uri.to_string(),
        },
        _ => defaults.clone(),
    }
}

/// Look up the home region of `vin`
pub async fn resolve(auth: &Auth, vin: &str) -> Result<HomeRegion> {
    let defaults = HomeRegion::defaults(&auth.config().endpoints);
    let headers = auth.auth_headers(TokenType::Mbb, HeaderMap::new()).await?;

    let body = auth
        .client()
        .json(
            ApiRequest::get(format!(
                "{}/cs/vds/v1/vehicles/{}/homeRegion",
                defaults.url_setter, vin
            ))
            .headers(headers),
        )
        .await?;

    let region = derive_home_region(get_str(&body, "homeRegion.baseUri.content"), &defaults);
    tracing::debug!(vin, ?region, "home region");
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> HomeRegion {
        HomeRegion {
            url: "https://msg.volkswagen.de/fs-car".to_string(),
            url_setter: "https://mal-1a.prd.ece.vwg-connect.com/api".to_string(),
        }
    }

    #[test]
    fn test_home_region_substitution() {
        let region = derive_home_region(Some("https://mal-1a.example.com/api"), &defaults());

        assert_eq!(region.url, "https://fal-1a.example.com/fs-car");
        assert_eq!(region.url_setter, "https://mal-1a.example.com/api");
    }

    #[test]
    fn test_home_region_same_as_setter_keeps_defaults() {
        let region = derive_home_region(Some("https://mal-1a.prd.ece.vwg-connect.com/api"), &defaults());
        assert_eq!(region, defaults());
    }

    #[test]
    fn test_home_region_missing_keeps_defaults() {
        assert_eq!(derive_home_region(None, &defaults()), defaults());
        assert_eq!(derive_home_region(Some(""), &defaults()), defaults());
    }
}
