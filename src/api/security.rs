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


//! Security-PIN token exchange
//!
//! Lock/unlock and heater commands need a short-lived security token:
//! 1. GET `…/services/{operation}/security-pin-auth-requested` → token + challenge
//! 2. POST `…/security-pin-auth-completed` with
//!    `upper(hex(sha512(bytes(pin) ++ bytes(challenge))))`
//! 3. The response's `securityToken` goes into the command headers

use crate::api::auth::{Auth, TokenType};
use crate::api::client::{header_map, ApiRequest};
use crate::config::OKHTTP_USER_AGENT;
use crate::error::{ConnectError, Result};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha512};

/// Hash of the security PIN answering `challenge`
///
/// Both inputs are hex strings, read two characters per byte; a trailing
/// single character is read as one byte.
///
/// # Errors
/// `InvalidInput` if either input is not hex.
pub fn spin_hash(spin: &str, challenge: &str) -> Result<String> {
    let mut bytes = hex_bytes(spin)?;
    bytes.extend(hex_bytes(challenge)?);

    let digest = Sha512::digest(&bytes);
    Ok(hex::encode_upper(digest))
}

fn hex_bytes(value: &str) -> Result<Vec<u8>> {
    if !value.is_ascii() {
        return Err(ConnectError::InvalidInput(format!("not a hex string: {}", value)));
    }
    value
        .as_bytes()
        .chunks(2)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .ok()
                .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| ConnectError::InvalidInput(format!("not a hex string: {}", value)))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinChallenge {
    security_pin_auth_info: PinAuthInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinAuthInfo {
    security_token: String,
    security_pin_transmission: PinTransmission,
}

#[derive(Debug, Deserialize)]
struct PinTransmission {
    challenge: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinCompleted {
    #[serde(default)]
    security_token: Option<String>,
}

/// Obtain a security token for `operation` (e.g. `rlu_v1/operations/LOCK`)
///
/// Returns `Ok(None)` when no PIN is configured; the command then goes out
/// without a security header and the backend rejects it.
pub async fn security_token(
    auth: &Auth,
    url_setter: &str,
    vin: &str,
    operation: &str,
) -> Result<Option<String>> {
    let spin = match auth.config().spin.as_deref() {
        Some(spin) => spin,
        None => {
            tracing::error!(vin, operation, "Security PIN not found");
            return Ok(None);
        }
    };

    let headers = auth
        .auth_headers(TokenType::Mbb, header_map(&[("User-Agent", OKHTTP_USER_AGENT)])?)
        .await?;

    let challenge: PinChallenge = auth
        .client()
        .typed(
            ApiRequest::get(format!(
                "{}/rolesrights/authorization/v2/vehicles/{}/services/{}/security-pin-auth-requested",
                url_setter, vin, operation
            ))
            .headers(headers.clone()),
        )
        .await?;

    let info = challenge.security_pin_auth_info;
    let challenge = info.security_pin_transmission.challenge;
    let body = json!({
        "securityPinAuthentication": {
            "securityPin": {
                "challenge": challenge,
                "securityPinHash": spin_hash(spin, &challenge)?,
            },
            "securityToken": info.security_token,
        }
    });

    let mut headers = headers;
    headers.extend(header_map(&[("Content-Type", "application/json")])?);

    let completed: PinCompleted = auth
        .client()
        .typed(
            ApiRequest::post(format!(
                "{}/rolesrights/authorization/v2/security-pin-auth-completed",
                url_setter
            ))
            .headers(headers)
            .json(body),
        )
        .await?;

    Ok(completed.security_token.filter(|token| !token.is_empty()))
}
