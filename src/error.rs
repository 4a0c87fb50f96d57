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


//! Error types for the Audi connect client
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! The taxonomy follows what the vendor backend can actually tell us:
//!
//! ### Authentication
//! - Login failed after the bounded retries → `AuthorizationError`
//! - Market/OpenID configuration could not be resolved → `DiscoveryFailed`
//!
//! ### Transport
//! - Connection refused, DNS failure, broken stream → `HttpRequestError`
//! - Wall-clock request timeout, exhausted polling budget → `TimeoutExceeded`
//!
//! ### Backend responses
//! - Any non-2xx status → `ServiceNotFound` (carries status and message)
//! - Body that does not match the expected shape → `InvalidApiResponse`
//!
//! ### Client-side
//! - Bad caller input (PIN not hex, unknown VIN, missing position) →
//!   `InvalidInput`, `VehicleNotFound`, `UnsupportedCapability`

use thiserror::Error;

/// Result type alias using our ConnectError type
pub type Result<T> = std::result::Result<T, ConnectError>;

/// HTTP status codes that mean "this vehicle does not offer this service".
///
/// The backend answers 401/403 for services outside the vehicle's license and
/// 502 for services its generation never had.
pub const UNSUPPORTED_STATUS_CODES: [u16; 3] = [401, 403, 502];

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ConnectError {
    // ===== Authentication Errors =====

    /// Login to the identity provider failed
    #[error("Authorization failed: {message}")]
    AuthorizationError {
        message: String,
    },

    /// Service discovery (market configuration, OpenID configuration) failed
    #[error("Failed to retrieve service urls: {message}")]
    DiscoveryFailed {
        message: String,
    },

    // ===== Transport Errors =====

    /// Transport-level failure, or a remote action reporting failure
    #[error("HTTP request error: {message}")]
    HttpRequestError {
        message: String,
    },

    /// Request timeout or exhausted polling budget
    #[error("Timeout exceeded: {message}")]
    TimeoutExceeded {
        message: String,
    },

    // ===== Backend Response Errors =====

    /// Backend answered with a non-2xx status
    #[error("Service not found: {url} - {message} ({status})")]
    ServiceNotFound {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// `error.message` from a JSON body, or the raw body text
        message: String,
    },

    /// Backend answered 2xx but the body is not what we expected
    #[error("Invalid API response: {message}")]
    InvalidApiResponse {
        message: String,
        /// Response body snippet for debugging
        response_body: Option<String>,
    },

    // ===== Client-side Errors =====

    /// Invalid input supplied by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// VIN is not part of this account
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    /// Command needs data or a service the vehicle does not provide
    #[error("Unsupported capability '{capability}' for vehicle {vin}")]
    UnsupportedCapability {
        vin: String,
        capability: String,
    },

    // ===== External Library Errors =====

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl ConnectError {
    /// Create an authorization error
    pub fn auth_failed<S: Into<String>>(message: S) -> Self {
        Self::AuthorizationError {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn http<S: Into<String>>(message: S) -> Self {
        Self::HttpRequestError {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::TimeoutExceeded {
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response<S: Into<String>>(message: S, response_body: Option<String>) -> Self {
        Self::InvalidApiResponse {
            message: message.into(),
            response_body,
        }
    }

    /// Check if the error is transient (worth retrying the login for)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpRequestError { .. } | Self::TimeoutExceeded { .. }
        )
    }

    /// Check if the error is authentication-related
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::AuthorizationError { .. } => true,
            Self::ServiceNotFound { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// HTTP status code, for errors produced by a backend response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServiceNotFound { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the backend signalled that the vehicle lacks this service
    pub fn is_unsupported_status(&self) -> bool {
        self.status_code()
            .map(|status| UNSUPPORTED_STATUS_CODES.contains(&status))
            .unwrap_or(false)
    }
}

// ===== TESTS =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConnectError::ServiceNotFound {
            url: "https://example.com/x".to_string(),
            status: 404,
            message: "nope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Service not found: https://example.com/x - nope (404)"
        );

        let err = ConnectError::timeout("Cannot lock vehicle, operation timed out");
        assert!(err.to_string().contains("operation timed out"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(ConnectError::http("connection reset").is_retryable());
        assert!(ConnectError::timeout("slow").is_retryable());
        assert!(!ConnectError::auth_failed("bad password").is_retryable());
        assert!(!ConnectError::InvalidInput("x".to_string()).is_retryable());
    }

    #[test]
    fn test_unsupported_status() {
        for status in [401u16, 403, 502] {
            let err = ConnectError::ServiceNotFound {
                url: String::new(),
                status,
                message: String::new(),
            };
            assert!(err.is_unsupported_status(), "status {status}");
        }

        let err = ConnectError::ServiceNotFound {
            url: String::new(),
            status: 500,
            message: String::new(),
        };
        assert!(!err.is_unsupported_status());
        assert!(!ConnectError::http("x").is_unsupported_status());
    }

    #[test]
    fn test_is_auth_error() {
        assert!(ConnectError::auth_failed("x").is_auth_error());
        let err = ConnectError::ServiceNotFound {
            url: String::new(),
            status: 401,
            message: String::new(),
        };
        assert!(err.is_auth_error());
        assert!(!ConnectError::http("x").is_auth_error());
    }
}
