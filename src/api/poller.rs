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


//! Action-confirmation poller
//!
//! Remote commands are accepted asynchronously: the backend answers with a
//! request or action id and the vehicle reports the outcome later. The poller
//! sleeps, fetches the status, and stops on the first terminal value:
//!
//! | status | outcome |
//! |---|---|
//! | `success` | `Ok(())` |
//! | missing or `failure` | `HttpRequestError` at once |
//! | anything else | next attempt |
//! | budget exhausted | `TimeoutExceeded` |

use crate::api::auth::{Auth, TokenType};
use crate::api::client::ApiRequest;
use crate::config::PollConfig;
use crate::error::{ConnectError, Result};
use crate::model::path::get_path;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// Polls a status resource until the action reaches a terminal state
#[derive(Debug, Clone, Copy)]
pub struct ActionPoller<'a> {
    auth: &'a Auth,
    config: PollConfig,
}

impl<'a> ActionPoller<'a> {
    pub fn new(auth: &'a Auth, config: PollConfig) -> Self {
        Self { auth, config }
    }

    /// Poll `url` with MBB headers and read the status at `json_path`
    pub async fn poll(
        &self,
        url: &str,
        action: &str,
        success: &str,
        failure: Option<&str>,
        json_path: &str,
    ) -> Result<()> {
        self.run(url, TokenType::Mbb, action, success, failure, |body| {
            get_path(body, json_path).and_then(status_text)
        })
        .await
    }

    /// Poll the pending-requests list with IDK headers and read the status
    /// of the entry whose `id` is `request_id`
    pub async fn poll_pending(
        &self,
        url: &str,
        action: &str,
        success: &str,
        failure: Option<&str>,
        request_id: &str,
    ) -> Result<()> {
        self.run(url, TokenType::Idk, action, success, failure, |body| {
            body.get("data")
                .and_then(Value::as_array)?
                .iter()
                .find(|item| item.get("id").and_then(Value::as_str) == Some(request_id))
                .and_then(|item| item.get("status"))
                .and_then(status_text)
        })
        .await
    }

    async fn run<F>(
        &self,
        url: &str,
        token_type: TokenType,
        action: &str,
        success: &str,
        failure: Option<&str>,
        status_of: F,
    ) -> Result<()>
    where
        F: Fn(&Value) -> Option<String>,
    {
        for attempt in 1..=self.config.max_attempts {
            tokio::time::sleep(self.config.interval).await;

            let headers = self.auth.auth_headers(token_type, HeaderMap::new()).await?;
            let body = self
                .auth
                .client()
                .json(ApiRequest::get(url).headers(headers))
                .await?;
            let status = status_of(&body);

            tracing::debug!(action, attempt, status = ?status, "action status");

            match status.as_deref() {
                None => {
                    return Err(ConnectError::http(format!(
                        "Cannot {}, return code 'None'",
                        action
                    )))
                }
                Some(s) if Some(s) == failure => {
                    return Err(ConnectError::http(format!(
                        "Cannot {}, return code '{}'",
                        action, s
                    )))
                }
                Some(s) if s == success => return Ok(()),
                Some(_) => {}
            }
        }

        Err(ConnectError::timeout(format!(
            "Cannot {}, operation timed out",
            action
        )))
    }
}

fn status_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(&Value::Null), None);
        assert_eq!(status_text(&serde_json::json!("queued")), Some("queued".to_string()));
        assert_eq!(status_text(&serde_json::json!(2)), Some("2".to_string()));
    }
}
