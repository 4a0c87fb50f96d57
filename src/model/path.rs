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


//! JSON helpers for vendor-unstable substructures
//!
//! Typed structs cover the documented groups. Everything else is read with a
//! dotted-path lookup (`"action.actionState"`) or flattened into
//! snake_case keys.

use heck::ToSnakeCase;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// Dotted paths
// ============================================================================

/// Walk `path` (dot separated) through nested objects
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
        .filter(|v| !v.is_null())
}

pub fn get_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    get_path(value, path).and_then(Value::as_str)
}

/// Integer at `path`; numeric strings are accepted
pub fn get_i64(value: &Value, path: &str) -> Option<i64> {
    match get_path(value, path)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Float at `path`; numeric strings are accepted
pub fn get_f64(value: &Value, path: &str) -> Option<f64> {
    match get_path(value, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String form of the scalar at `path`
pub fn get_string(value: &Value, path: &str) -> Option<String> {
    match get_path(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ============================================================================
// {"value": …} wrappers
// ============================================================================

/// Deserialize a `{"value": T}` wrapper into `Some(T)`
///
/// A group without `value` (the backend sends `{"error": …}` for jobs the
/// vehicle cannot answer) or one that does not fit `T` becomes `None`.
pub fn unwrap_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let inner = match raw {
        Some(Value::Object(mut map)) => map.remove("value"),
        _ => None,
    };

    Ok(inner.and_then(|value| match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable status group");
            None
        }
    }))
}

/// Remove `{"value": …}` wrappers one level below each group
pub fn strip_values(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| match child {
                    Value::Object(mut inner) if inner.contains_key("value") => {
                        let unwrapped = inner.remove("value").unwrap_or(Value::Null);
                        (key, unwrapped)
                    }
                    other => (key, other),
                })
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Flatten nested objects into `prefix.child_key` entries with snake_case keys
///
/// Arrays and scalars are leaves.
pub fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let key = format!("{}.{}", prefix, key.to_snake_case());
                flatten_into(&key, child, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

// ============================================================================
// Status strings to flags
// ============================================================================

fn flag<'de, D, F>(deserializer: D, test: F) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
    F: Fn(&str) -> bool,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|s| test(&s)))
}

/// `"locked"` → `true`
pub fn is_locked<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    flag(deserializer, |s| s == "locked")
}

/// Anything but `"off"` → `true`
pub fn not_off<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    flag(deserializer, |s| s != "off")
}

/// `"charging"` → `true`
pub fn is_charging<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    flag(deserializer, |s| s == "charging")
}

/// `"connected"` → `true`
pub fn is_connected<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    flag(deserializer, |s| s == "connected")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_get_path_nested() {
        let body = json!({"action": {"actionState": "queued", "actionId": 7}});

        assert_eq!(get_str(&body, "action.actionState"), Some("queued"));
        assert_eq!(get_i64(&body, "action.actionId"), Some(7));
        assert!(get_path(&body, "action.missing").is_none());
        assert!(get_path(&body, "action.actionState.deeper").is_none());
    }

    #[test]
    fn test_get_path_null_is_missing() {
        let body = json!({"a": {"b": null}});
        assert!(get_path(&body, "a.b").is_none());
    }

    #[test]
    fn test_numeric_strings() {
        let body = json!({"c": {"content": "123"}, "f": {"content": "2.5"}});

        assert_eq!(get_i64(&body, "c.content"), Some(123));
        assert_eq!(get_f64(&body, "f.content"), Some(2.5));
        assert_eq!(get_string(&body, "c.content"), Some("123".to_string()));
    }

    #[derive(Debug, Deserialize)]
    struct Group {
        #[serde(default, deserialize_with = "unwrap_value")]
        status: Option<Inner>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Inner {
        level: u32,
    }

    #[test]
    fn test_unwrap_value() {
        let group: Group = serde_json::from_value(json!({"status": {"value": {"level": 3}}})).unwrap();
        assert_eq!(group.status, Some(Inner { level: 3 }));
    }

    #[test]
    fn test_unwrap_value_error_group_is_none() {
        let group: Group =
            serde_json::from_value(json!({"status": {"error": {"message": "x"}}})).unwrap();
        assert!(group.status.is_none());

        let group: Group = serde_json::from_value(json!({})).unwrap();
        assert!(group.status.is_none());
    }

    #[derive(Debug, Deserialize)]
    struct Flags {
        #[serde(default, deserialize_with = "is_locked")]
        lock: Option<bool>,
        #[serde(default, deserialize_with = "not_off")]
        heater: Option<bool>,
    }

    #[test]
    fn test_flag_strings() {
        let flags: Flags = serde_json::from_value(json!({"lock": "unlocked", "heater": "heating"})).unwrap();
        assert_eq!(flags.lock, Some(false));
        assert_eq!(flags.heater, Some(true));

        let flags: Flags = serde_json::from_value(json!({"heater": "off"})).unwrap();
        assert_eq!(flags.lock, None);
        assert_eq!(flags.heater, Some(false));
    }

    #[test]
    fn test_flatten_snake_case() {
        let group = strip_values(json!({
            "departureProfiles": {"value": {"minSocPct": 20, "profileList": [1, 2]}}
        }));
        let mut out = BTreeMap::new();
        flatten_into("departure_profiles", &group, &mut out);

        assert_eq!(out.get("departure_profiles.departure_profiles.min_soc_pct"), Some(&json!(20)));
        assert_eq!(
            out.get("departure_profiles.departure_profiles.profile_list"),
            Some(&json!([1, 2]))
        );
    }
}
