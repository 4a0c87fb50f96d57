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


//! Login page scraping
//!
//! The identity provider only speaks HTML forms. Everything the login flow
//! needs from those pages goes through three functions:
//! - [`extract_hidden_fields`]: `<input type="hidden">` name/value pairs
//! - [`extract_form_action`]: the first `<form action>`, resolved to a URL
//! - [`extract_hmac`]: the `hmac` value embedded in the page's script

use crate::error::{ConnectError, Result};
use html_escape::decode_html_entities;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    // quoted attribute values may contain `>`
    static ref INPUT_TAG: Regex = Regex::new(r#"(?is)<input\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap();
    static ref FORM_TAG: Regex = Regex::new(r#"(?is)<form\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap();
    static ref ATTRIBUTE: Regex = Regex::new(
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#
    )
    .unwrap();
    static ref HMAC: Regex = Regex::new(r#""hmac"\s*:\s*"([0-9a-fA-F]+)""#).unwrap();
}

/// Ordered form fields; setting an existing name replaces its value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: Vec<(String, String)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.fields
    }
}

/// Collect every `<input type="hidden">` of the page
///
/// Inputs without a `name` are skipped; a missing `value` becomes "".
pub fn extract_hidden_fields(html: &str) -> FormFields {
    let mut fields = FormFields::new();

    for tag in INPUT_TAG.find_iter(html) {
        let attributes = parse_attributes(tag.as_str());
        let is_hidden = attribute(&attributes, "type")
            .map(|t| t.eq_ignore_ascii_case("hidden"))
            .unwrap_or(false);
        if !is_hidden {
            continue;
        }
        if let Some(name) = attribute(&attributes, "name") {
            let value = attribute(&attributes, "value").unwrap_or_default();
            fields.set(name, value);
        }
    }

    fields
}

/// Resolve the action of the page's first `<form>`
///
/// - `http…` is taken as is
/// - `/…` is joined to the scheme and host of `base_url`
/// - anything else is rejected
pub fn extract_form_action(html: &str, base_url: &str) -> Result<String> {
    let tag = FORM_TAG
        .find(html)
        .ok_or_else(|| ConnectError::auth_failed("Login page contains no form"))?;

    let attributes = parse_attributes(tag.as_str());
    let action = attribute(&attributes, "action")
        .ok_or_else(|| ConnectError::auth_failed("Login form has no action"))?;

    if action.starts_with("http") {
        return Ok(action);
    }

    if action.starts_with('/') {
        let base = Url::parse(base_url)?;
        let host = base
            .host_str()
            .ok_or_else(|| ConnectError::InvalidInput(format!("URL without host: {}", base_url)))?;
        let origin = match base.port() {
            Some(port) => format!("{}://{}:{}", base.scheme(), host, port),
            None => format!("{}://{}", base.scheme(), host),
        };
        return Ok(format!("{}{}", origin, action));
    }

    Err(ConnectError::auth_failed(format!("Unknown form action: {}", action)))
}

/// Find the `hmac` the password page embeds in its script
pub fn extract_hmac(html: &str) -> Option<String> {
    HMAC.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_html_entities(m.as_str()).into_owned())
                .unwrap_or_default();
            Some((name, value))
        })
        .collect()
}

fn attribute(attributes: &[(String, String)], name: &str) -> Option<String> {
    attributes
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}
