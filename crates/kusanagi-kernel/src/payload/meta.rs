//! Request and transport metadata.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire datetime format used across the framework.
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f+00:00";

/// Format a timestamp in the framework wire format.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Parse a wire datetime string.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Immutable identity of the request being processed.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Meta {
    #[serde(rename = "i", default)]
    pub id: String,

    #[serde(rename = "v", default)]
    pub version: String,

    #[serde(rename = "d", default)]
    pub datetime: String,

    #[serde(rename = "t", default)]
    pub request_type: u64,

    #[serde(rename = "p", default)]
    pub protocol: String,

    /// Gateway addresses as an `[internal, public]` pair.
    #[serde(rename = "g", default)]
    pub gateway: Vec<String>,

    #[serde(rename = "c", default)]
    pub client: String,

    #[serde(rename = "a", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Meta {
    pub fn internal_gateway(&self) -> &str {
        self.gateway.first().map(String::as_str).unwrap_or("")
    }

    pub fn public_gateway(&self) -> &str {
        self.gateway.get(1).map(String::as_str).unwrap_or("")
    }

    pub fn get_datetime(&self) -> Option<DateTime<Utc>> {
        parse_datetime(&self.datetime)
    }
}

/// Metadata carried by a transport.
///
/// Adds the origin triple and call depth on top of the request identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportMeta {
    #[serde(rename = "v", default)]
    pub version: String,

    #[serde(rename = "i", default)]
    pub id: String,

    #[serde(rename = "d", default)]
    pub datetime: String,

    #[serde(rename = "s", default, skip_serializing_if = "String::is_empty")]
    pub start_time: String,

    #[serde(rename = "e", default, skip_serializing_if = "String::is_empty")]
    pub end_time: String,

    #[serde(rename = "D", default, skip_serializing_if = "is_zero")]
    pub duration: u64,

    /// Gateway addresses as an `[internal, public]` pair.
    #[serde(rename = "g", default)]
    pub gateway: Vec<String>,

    /// The `[service, version, action]` triple that entered the request.
    #[serde(rename = "o", default)]
    pub origin: Vec<String>,

    /// Call depth for the request; the root action is level 1.
    #[serde(rename = "l", default = "root_level")]
    pub level: u64,

    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,

    #[serde(rename = "F", default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<serde_json::Value>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn root_level() -> u64 {
    1
}

impl Default for TransportMeta {
    fn default() -> Self {
        Self {
            version: String::new(),
            id: String::new(),
            datetime: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            duration: 0,
            gateway: Vec::new(),
            origin: Vec::new(),
            level: root_level(),
            properties: None,
            fallbacks: None,
        }
    }
}

impl TransportMeta {
    pub fn internal_gateway(&self) -> &str {
        self.gateway.first().map(String::as_str).unwrap_or("")
    }

    pub fn public_gateway(&self) -> &str {
        self.gateway.get(1).map(String::as_str).unwrap_or("")
    }

    /// Set a userland property.
    pub fn set_property(&mut self, name: &str, value: &str) {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), value.to_string());
    }

    pub fn get_property(&self, name: &str) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|props| props.get(name))
            .map(String::as_str)
    }
}
