//! HTTP payloads.
//!
//! The gateway terminates HTTP; requests and responses arrive here already
//! decoded inside command arguments. Headers are stored verbatim and looked
//! up case-insensitively through their uppercase form.

use crate::payload::file::File;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type MultiMap = BTreeMap<String, Vec<String>>;

/// The HTTP request that entered the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpRequest {
    #[serde(rename = "v", default = "default_protocol")]
    pub version: String,

    #[serde(rename = "m", default)]
    pub method: String,

    #[serde(rename = "u", default)]
    pub url: String,

    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub query: Option<MultiMap>,

    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<MultiMap>,

    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<MultiMap>,

    #[serde(rename = "b", default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<File>>,
}

fn default_protocol() -> String {
    "1.1".to_string()
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self {
            version: default_protocol(),
            method: String::new(),
            url: String::new(),
            query: None,
            post_data: None,
            headers: None,
            body: String::new(),
            files: None,
        }
    }
}

impl HttpRequest {
    pub fn is_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_scheme(&self) -> String {
        reqwest::Url::parse(&self.url)
            .map(|u| u.scheme().to_string())
            .unwrap_or_default()
    }

    pub fn url_host(&self) -> String {
        reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn url_path(&self) -> String {
        reqwest::Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    }

    pub fn has_query_param(&self, name: &str) -> bool {
        self.query
            .as_ref()
            .map(|q| q.contains_key(name))
            .unwrap_or(false)
    }

    /// All values of a query parameter, or `default` when absent.
    pub fn query_param_array(&self, name: &str, default: Vec<String>) -> Vec<String> {
        self.query
            .as_ref()
            .and_then(|q| q.get(name).cloned())
            .unwrap_or(default)
    }

    /// First value of a query parameter, or `default` when absent.
    pub fn query_param(&self, name: &str, default: &str) -> String {
        self.query
            .as_ref()
            .and_then(|q| q.get(name))
            .and_then(|values| values.first().cloned())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn has_post_param(&self, name: &str) -> bool {
        self.post_data
            .as_ref()
            .map(|p| p.contains_key(name))
            .unwrap_or(false)
    }

    pub fn post_param_array(&self, name: &str, default: Vec<String>) -> Vec<String> {
        self.post_data
            .as_ref()
            .and_then(|p| p.get(name).cloned())
            .unwrap_or(default)
    }

    pub fn post_param(&self, name: &str, default: &str) -> String {
        self.post_data
            .as_ref()
            .and_then(|p| p.get(name))
            .and_then(|values| values.first().cloned())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn has_header(&self, name: &str) -> bool {
        lookup_header(self.headers.as_ref(), name).is_some()
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str, default: &str) -> String {
        lookup_header(self.headers.as_ref(), name)
            .and_then(|values| values.first().cloned())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn header_array(&self, name: &str, default: Vec<String>) -> Vec<String> {
        lookup_header(self.headers.as_ref(), name)
            .cloned()
            .unwrap_or(default)
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files
            .as_ref()
            .map(|files| files.iter().any(|f| f.name == name))
            .unwrap_or(false)
    }

    pub fn file(&self, name: &str) -> File {
        self.files
            .as_ref()
            .and_then(|files| files.iter().find(|f| f.name == name).cloned())
            .unwrap_or_else(|| File::empty(name))
    }

    pub fn files(&self) -> Vec<File> {
        self.files.clone().unwrap_or_default()
    }
}

/// The HTTP response a middleware shapes for the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpResponse {
    #[serde(rename = "v", default = "default_protocol")]
    pub version: String,

    #[serde(rename = "s", default = "default_status")]
    pub status: String,

    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<MultiMap>,

    #[serde(rename = "b", default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

fn default_status() -> String {
    "200 OK".to_string()
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            version: default_protocol(),
            status: default_status(),
            headers: None,
            body: String::new(),
        }
    }
}

impl HttpResponse {
    pub fn new(code: u16, text: &str) -> Self {
        Self {
            status: format!("{code} {text}"),
            ..Self::default()
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status
            .split_whitespace()
            .next()
            .and_then(|code| code.parse().ok())
            .unwrap_or(0)
    }

    pub fn status_text(&self) -> &str {
        self.status
            .split_once(' ')
            .map(|(_, text)| text)
            .unwrap_or("")
    }

    pub fn set_status(&mut self, code: u16, text: &str) {
        self.status = format!("{code} {text}");
    }

    pub fn has_header(&self, name: &str) -> bool {
        lookup_header(self.headers.as_ref(), name).is_some()
    }

    pub fn header(&self, name: &str, default: &str) -> String {
        lookup_header(self.headers.as_ref(), name)
            .and_then(|values| values.first().cloned())
            .unwrap_or_else(|| default.to_string())
    }

    /// Append a header value, keeping the name as given.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
    }
}

fn lookup_header<'a>(headers: Option<&'a MultiMap>, name: &str) -> Option<&'a Vec<String>> {
    let wanted = name.to_uppercase();
    headers?.iter().find_map(|(key, values)| {
        if key.to_uppercase() == wanted {
            Some(values)
        } else {
            None
        }
    })
}
