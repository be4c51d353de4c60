//! Service schemas shipped by the gateway.
//!
//! Mappings arrive pre-computed as `service → version → schema` and drive
//! the policy checks on every schema-backed action mutator: which calls an
//! action may make, whether it returns a value, and whether the service
//! can hold local files.

pub mod registry;

pub use registry::{SchemaRegistry, SchemaSnapshot, ServiceIdentity};

use crate::codec::CodecError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while resolving schemas.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("Cannot resolve schema for Service: \"{service}\" ({version})")]
    CannotResolve { service: String, version: String },

    #[error("Cannot resolve schema for action: \"{action}\" of Service: \"{service}\" ({version})")]
    ActionNotFound {
        service: String,
        version: String,
        action: String,
    },

    #[error("Schema mapping decode failed: {0}")]
    Decode(#[from] CodecError),
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema of a service version.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServiceSchema {
    #[serde(rename = "a", default)]
    pub address: String,

    /// Whether the service exposes a file server for local files.
    #[serde(rename = "f", default)]
    pub file_server: bool,

    #[serde(rename = "ac", default)]
    pub actions: BTreeMap<String, ActionSchema>,

    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSchema>,
}

impl ServiceSchema {
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn action(
        &self,
        service: &str,
        version: &str,
        name: &str,
    ) -> SchemaResult<&ActionSchema> {
        self.actions
            .get(name)
            .ok_or_else(|| SchemaError::ActionNotFound {
                service: service.to_string(),
                version: version.to_string(),
                action: name.to_string(),
            })
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }
}

/// HTTP exposure of a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSchema {
    #[serde(rename = "g", default = "default_true")]
    pub gateway: bool,

    #[serde(rename = "b", default)]
    pub base_path: String,
}

fn default_true() -> bool {
    true
}

/// Schema of a single action.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ActionSchema {
    #[serde(rename = "x", default, skip_serializing_if = "is_zero")]
    pub timeout: u64,

    #[serde(rename = "e", default, skip_serializing_if = "String::is_empty")]
    pub entity_path: String,

    #[serde(rename = "d", default)]
    pub deprecated: bool,

    /// Whether the action returns collections instead of entities.
    #[serde(rename = "c", default)]
    pub collection: bool,

    /// Declared `[service, version, action]` run-time call triples.
    #[serde(rename = "C", default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<Vec<String>>,

    #[serde(rename = "dc", default, skip_serializing_if = "Vec::is_empty")]
    pub deferred_calls: Vec<Vec<String>>,

    /// Declared `[address, service, version, action]` remote call entries.
    #[serde(rename = "rc", default, skip_serializing_if = "Vec::is_empty")]
    pub remote_calls: Vec<Vec<String>>,

    #[serde(rename = "p", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamSchema>,

    #[serde(rename = "f", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, FileSchema>,

    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Value>,

    #[serde(rename = "rv", default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<ReturnSchema>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl ActionSchema {
    pub fn has_call(&self, service: &str, version: &str, action: &str) -> bool {
        triple_declared(&self.calls, service, version, action)
    }

    pub fn has_defer_call(&self, service: &str, version: &str, action: &str) -> bool {
        triple_declared(&self.deferred_calls, service, version, action)
    }

    pub fn has_remote_call(
        &self,
        address: &str,
        service: &str,
        version: &str,
        action: &str,
    ) -> bool {
        self.remote_calls.iter().any(|entry| {
            entry.len() == 4
                && entry[0] == address
                && entry[1] == service
                && entry[2] == version
                && entry[3] == action
        })
    }

    pub fn has_return(&self) -> bool {
        self.return_value.is_some()
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_value.as_ref().map(|r| r.return_type.as_str())
    }

    /// Zero value for the declared return type; `Null` when none declared.
    pub fn default_return_value(&self) -> Value {
        match self.return_type() {
            Some(crate::payload::param::TYPE_BOOLEAN) => Value::Bool(false),
            Some(crate::payload::param::TYPE_INTEGER) => Value::from(0),
            Some(crate::payload::param::TYPE_FLOAT) => Value::from(0.0),
            Some(crate::payload::param::TYPE_STRING) => Value::String(String::new()),
            Some(crate::payload::param::TYPE_ARRAY) => Value::Array(Vec::new()),
            Some(crate::payload::param::TYPE_OBJECT) => Value::Object(serde_json::Map::new()),
            _ => Value::Null,
        }
    }
}

fn triple_declared(entries: &[Vec<String>], service: &str, version: &str, action: &str) -> bool {
    entries.iter().any(|entry| {
        entry.len() == 3 && entry[0] == service && entry[1] == version && entry[2] == action
    })
}

/// Schema of an action parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSchema {
    #[serde(rename = "t", default = "default_param_type")]
    pub param_type: String,

    #[serde(rename = "r", default)]
    pub required: bool,

    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

fn default_param_type() -> String {
    crate::payload::param::TYPE_STRING.to_string()
}

/// Schema of an action file parameter.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileSchema {
    #[serde(rename = "m", default)]
    pub mime: String,

    #[serde(rename = "r", default)]
    pub required: bool,
}

/// Declared return value of an action.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReturnSchema {
    #[serde(rename = "t", default)]
    pub return_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action_schema() -> ActionSchema {
        ActionSchema {
            calls: vec![vec!["posts".into(), "1.0.0".into(), "list".into()]],
            remote_calls: vec![vec![
                "ktp://87.65.43.21:4321".into(),
                "users".into(),
                "1.0.0".into(),
                "find".into(),
            ]],
            return_value: Some(ReturnSchema {
                return_type: "integer".into(),
            }),
            ..ActionSchema::default()
        }
    }

    #[test]
    fn test_call_declarations() {
        let schema = action_schema();
        assert!(schema.has_call("posts", "1.0.0", "list"));
        assert!(!schema.has_call("posts", "2.0.0", "list"));
        assert!(!schema.has_defer_call("posts", "1.0.0", "list"));
        assert!(schema.has_remote_call("ktp://87.65.43.21:4321", "users", "1.0.0", "find"));
    }

    #[test]
    fn test_default_return_value() {
        let schema = action_schema();
        assert!(schema.has_return());
        assert_eq!(schema.default_return_value(), Value::from(0));

        let untyped = ActionSchema::default();
        assert_eq!(untyped.default_return_value(), Value::Null);
    }

    #[test]
    fn test_action_lookup_error() {
        let schema = ServiceSchema::default();
        let error = schema.action("users", "1.0.0", "list").unwrap_err();
        assert!(error.to_string().contains("\"list\""));
        assert!(error.to_string().contains("\"users\""));
    }
}
