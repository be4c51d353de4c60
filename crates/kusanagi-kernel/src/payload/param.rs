//! Action parameters.
//!
//! Parameter values travel as dynamic values and MsgPack decoders are free
//! to widen integers to floats, so the typed getters coerce stringified and
//! float representations into the requested kind instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TYPE_NULL: &str = "null";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_INTEGER: &str = "integer";
pub const TYPE_FLOAT: &str = "float";
pub const TYPE_STRING: &str = "string";
pub const TYPE_BINARY: &str = "binary";
pub const TYPE_ARRAY: &str = "array";
pub const TYPE_OBJECT: &str = "object";

/// A single action parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Param {
    #[serde(rename = "n")]
    pub name: String,

    #[serde(rename = "v", default)]
    pub value: Value,

    #[serde(rename = "t", default = "default_type")]
    pub param_type: String,

    // Not on the wire: params decoded from a payload exist by definition,
    // stubs returned for missing names do not.
    #[serde(skip, default = "wire_exists")]
    pub exists: bool,
}

fn default_type() -> String {
    TYPE_STRING.to_string()
}

fn wire_exists() -> bool {
    true
}

impl Default for Param {
    fn default() -> Self {
        Self {
            name: String::new(),
            value: Value::Null,
            param_type: TYPE_NULL.to_string(),
            exists: false,
        }
    }
}

impl Param {
    /// Create a parameter, inferring the type from the value.
    pub fn new(name: &str, value: Value) -> Self {
        let param_type = type_of(&value).to_string();
        Self {
            name: name.to_string(),
            value,
            param_type,
            exists: true,
        }
    }

    /// Create a parameter with an explicit type name.
    ///
    /// Unknown type names fall back to the inferred type.
    pub fn with_type(name: &str, value: Value, param_type: &str) -> Self {
        let param_type = if is_valid_type(param_type) {
            param_type.to_string()
        } else {
            type_of(&value).to_string()
        };
        Self {
            name: name.to_string(),
            value,
            param_type,
            exists: true,
        }
    }

    /// Typed stub for a parameter that is not present in the request.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn param_type(&self) -> &str {
        &self.param_type
    }

    /// Whether the parameter was present in the request.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn as_bool(&self) -> bool {
        match &self.value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => s == "true" || s == "1",
            _ => false,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match &self.value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Value::String(s) => s
                .parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0),
            Value::Bool(b) => *b as i64,
            _ => 0,
        }
    }

    pub fn as_u64(&self) -> u64 {
        match &self.value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
                .unwrap_or(0),
            Value::String(s) => s
                .parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.max(0.0) as u64))
                .unwrap_or(0),
            Value::Bool(b) => *b as u64,
            _ => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match &self.value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
            Value::Bool(b) => *b as u8 as f64,
            _ => 0.0,
        }
    }

    pub fn as_str(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn as_array(&self) -> Vec<Value> {
        match &self.value {
            Value::Array(items) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn as_object(&self) -> serde_json::Map<String, Value> {
        match &self.value {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        }
    }
}

/// Infer the wire type name of a dynamic value.
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => TYPE_NULL,
        Value::Bool(_) => TYPE_BOOLEAN,
        Value::Number(n) if n.is_f64() => TYPE_FLOAT,
        Value::Number(_) => TYPE_INTEGER,
        Value::String(_) => TYPE_STRING,
        Value::Array(_) => TYPE_ARRAY,
        Value::Object(_) => TYPE_OBJECT,
    }
}

fn is_valid_type(name: &str) -> bool {
    matches!(
        name,
        TYPE_NULL
            | TYPE_BOOLEAN
            | TYPE_INTEGER
            | TYPE_FLOAT
            | TYPE_STRING
            | TYPE_BINARY
            | TYPE_ARRAY
            | TYPE_OBJECT
    )
}
