//! User facing API façades.
//!
//! Every request builds exactly one façade — [`request::Request`],
//! [`response::Response`] or [`action::Action`] — around a shared [`Api`]
//! carrying the component identity, the schema snapshot pinned for the
//! request and the frozen resource registry.

pub mod action;
pub mod request;
pub mod response;

use crate::component::{ComponentInfo, Resource};
use crate::error::SdkResult;
use kusanagi_kernel::codec;
use kusanagi_kernel::schema::{SchemaSnapshot, ServiceIdentity, ServiceSchema};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default execution timeout for run-time calls, in milliseconds.
pub const EXECUTION_TIMEOUT: u64 = 30_000;

/// Component handle shared by all façades of a request.
#[derive(Clone)]
pub struct Api {
    pub(crate) info: Arc<ComponentInfo>,
    pub(crate) schemas: SchemaSnapshot,
    pub(crate) resources: Arc<BTreeMap<String, Resource>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) timeout_ms: u64,
}

impl Api {
    pub fn get_name(&self) -> &str {
        &self.info.name
    }

    pub fn get_version(&self) -> &str {
        &self.info.version
    }

    pub fn get_framework_version(&self) -> &str {
        &self.info.framework_version
    }

    pub fn is_debug(&self) -> bool {
        self.info.debug
    }

    pub fn get_variables(&self) -> &BTreeMap<String, String> {
        &self.info.variables
    }

    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.info.variables.get(name).map(String::as_str)
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn get_resource(&self, name: &str) -> Option<Resource> {
        self.resources.get(name).cloned()
    }

    /// All services known to the current schema mappings.
    pub fn get_services(&self) -> Vec<ServiceIdentity> {
        self.schemas.services()
    }

    pub fn get_service_schema(&self, service: &str, version: &str) -> SdkResult<&ServiceSchema> {
        Ok(self.schemas.resolve(service, version)?)
    }

    /// Log a userland value at a syslog level.
    ///
    /// Strings log verbatim; any other value renders as compact JSON.
    pub fn log(&self, value: &Value, level: u8) {
        let text = match value {
            Value::String(text) => text.clone(),
            other => codec::to_json(other).unwrap_or_else(|_| other.to_string()),
        };
        match level {
            0..=3 => error!("{text}"),
            4 => warn!("{text}"),
            5 | 6 => info!("{text}"),
            _ => debug!("{text}"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use kusanagi_runtime::cli::ComponentKind;

    #[test]
    fn test_component_identity() {
        let api = testing::api(ComponentKind::Service, "users", "1.0.0");
        assert_eq!(api.get_name(), "users");
        assert_eq!(api.get_version(), "1.0.0");
        assert_eq!(api.get_framework_version(), "2.0.0");
        assert!(!api.is_debug());
    }

    #[test]
    fn test_missing_resource() {
        let api = testing::api(ComponentKind::Service, "users", "1.0.0");
        assert!(!api.has_resource("db"));
        assert!(api.get_resource("db").is_none());
    }

    #[test]
    fn test_empty_snapshot_has_no_services() {
        let api = testing::api(ComponentKind::Service, "users", "1.0.0");
        assert!(api.get_services().is_empty());
        assert!(api.get_service_schema("users", "1.0.0").is_err());
    }
}
