//! Thread-safe schema mapping registry.
//!
//! The registry is read-mostly: the server reactor replaces the whole map
//! when the gateway ships new mappings, while concurrent request
//! processors read through cheap snapshots. A snapshot pins one atomic
//! view of the mappings for the lifetime of a request.

use crate::codec;
use crate::schema::{SchemaError, SchemaResult, ServiceSchema};
use crate::version::Version;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

type SchemaMap = BTreeMap<String, BTreeMap<String, ServiceSchema>>;

/// A service name and version pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
}

/// Registry of per-service-version schemas, replaced atomically on update.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    inner: Arc<RwLock<Arc<SchemaMap>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole mapping with a MsgPack encoded one.
    pub fn update(&self, bytes: &[u8]) -> SchemaResult<()> {
        let mappings: SchemaMap = codec::unpack(bytes)?;
        tracing::debug!("Schema mappings updated for {} service(s)", mappings.len());
        *self.inner.write() = Arc::new(mappings);
        Ok(())
    }

    /// A consistent view of the current mappings.
    pub fn snapshot(&self) -> SchemaSnapshot {
        SchemaSnapshot {
            mappings: self.inner.read().clone(),
        }
    }
}

/// One atomic view of the schema mappings.
#[derive(Clone, Default)]
pub struct SchemaSnapshot {
    mappings: Arc<SchemaMap>,
}

impl SchemaSnapshot {
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Resolve the schema for a service version.
    ///
    /// Exact matches win; otherwise the version is treated as a pattern
    /// and resolved against the known versions of the service.
    pub fn resolve(&self, service: &str, version: &str) -> SchemaResult<&ServiceSchema> {
        let not_found = || SchemaError::CannotResolve {
            service: service.to_string(),
            version: version.to_string(),
        };

        let versions = self.mappings.get(service).ok_or_else(not_found)?;
        if let Some(schema) = versions.get(version) {
            return Ok(schema);
        }

        let known: Vec<&str> = versions.keys().map(String::as_str).collect();
        let resolved = Version::new(version).resolve(&known).ok_or_else(not_found)?;
        versions.get(&resolved).ok_or_else(not_found)
    }

    /// All `{name, version}` pairs in the current mappings.
    pub fn services(&self) -> Vec<ServiceIdentity> {
        self.mappings
            .iter()
            .flat_map(|(name, versions)| {
                versions.keys().map(move |version| ServiceIdentity {
                    name: name.clone(),
                    version: version.clone(),
                })
            })
            .collect()
    }
}
