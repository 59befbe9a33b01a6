//! Service registry
//!
//! Maps every [`ServiceType`] to its endpoint URL and default request
//! payload. The table is built once at start from a [`UrlSource`] and then
//! shared by `Arc` between every service instance that uses it.
//!
//! Default payloads can be updated at runtime with
//! [`ServiceRegistry::update_default_payload`]. The update is visible to every
//! holder of the registry, so the table sits behind a read/write lock.

mod service_type;
mod source;

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{OcrError, Result};

pub use service_type::ServiceType;
pub use source::{resolve_endpoints, EndpointTable, ManifestSource, StaticTable, UrlSource};

/// Flat form-field map sent as the request body.
pub type Payload = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub url: String,
    pub default_payload: Payload,
}

#[derive(Debug)]
pub struct ServiceRegistry {
    entries: RwLock<HashMap<ServiceType, ServiceConfig>>,
}

fn default_payload_for(service_type: ServiceType) -> Payload {
    match service_type {
        ServiceType::GeneralBasic | ServiceType::General => [
            ("language_type", "CHN_ENG"),
            ("detect_direction", "true"),
            ("detect_language", "true"),
            ("probability", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
        _ => Payload::new(),
    }
}

impl ServiceRegistry {
    pub fn new(preferred: Option<&dyn UrlSource>, fallback: &StaticTable) -> Self {
        let endpoints = resolve_endpoints(preferred, fallback);
        Self::from_endpoints(endpoints)
    }

    pub fn with_static_table() -> Self {
        Self::from_endpoints(StaticTable::new().table())
    }

    /// Build the registry described by the configuration: manifest discovery
    /// when `endpoint_manifest` is set, the static table rooted at `base_url`
    /// otherwise.
    pub fn from_config(config: &OcrConfig) -> Self {
        let fallback = StaticTable::with_base_url(&config.base_url);
        match &config.endpoint_manifest {
            Some(path) => {
                let manifest = ManifestSource::new(path, fallback.clone());
                Self::new(Some(&manifest), &fallback)
            }
            None => Self::new(None, &fallback),
        }
    }

    fn from_endpoints(endpoints: EndpointTable) -> Self {
        let entries = endpoints
            .into_iter()
            .map(|(service_type, url)| {
                (
                    service_type,
                    ServiceConfig {
                        url,
                        default_payload: default_payload_for(service_type),
                    },
                )
            })
            .collect();

        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn lookup(&self, service_type: ServiceType) -> Result<ServiceConfig> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&service_type)
            .cloned()
            .ok_or_else(|| OcrError::UnknownServiceType(service_type.to_string()))
    }

    pub fn lookup_str(&self, type_id: &str) -> Result<ServiceConfig> {
        let service_type: ServiceType = type_id.parse()?;
        self.lookup(service_type)
    }

    /// Shallow-merge `partial` into the stored default payload of
    /// `service_type`. Later lookups observe the merged payload.
    pub fn update_default_payload(&self, service_type: ServiceType, partial: &Payload) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .get_mut(&service_type)
            .ok_or_else(|| OcrError::UnknownServiceType(service_type.to_string()))?;

        for (key, value) in partial {
            entry.default_payload.insert(key.clone(), value.clone());
        }
        debug!(
            service_type = %service_type,
            keys = partial.len(),
            "Default payload updated"
        );
        Ok(())
    }

    pub fn service_types(&self) -> Vec<ServiceType> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut types: Vec<_> = entries.keys().copied().collect();
        types.sort();
        types
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::with_static_table()
    }
}
