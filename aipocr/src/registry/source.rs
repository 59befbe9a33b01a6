use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_BASE_URL;
use crate::error::{OcrError, Result};

use super::ServiceType;

pub type EndpointTable = HashMap<ServiceType, String>;

/// Strategy that produces the endpoint URL for every service type.
pub trait UrlSource: Send + Sync {
    fn name(&self) -> &str;

    fn endpoints(&self) -> Result<EndpointTable>;
}

/// Hard-coded endpoint table rooted at a configurable API host.
#[derive(Debug, Clone)]
pub struct StaticTable {
    base_url: String,
}

impl StaticTable {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, service_type: ServiceType) -> String {
        format!("{}{}", self.base_url, service_type.path())
    }

    pub fn table(&self) -> EndpointTable {
        ServiceType::ALL
            .iter()
            .map(|t| (*t, self.url_for(*t)))
            .collect()
    }
}

impl Default for StaticTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlSource for StaticTable {
    fn name(&self) -> &str {
        "static"
    }

    fn endpoints(&self) -> Result<EndpointTable> {
        Ok(self.table())
    }
}

/// Endpoint discovery from a JSON manifest exported from the provider SDK.
///
/// The manifest maps SDK endpoint constant names to URLs, e.g.
/// `{"generalBasicUrl": "https://aip.baidubce.com/rest/2.0/ocr/v1/general_basic"}`.
/// Name-mangled keys such as `_AipOcr__generalBasicUrl` are accepted too.
/// Types the manifest does not mention are filled from `fallback`, so the
/// produced key set always matches [`StaticTable`].
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
    fallback: StaticTable,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>, fallback: StaticTable) -> Self {
        Self {
            path: path.into(),
            fallback,
        }
    }

    fn parse(&self, raw: &str) -> Result<EndpointTable> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(entries) = value else {
            return Err(OcrError::Config(format!(
                "endpoint manifest {} must be a JSON object",
                self.path.display()
            )));
        };

        let mut table = EndpointTable::new();
        for (key, url) in entries {
            let constant = key.rsplit("__").next().unwrap_or(&key);
            let Some(service_type) = ServiceType::ALL
                .iter()
                .copied()
                .find(|t| t.sdk_constant().eq_ignore_ascii_case(constant))
            else {
                debug!(key = %key, "Ignoring unknown endpoint constant in manifest");
                continue;
            };
            let Some(url) = url.as_str() else {
                return Err(OcrError::Config(format!(
                    "endpoint manifest entry {key} is not a string"
                )));
            };
            url::Url::parse(url)?;
            table.insert(service_type, url.to_string());
        }

        if table.is_empty() {
            return Err(OcrError::Config(format!(
                "endpoint manifest {} has no known endpoints",
                self.path.display()
            )));
        }

        let missing: Vec<_> = ServiceType::ALL
            .iter()
            .filter(|t| !table.contains_key(t))
            .copied()
            .collect();
        if !missing.is_empty() {
            warn!(
                count = missing.len(),
                "Endpoint manifest is incomplete, filling missing types from the static table"
            );
            for t in missing {
                table.insert(t, self.fallback.url_for(t));
            }
        }

        Ok(table)
    }
}

impl UrlSource for ManifestSource {
    fn name(&self) -> &str {
        "manifest"
    }

    fn endpoints(&self) -> Result<EndpointTable> {
        let raw = std::fs::read_to_string(&self.path)?;
        self.parse(&raw)
    }
}

/// Resolve endpoints from `preferred`, falling back to `fallback` when
/// discovery is unavailable or fails.
pub fn resolve_endpoints(preferred: Option<&dyn UrlSource>, fallback: &StaticTable) -> EndpointTable {
    if let Some(source) = preferred {
        match source.endpoints() {
            Ok(table) => {
                info!(source = source.name(), count = table.len(), "Endpoint table discovered");
                return table;
            }
            Err(e) => {
                warn!(
                    source = source.name(),
                    error = %e,
                    "Endpoint discovery failed, using static table"
                );
            }
        }
    }

    fallback.table()
}
