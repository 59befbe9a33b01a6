use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Config, CredentialsConfig};
use crate::error::{OcrError, Result};
use crate::registry::{Payload, ServiceRegistry, ServiceType};

use super::preprocessing::{load_and_prepare, ImageLimits, ImageSource};
use super::response::{decode_response, ResultSeparator};
use super::signer::{BceSigner, Clock, SignedHeaders, SigningMode};

pub const SDK_NAME: &str = "rust";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Everything the transport needs to send one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub form: Payload,
    pub source_id: String,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A provider-specific request builder and response decoder.
///
/// `build_request` is called once per attempt and may mutate the service's
/// working payload, which is why it takes `&mut self`.
pub trait OcrService: Send {
    fn build_request(&mut self, source: &ImageSource) -> Result<PreparedRequest>;

    fn decode_response(&self, body: &[u8]) -> String;
}

/// Baidu AIP OCR over the `bce-auth-v1` signed form API.
///
/// Cheap to clone: the registry is shared, everything else is small. Give
/// each concurrent caller its own clone.
#[derive(Clone)]
pub struct BaiduOcrService {
    registry: Arc<ServiceRegistry>,
    service_type: ServiceType,
    service_url: String,
    payload: Payload,
    region: Option<String>,
    limits: ImageLimits,
    signer: BceSigner,
    signing: SigningMode,
    cached_headers: Option<SignedHeaders>,
    access_token: Option<String>,
    separator: ResultSeparator,
}

impl fmt::Debug for BaiduOcrService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaiduOcrService")
            .field("service_type", &self.service_type)
            .field("service_url", &self.service_url)
            .field("payload_keys", &self.payload.keys().collect::<Vec<_>>())
            .field("region", &self.region)
            .field("signing", &self.signing)
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for BaiduOcrService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Baidu-Ocr<{}, {}>", self.service_url, self.service_type)
    }
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(OcrError::InvalidPayload(format!(
            "field '{key}' must be a string, number or boolean, got {other}"
        ))),
    }
}

impl BaiduOcrService {
    /// Create a service for `type_id`. Credentials are checked here, so a
    /// bad key surfaces at construction rather than on the first request.
    pub fn new(
        credentials: &CredentialsConfig,
        registry: Arc<ServiceRegistry>,
        type_id: &str,
    ) -> Result<Self> {
        let service_type: ServiceType = type_id.parse()?;
        let entry = registry.lookup(service_type)?;
        let signer = BceSigner::new(&credentials.api_key, &credentials.secret_key)?;

        Ok(Self {
            registry,
            service_type,
            service_url: entry.url,
            payload: entry.default_payload,
            region: None,
            limits: ImageLimits::default(),
            signer,
            signing: SigningMode::PerRequest,
            cached_headers: None,
            access_token: credentials.access_token.clone(),
            separator: ResultSeparator::default(),
        })
    }

    pub fn from_config(config: &Config, registry: Arc<ServiceRegistry>) -> Result<Self> {
        let service = Self::new(&config.credentials, registry, &config.ocr.service_type)?
            .with_separator(config.ocr.separator)
            .with_region(config.ocr.region.clone())
            .with_limits(ImageLimits::from(&config.ocr))
            .with_signing(config.ocr.signing)?;

        info!(service = %service, signing = %service.signing, "OCR service ready");
        Ok(service)
    }

    pub fn with_separator(mut self, separator: ResultSeparator) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.set_region(region);
        self
    }

    pub fn with_limits(mut self, limits: ImageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the signer clock. Cached headers are recomputed with it.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Result<Self> {
        self.signer = self.signer.with_clock(clock);
        self.refresh_cached_headers()?;
        Ok(self)
    }

    pub fn with_signing(mut self, mode: SigningMode) -> Result<Self> {
        self.signing = mode;
        self.refresh_cached_headers()?;
        Ok(self)
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Set or clear the region applied to local images. Blank specs clear it.
    pub fn set_region(&mut self, region: Option<String>) {
        self.region = region.filter(|r| !r.trim().is_empty());
    }

    /// Shallow-merge `overrides` into the working payload.
    ///
    /// `overrides` must be a JSON object of scalars; nothing is merged if
    /// any field is invalid.
    pub fn set_payload(&mut self, overrides: &Value) -> Result<()> {
        let Value::Object(fields) = overrides else {
            return Err(OcrError::InvalidPayload(format!(
                "expected a JSON object, got {overrides}"
            )));
        };

        let converted = fields
            .iter()
            .map(|(k, v)| scalar_to_string(k, v).map(|s| (k.clone(), s)))
            .collect::<Result<Vec<_>>>()?;

        self.payload.extend(converted);
        Ok(())
    }

    /// Merge `partial` into the shared default payload of this service's
    /// type. Every service built from the same registry sees the change on
    /// its next construction or type switch.
    pub fn update_default_payload(&self, partial: &Payload) -> Result<()> {
        self.registry.update_default_payload(self.service_type, partial)
    }

    /// Switch to another service type. On failure the service, payload
    /// included, is left as it was.
    pub fn set_service_type(&mut self, type_id: &str) -> Result<()> {
        let service_type: ServiceType = type_id.parse()?;
        let entry = self.registry.lookup(service_type)?;

        let previous = (
            self.service_type,
            std::mem::replace(&mut self.service_url, entry.url),
            std::mem::replace(&mut self.payload, entry.default_payload),
        );
        self.service_type = service_type;

        if let Err(e) = self.refresh_cached_headers() {
            self.service_type = previous.0;
            self.service_url = previous.1;
            self.payload = previous.2;
            return Err(e);
        }
        debug!(service = %self, "Service type switched");
        Ok(())
    }

    fn refresh_cached_headers(&mut self) -> Result<()> {
        self.cached_headers = match self.signing {
            SigningMode::Cached => Some(self.sign()?),
            SigningMode::PerRequest => None,
        };
        Ok(())
    }

    fn sign(&self) -> Result<SignedHeaders> {
        self.signer
            .sign("POST", &self.service_url, &Default::default(), &[])
    }

    fn auth_headers(&self) -> Result<SignedHeaders> {
        match (&self.signing, &self.cached_headers) {
            (SigningMode::Cached, Some(cached)) => Ok(cached.clone()),
            _ => self.sign(),
        }
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(3);
        if let Some(token) = &self.access_token {
            query.push(("access_token".to_string(), token.clone()));
        }
        query.push(("aipSdk".to_string(), SDK_NAME.to_string()));
        query.push(("aipVersion".to_string(), SDK_VERSION.to_string()));
        query
    }

    fn resolve_image_source(&mut self, source: &ImageSource) -> Result<()> {
        match source {
            ImageSource::Url(url) => {
                if url.trim().to_ascii_lowercase().starts_with("https://") {
                    return Err(OcrError::UnsupportedRemoteScheme(url.clone()));
                }
                self.payload.remove("image");
                self.payload.insert("url".to_string(), url.clone());
            }
            local => {
                let image = load_and_prepare(local, self.region.as_deref(), self.limits)?;
                self.payload.remove("url");
                self.payload.insert("image".to_string(), image);
            }
        }
        Ok(())
    }
}

impl OcrService for BaiduOcrService {
    fn build_request(&mut self, source: &ImageSource) -> Result<PreparedRequest> {
        self.resolve_image_source(source)?;

        let signed = self.auth_headers()?;
        let mut headers = signed.headers;
        headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));

        Ok(PreparedRequest {
            method: "POST".to_string(),
            url: self.service_url.clone(),
            headers,
            query: self.query(),
            form: self.payload.clone(),
            source_id: source.id(),
        })
    }

    fn decode_response(&self, body: &[u8]) -> String {
        decode_response(body, self.separator)
    }
}
