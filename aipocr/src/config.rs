use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::ocr::{ResultSeparator, SigningMode};

pub const DEFAULT_BASE_URL: &str = "https://aip.baidubce.com";
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/2.0/token";

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) if val.trim().is_empty() => None,
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub ocr: OcrConfig,
    pub request: RequestConfig,
}

#[derive(Clone, Deserialize)]
pub struct CredentialsConfig {
    pub app_id: String,
    pub api_key: String,
    pub secret_key: String,
    pub access_token: Option<String>,
}

// Keep secrets out of logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("app_id", &self.app_id)
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub service_type: String,
    pub separator: ResultSeparator,
    pub region: Option<String>,
    pub base_url: String,
    pub endpoint_manifest: Option<String>,
    pub token_url: String,
    pub signing: SigningMode,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
}

/// Per-call request lifecycle settings used by the executor.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    pub timeout_secs: u64,
    pub delay_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            delay_ms: 0,
            max_retries: 3,
            retry_delay_ms: 0,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            service_type: "GENERAL_BASIC".to_string(),
            separator: ResultSeparator::Join,
            region: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_manifest: None,
            token_url: format!("{DEFAULT_BASE_URL}{DEFAULT_TOKEN_PATH}"),
            signing: SigningMode::PerRequest,
            max_image_dimension: 4096,
            min_image_dimension: 15,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let base_url = env::var("OCR_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            credentials: CredentialsConfig {
                app_id: env::var("AIP_APP_ID").unwrap_or_default(),
                api_key: env::var("AIP_API_KEY").unwrap_or_default(),
                secret_key: env::var("AIP_SECRET_KEY").unwrap_or_default(),
                access_token: parse_env_opt("AIP_ACCESS_TOKEN"),
            },
            ocr: OcrConfig {
                service_type: env::var("OCR_SERVICE_TYPE")
                    .unwrap_or_else(|_| "GENERAL_BASIC".to_string()),
                separator: parse_env_or("OCR_RESULT_SEPARATOR", ResultSeparator::Join),
                region: parse_env_opt("OCR_REGION"),
                endpoint_manifest: parse_env_opt("OCR_ENDPOINT_MANIFEST"),
                token_url: env::var("OCR_TOKEN_URL")
                    .unwrap_or_else(|_| format!("{base_url}{DEFAULT_TOKEN_PATH}")),
                base_url,
                signing: parse_env_or("OCR_SIGNING", SigningMode::PerRequest),
                max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", 4096),
                min_image_dimension: parse_env_or("OCR_MIN_DIMENSION", 15),
            },
            request: RequestConfig {
                timeout_secs: parse_env_or("OCR_TIMEOUT", 10),
                delay_ms: parse_env_or("OCR_DELAY_MS", 0),
                max_retries: parse_env_or("OCR_RETRIES", 3),
                retry_delay_ms: parse_env_or("OCR_RETRY_DELAY_MS", 0),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "AIP_APP_ID",
        "AIP_API_KEY",
        "AIP_SECRET_KEY",
        "AIP_ACCESS_TOKEN",
        "OCR_SERVICE_TYPE",
        "OCR_RESULT_SEPARATOR",
        "OCR_REGION",
        "OCR_BASE_URL",
        "OCR_TOKEN_URL",
        "OCR_SIGNING",
        "OCR_TIMEOUT",
        "OCR_RETRIES",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();

        let config = Config::default();
        assert_eq!(config.ocr.service_type, "GENERAL_BASIC");
        assert_eq!(config.ocr.separator, ResultSeparator::Join);
        assert_eq!(config.ocr.signing, SigningMode::PerRequest);
        assert_eq!(config.ocr.base_url, "https://aip.baidubce.com");
        assert_eq!(config.ocr.token_url, "https://aip.baidubce.com/oauth/2.0/token");
        assert!(config.ocr.region.is_none());
        assert!(config.credentials.access_token.is_none());
        assert_eq!(config.request.timeout_secs, 10);
        assert_eq!(config.request.max_retries, 3);
        assert_eq!(config.request.delay_ms, 0);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_env();
        std::env::set_var("AIP_API_KEY", "ak");
        std::env::set_var("AIP_SECRET_KEY", "sk");
        std::env::set_var("OCR_SERVICE_TYPE", "ACCURATE_BASIC");
        std::env::set_var("OCR_RESULT_SEPARATOR", "row");
        std::env::set_var("OCR_REGION", "0,0,0.5,0.5");
        std::env::set_var("OCR_BASE_URL", "http://127.0.0.1:9000/");
        std::env::set_var("OCR_SIGNING", "cached");
        std::env::set_var("OCR_TIMEOUT", "30");

        let config = Config::from_env();
        assert_eq!(config.credentials.api_key, "ak");
        assert_eq!(config.credentials.secret_key, "sk");
        assert_eq!(config.ocr.service_type, "ACCURATE_BASIC");
        assert_eq!(config.ocr.separator, ResultSeparator::ByRow);
        assert_eq!(config.ocr.region.as_deref(), Some("0,0,0.5,0.5"));
        assert_eq!(config.ocr.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.ocr.token_url, "http://127.0.0.1:9000/oauth/2.0/token");
        assert_eq!(config.ocr.signing, SigningMode::Cached);
        assert_eq!(config.request.timeout(), Duration::from_secs(30));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_numeric_falls_back_to_default() {
        clear_env();
        std::env::set_var("OCR_RETRIES", "many");

        let config = Config::default();
        assert_eq!(config.request.max_retries, 3);

        clear_env();
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = CredentialsConfig {
            app_id: "1".to_string(),
            api_key: "ak".to_string(),
            secret_key: "super-secret".to_string(),
            access_token: Some("token".to_string()),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("token\""));
    }
}
