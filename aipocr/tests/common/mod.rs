#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use aipocr::config::{Config, CredentialsConfig, OcrConfig, RequestConfig};
use aipocr::registry::ServiceRegistry;

static INIT: Once = Once::new();

pub const TEST_TOKEN: &str = "test-token";
pub const GENERAL_BASIC_PATH: &str = "/rest/2.0/ocr/v1/general_basic";

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Config pointing every endpoint at `base_url`, with fast retries.
pub fn create_test_config(base_url: &str) -> Config {
    Config {
        credentials: CredentialsConfig {
            app_id: "10000".to_string(),
            api_key: "test-api-key".to_string(),
            secret_key: "test-secret-key".to_string(),
            access_token: Some(TEST_TOKEN.to_string()),
        },
        ocr: OcrConfig {
            base_url: base_url.to_string(),
            token_url: format!("{base_url}/oauth/2.0/token"),
            ..OcrConfig::default()
        },
        request: RequestConfig {
            timeout_secs: 2,
            max_retries: 2,
            ..RequestConfig::default()
        },
    }
}

pub fn create_test_registry(config: &Config) -> Arc<ServiceRegistry> {
    Arc::new(ServiceRegistry::from_config(&config.ocr))
}

/// Left half black, right half white, so crops are distinguishable.
pub fn test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    }))
}

/// Write a PNG of the given size into `dir` and return its path.
pub fn create_test_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    test_image(width, height)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap_or_else(|e| panic!("Failed to write test image '{name}': {e}"));
    path
}

/// Decode the url-encoded form body of a captured request.
pub fn form_fields(body: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

pub fn form_field(body: &[u8], key: &str) -> Option<String> {
    form_fields(body)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

pub fn words_body(lines: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "log_id": 1,
        "words_result_num": lines.len(),
        "words_result": lines.iter().map(|w| serde_json::json!({"words": w})).collect::<Vec<_>>()
    })
}
