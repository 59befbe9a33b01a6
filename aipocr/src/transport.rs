use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use crate::error::{OcrError, Result};
use crate::ocr::PreparedRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one prepared request. Implementations must honor `timeout` for the
/// whole exchange.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &PreparedRequest, timeout: Duration) -> Result<HttpResponse>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| OcrError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &PreparedRequest, timeout: Duration) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| OcrError::Config(format!("invalid HTTP method {}: {e}", request.method)))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(timeout)
            .query(&request.query);

        for (name, value) in &request.headers {
            // reqwest derives Host from the URL.
            if name.eq_ignore_ascii_case("host") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        // Headers first: `form` only sets Content-Type when it is missing.
        builder = builder.form(&request.form);

        debug!(url = %request.url, source = %request.source_id, "Sending OCR request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                OcrError::Timeout(timeout)
            } else {
                OcrError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| OcrError::Transport(format!("Failed to read response body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
