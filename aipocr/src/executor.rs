//! Request lifecycle: pre-send delay, per-attempt timeout, response
//! validation and bounded retry around one logical OCR call.
//!
//! Each attempt rebuilds the request from the service, so a retry never
//! reuses a half-mutated payload or a stale signature. Input errors (bad
//! region, unsupported or out-of-bounds image) are returned straight away.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::config::RequestConfig;
use crate::error::{OcrError, Result};
use crate::ocr::{ImageSource, OcrService};
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};

const MAX_ERROR_BODY: usize = 512;

/// Accepts or rejects a success-status response. A rejection is retried.
#[async_trait]
pub trait ResponseValidator: Send + Sync {
    async fn validate(&self, response: &HttpResponse) -> bool;
}

/// Adapts a plain predicate.
pub struct SyncValidator<F>(pub F);

#[async_trait]
impl<F> ResponseValidator for SyncValidator<F>
where
    F: Fn(&HttpResponse) -> bool + Send + Sync,
{
    async fn validate(&self, response: &HttpResponse) -> bool {
        (self.0)(response)
    }
}

/// Adapts a function returning a boxed future.
pub struct AsyncValidator<F>(pub F);

#[async_trait]
impl<F> ResponseValidator for AsyncValidator<F>
where
    F: for<'a> Fn(&'a HttpResponse) -> BoxFuture<'a, bool> + Send + Sync,
{
    async fn validate(&self, response: &HttpResponse) -> bool {
        (self.0)(response).await
    }
}

pub struct RequestExecutor<T = ReqwestTransport> {
    transport: T,
    config: RequestConfig,
    validator: Option<Arc<dyn ResponseValidator>>,
}

impl<T: HttpTransport> RequestExecutor<T> {
    pub fn new(transport: T, config: RequestConfig) -> Self {
        Self {
            transport,
            config,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Run one logical call and return the decoded text.
    pub async fn execute<S: OcrService>(&self, service: &mut S, source: &ImageSource) -> Result<String> {
        let response = self.execute_raw(service, source).await?;
        Ok(service.decode_response(&response.body))
    }

    /// Run one logical call and return the accepted response unchanged.
    pub async fn execute_raw<S: OcrService>(
        &self,
        service: &mut S,
        source: &ImageSource,
    ) -> Result<HttpResponse> {
        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.attempt(service, source).await {
                Ok(response) => {
                    debug!(source = %source, attempt, "OCR request accepted");
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    error!(source = %source, error = %e, "OCR request failed, not retrying");
                    return Err(e.for_source(source.id()));
                }
                Err(e) if attempt >= max_attempts => {
                    error!(source = %source, attempts = attempt, error = %e, "OCR request retries exhausted");
                    return Err(OcrError::RetriesExhausted {
                        source_id: source.id(),
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        source = %source,
                        attempt,
                        remaining = max_attempts - attempt,
                        error = %e,
                        "OCR attempt failed (retryable)"
                    );
                    let retry_delay = self.config.retry_delay();
                    if !retry_delay.is_zero() {
                        sleep(retry_delay).await;
                    }
                }
            }
        }
    }

    async fn attempt<S: OcrService>(&self, service: &mut S, source: &ImageSource) -> Result<HttpResponse> {
        let delay = self.config.delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let request = service.build_request(source)?;

        let limit = self.config.timeout();
        let response = match timeout(limit, self.transport.send(&request, limit)).await {
            Ok(result) => result?,
            Err(_) => return Err(OcrError::Timeout(limit)),
        };

        if !response.is_success() {
            let mut body = response.text();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(OcrError::Status {
                status: response.status,
                body,
            });
        }

        if let Some(validator) = &self.validator {
            if !validator.validate(&response).await {
                return Err(OcrError::ValidationRejected {
                    status: response.status,
                });
            }
        }

        Ok(response)
    }
}
