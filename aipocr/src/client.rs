use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::ocr::{BaiduOcrService, ImageSource, TokenClient};
use crate::registry::ServiceRegistry;
use crate::transport::{HttpTransport, ReqwestTransport};

/// A service paired with an executor: one call recognizes one image.
pub struct OcrClient<T = ReqwestTransport> {
    service: BaiduOcrService,
    executor: RequestExecutor<T>,
}

impl OcrClient<ReqwestTransport> {
    /// Build a client from configuration, fetching an access token when
    /// none is configured.
    pub async fn connect(config: &Config, registry: Arc<ServiceRegistry>) -> Result<Self> {
        let mut service = BaiduOcrService::from_config(config, registry)?;

        if service.access_token().is_none() {
            info!("No access token configured, requesting one");
            let token = TokenClient::from_config(config)?.fetch().await?;
            service.set_access_token(token.access_token);
        }

        let executor = RequestExecutor::new(ReqwestTransport::new()?, config.request.clone());
        Ok(Self::new(service, executor))
    }
}

impl<T: HttpTransport> OcrClient<T> {
    pub fn new(service: BaiduOcrService, executor: RequestExecutor<T>) -> Self {
        Self { service, executor }
    }

    pub fn service(&self) -> &BaiduOcrService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut BaiduOcrService {
        &mut self.service
    }

    /// Recognize a path or `http://` link and return the joined text.
    pub async fn recognize(&mut self, source: &str) -> Result<String> {
        let source = ImageSource::parse(source)?;
        self.recognize_source(&source).await
    }

    pub async fn recognize_source(&mut self, source: &ImageSource) -> Result<String> {
        self.executor.execute(&mut self.service, source).await
    }

    /// Recognize and return the provider's JSON reply as-is.
    pub async fn recognize_json(&mut self, source: &ImageSource) -> Result<Value> {
        let response = self.executor.execute_raw(&mut self.service, source).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}
