use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{Config, CredentialsConfig};
use crate::error::{OcrError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// OAuth `client_credentials` grant against the AIP token endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    client: Client,
    token_url: String,
    api_key: String,
    secret_key: String,
}

impl TokenClient {
    pub fn new(
        token_url: impl Into<String>,
        credentials: &CredentialsConfig,
        timeout: Duration,
    ) -> Result<Self> {
        if credentials.api_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(OcrError::Credentials(
                "api_key and secret_key are required to request an access token".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OcrError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: token_url.into(),
            api_key: credentials.api_key.clone(),
            secret_key: credentials.secret_key.clone(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.ocr.token_url,
            &config.credentials,
            config.request.timeout(),
        )
    }

    pub async fn fetch(&self) -> Result<AccessToken> {
        debug!("Requesting access token from {}", self.token_url);

        let response = self
            .client
            .get(&self.token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.secret_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: TokenResponse = response.json().await?;

        match body.access_token {
            Some(access_token) if !access_token.is_empty() => {
                info!(expires_in = ?body.expires_in, "Access token acquired");
                Ok(AccessToken {
                    access_token,
                    expires_in: body.expires_in,
                })
            }
            _ => Err(OcrError::Auth(format!(
                "token endpoint returned {status}: {} {}",
                body.error.unwrap_or_else(|| "no access_token".to_string()),
                body.error_description.unwrap_or_default()
            ))),
        }
    }
}
