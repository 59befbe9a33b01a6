//! `bce-auth-v1` request signing.
//!
//! The remote verifier recomputes the signature from the request it
//! receives, so every encoding and ordering rule here must match it byte for
//! byte:
//!
//! - names and values are percent-encoded with only `A-Z a-z 0-9 - _ . ~`
//!   left as is;
//! - the path keeps its `/` separators;
//! - query pairs are form-encoded (space becomes `+`) and sorted as
//!   `key=value` strings;
//! - canonical header lines are `lower(encoded name):encoded value`, sorted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use url::Url;

use crate::error::{OcrError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_VERSION: &str = "1";
pub const EXPIRATION_SECS: u32 = 1800;
pub const DATE_HEADER: &str = "x-bce-date";

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for deterministic signatures.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// When the `Authorization` header is computed.
///
/// `Cached` signs once when the service is built and reuses the headers,
/// which go stale after [`EXPIRATION_SECS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningMode {
    #[default]
    PerRequest,
    Cached,
}

impl FromStr for SigningMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_request" | "per-request" | "request" => Ok(SigningMode::PerRequest),
            "cached" | "cache" | "construction" => Ok(SigningMode::Cached),
            other => Err(format!("unknown signing mode '{other}'")),
        }
    }
}

impl fmt::Display for SigningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningMode::PerRequest => f.write_str("per_request"),
            SigningMode::Cached => f.write_str("cached"),
        }
    }
}

/// Headers produced by one signing pass, in the order they were set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub timestamp: String,
    pub canonical_request: String,
    pub headers: Vec<(String, String)>,
}

impl SignedHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.get("Authorization")
    }
}

#[derive(Clone)]
pub struct BceSigner {
    api_key: String,
    secret_key: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for BceSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BceSigner")
            .field("api_key", &self.api_key)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn encode_path(path: &str) -> String {
    let decoded = urlencoding::decode(path).map_or_else(|_| path.to_string(), |p| p.into_owned());
    decoded.split('/').map(encode).collect::<Vec<_>>().join("/")
}

fn encode_form(s: &str) -> String {
    encode(s).replace("%20", "+")
}

fn hmac_hex(key: &[u8], message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| OcrError::Credentials(format!("invalid signing key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn canonical_query(params: &BTreeMap<String, String>) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_form(k), encode_form(v)))
        .collect();
    pairs.sort();
    pairs.join("&")
}

fn canonical_headers(headers: &[(String, String)]) -> String {
    let mut lines: Vec<String> = headers
        .iter()
        .map(|(name, value)| {
            format!(
                "{}:{}",
                encode(name.trim()).to_lowercase(),
                encode(value.trim())
            )
        })
        .collect();
    lines.sort();
    lines.join("\n")
}

impl BceSigner {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let secret_key = secret_key.into();

        if api_key.trim().is_empty() {
            return Err(OcrError::Credentials("api_key is empty".to_string()));
        }
        if secret_key.trim().is_empty() {
            return Err(OcrError::Credentials("secret_key is empty".to_string()));
        }
        if api_key.contains('/') || api_key.chars().any(char::is_whitespace) {
            return Err(OcrError::Credentials(
                "api_key must not contain '/' or whitespace".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            secret_key,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timestamp(&self) -> String {
        self.clock.now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Sign a request. `params` and `headers` are extra query parameters
    /// and headers to include in the signature; query parameters already on
    /// `url` take precedence over `params`.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        params: &BTreeMap<String, String>,
        headers: &[(String, String)],
    ) -> Result<SignedHeaders> {
        let parsed = Url::parse(url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| OcrError::Config(format!("URL has no host: {url}")))?;

        let mut params = params.clone();
        for (k, v) in parsed.query_pairs() {
            params.insert(k.into_owned(), v.into_owned());
        }

        let timestamp = self.timestamp();
        let mut signed: Vec<(String, String)> = headers.to_vec();
        signed.push(("Host".to_string(), host.to_string()));
        signed.push((DATE_HEADER.to_string(), timestamp.clone()));

        let auth_string = format!(
            "bce-auth-v{AUTH_VERSION}/{}/{timestamp}/{EXPIRATION_SECS}",
            self.api_key
        );
        let signing_key = hmac_hex(self.secret_key.as_bytes(), &auth_string)?;

        let canonical_request = format!(
            "{}\n{}\n{}\n{}",
            method.to_uppercase(),
            encode_path(parsed.path()),
            canonical_query(&params),
            canonical_headers(&signed)
        );
        let signature = hmac_hex(signing_key.as_bytes(), &canonical_request)?;

        let signed_names = signed
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";")
            .to_lowercase();

        let authorization = format!("{auth_string}/{signed_names}/{signature}");
        signed.push(("Authorization".to_string(), authorization));

        Ok(SignedHeaders {
            timestamp,
            canonical_request,
            headers: signed,
        })
    }
}
