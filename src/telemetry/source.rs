//! Upstream telemetry endpoints.
//!
//! The fetcher is generic over [`TelemetrySource`] and [`MetadataSource`] so
//! tests can drive every tier without a network. [`HttpSource`] implements
//! both against the live backend.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::Config;

// ---

/// Why one upstream request produced nothing usable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Http(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("response contained no drone records")]
    Empty,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // ---
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Http(e.to_string())
        }
    }
}

/// Live drone-state endpoint.
pub trait TelemetrySource: Send + Sync {
    fn fetch_live(&self) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Low-churn fleet metadata: configured aircraft and open alarms.
pub trait MetadataSource: Send + Sync {
    fn fetch_roster(&self) -> impl Future<Output = Result<Value, FetchError>> + Send;
    fn fetch_alarms(&self) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// reqwest-backed source for the telemetry backend and its metadata endpoints.
#[derive(Debug, Clone)]
pub struct HttpSource {
    // ---
    client: Client,
    base_url: String,
    telemetry_path: String,
    roster_path: String,
    alarms_path: String,
}

impl HttpSource {
    // ---
    /// Build the client with the tunnel bypass header and bearer credential
    /// from the configuration applied to every request.
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        // ---
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("fleetdash/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some((name, value)) = &cfg.bypass_header {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        if let Some(token) = &cfg.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(cfg.telemetry_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.telemetry_api_url.trim_end_matches('/').to_string(),
            telemetry_path: cfg.telemetry_path.clone(),
            roster_path: cfg.roster_path.clone(),
            alarms_path: cfg.alarms_path.clone(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        // ---
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

impl TelemetrySource for HttpSource {
    async fn fetch_live(&self) -> Result<Value, FetchError> {
        self.get_json(&self.telemetry_path).await
    }
}

impl MetadataSource for HttpSource {
    async fn fetch_roster(&self) -> Result<Value, FetchError> {
        self.get_json(&self.roster_path).await
    }

    async fn fetch_alarms(&self) -> Result<Value, FetchError> {
        self.get_json(&self.alarms_path).await
    }
}
