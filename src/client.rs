//! Host-side client for a running clipboard bridge.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::{DEFAULT_API_KEY, DEFAULT_PORT};
use crate::error::{Error, Result};
use crate::protocol::{
    ClipboardContent, ClipboardResponse, HealthStatus, ServiceInfo, DEFAULT_CONTENT_TYPE,
};
use crate::server::API_KEY_HEADER;

/// Timeout applied to every client call.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bridge address as seen from the host.
pub fn default_base_url() -> String {
    format!("http://127.0.0.1:{DEFAULT_PORT}")
}

/// REST client for the bridge API.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BridgeClient {
    /// Client with the default timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_CLIENT_TIMEOUT)
    }

    /// Client with a custom per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Client pointing at the default local bridge.
    pub fn local() -> Result<Self> {
        Self::new(default_base_url(), DEFAULT_API_KEY)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus> {
        send(self.http.get(self.url("/health"))).await
    }

    /// `GET /`.
    pub async fn info(&self) -> Result<ServiceInfo> {
        send(self.http.get(self.url("/"))).await
    }

    /// Whether the bridge answers its health check.
    pub async fn is_available(&self) -> bool {
        match self.health().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("clipboard bridge not available: {}", e);
                false
            }
        }
    }

    /// `GET /clipboard`.
    pub async fn get(&self) -> Result<ClipboardContent> {
        let response: ClipboardResponse =
            send(self.authed(self.http.get(self.url("/clipboard")))).await?;
        tracing::debug!(
            length = response.content.as_deref().map_or(0, str::len),
            "retrieved clipboard from bridge"
        );
        Ok(ClipboardContent {
            content: response.content.unwrap_or_default(),
            content_type: response
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into()),
        })
    }

    /// `POST /clipboard`.
    pub async fn set(&self, content: &ClipboardContent) -> Result<ClipboardResponse> {
        tracing::debug!(length = content.content.len(), "setting clipboard through bridge");
        send(self.authed(self.http.post(self.url("/clipboard")).json(content))).await
    }

    /// `DELETE /clipboard`.
    pub async fn clear(&self) -> Result<ClipboardResponse> {
        send(self.authed(self.http.delete(self.url("/clipboard")))).await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Bridge {
        status: status.as_u16(),
        detail: error_detail(status, &body),
    })
}

fn error_detail(status: StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("detail").or_else(|| v.get("error")))
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        })
}
