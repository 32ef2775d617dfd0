//! HTTP client for the Concord backend REST API.

use concord_shared::{ApiError, CdnInfo, MediaQuality, SignedUrl};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// HTTP client for the cognitive-engine backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
        }
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute (or origin-relative, with no base configured) URL for `path`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let url = self.url(path);
        crate::log_debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::decode(resp).await
    }

    async fn decode<TRes: DeserializeOwned>(resp: reqwest::Response) -> Result<TRes, ApiError> {
        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();

        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            return Err(ApiError::Http { status, body: text });
        }

        if text.is_empty() {
            serde_json::from_str("null").map_err(|e| ApiError::Deserialize(e.to_string()))
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
        }
    }

    // --- Media / CDN ---

    /// CDN configuration (`GET /api/cdn/info`).
    pub async fn cdn_info(&self) -> Result<CdnInfo, ApiError> {
        self.get_json("/api/cdn/info").await
    }

    /// Short-lived signed URL for a media asset.
    pub async fn signed_url(
        &self,
        hash: &str,
        quality: MediaQuality,
    ) -> Result<SignedUrl, ApiError> {
        self.get_json(&signed_url_path(hash, quality)).await
    }

    // --- System ---

    /// Backend health report (`GET /api/status`).
    pub async fn status(&self) -> Result<Value, ApiError> {
        self.get_json("/api/status").await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line backend health for a `/api/status` result: the report's `status`
/// field, `"ok"` when it has none, or the error's user message.
pub fn health_label(report: &Result<Value, ApiError>) -> String {
    match report {
        Ok(body) => body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("ok")
            .to_string(),
        Err(e) => e.user_message(),
    }
}

fn signed_url_path(hash: &str, quality: MediaQuality) -> String {
    let hash = urlencoding::encode(hash);
    match quality {
        MediaQuality::Original => format!("/api/cdn/signed-url/{hash}"),
        q => format!("/api/cdn/signed-url/{hash}?quality={}", q.as_str()),
    }
}
