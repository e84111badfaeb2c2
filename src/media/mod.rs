/// Blob-hosting collaborator surface. The marketplace only ever needs a
/// public URL back; image bytes are never inspected here.
// region:    --- Imports
use crate::error::MarketError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

// endregion: --- Imports

// region:    --- Image Host

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image and return its hosted public URL.
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, MarketError>;
}

/// HTTP-backed host: POSTs the raw bytes to a configured upload endpoint
/// that answers `{"url": "..."}`.
pub struct HttpImageHost {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl HttpImageHost {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Endpoint from `IMAGE_HOST_URL`, with a local default for dev runs.
    pub fn from_env() -> Self {
        let endpoint = std::env::var("IMAGE_HOST_URL")
            .unwrap_or_else(|_| "http://localhost:9090/upload".to_string());
        Self::new(endpoint)
    }
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, MarketError> {
        info!(
            "{:<12} --> uploading {} bytes ({})",
            "ImageHost",
            bytes.len(),
            content_type
        );
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| MarketError::ImageHost(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketError::ImageHost(e.to_string()))?;

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| MarketError::ImageHost(e.to_string()))?;
        Ok(parsed.url)
    }
}

// endregion: --- Image Host
