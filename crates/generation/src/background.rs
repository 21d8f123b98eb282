//! Background removal for exported frames

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use crate::config::GenerationConfig;
use crate::constants::endpoints;
use crate::error::{GenerationError, ProviderError};

/// Removes the background from a single image
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Serialize)]
struct RemoveBgRequest<'a> {
    image_file_b64: &'a str,
    size: &'a str,
}

/// Client for the remove.bg HTTP API
pub struct RemoveBgClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RemoveBgClient {
    pub fn new(http_client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_endpoint(http_client, endpoints::REMOVE_BG_URL, api_key)
    }

    pub fn with_endpoint(
        http_client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a client from `removeBgApiKey`
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .remove_bg_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::Config("REMOVEBG_API_KEY not configured".to_string()))?;
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::new(http_client, api_key))
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let encoded = STANDARD.encode(image);
        let body = RemoveBgRequest {
            image_file_b64: &encoded,
            size: "auto",
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            log::error!("Background removal failed with {}: {}", status, text);
            return Err(ProviderError::from_status(status, text));
        }

        let bytes = response.bytes().await?;
        log::debug!("Background removed ({} -> {} bytes)", image.len(), bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = RemoveBgRequest {
            image_file_b64: "AQID",
            size: "auto",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "image_file_b64": "AQID", "size": "auto" })
        );
    }

    #[test]
    fn test_from_config_requires_key() {
        assert!(RemoveBgClient::from_config(&GenerationConfig::default()).is_err());

        let config = GenerationConfig {
            remove_bg_api_key: Some("bg-key".to_string()),
            ..Default::default()
        };
        let client = RemoveBgClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint, endpoints::REMOVE_BG_URL);
    }
}
