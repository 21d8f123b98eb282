//! Video generation through long-running `predictLongRunning` operations

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Url;
use serde_json::{json, Value};

use super::gemini::API_KEY_HEADER;
use super::{OperationHandle, OperationState, VideoOutput, VideoProvider, VideoRequest};
use crate::constants::defaults;
use crate::error::ProviderError;
use crate::task::MediaBlob;

/// Places a finished operation may list its videos, newest API shape first
const SAMPLE_POINTERS: &[&str] = &[
    "/response/generateVideoResponse/generatedSamples",
    "/response/generatedVideos",
    "/response/videos",
    "/result/generatedVideos",
    "/result/videos",
];

/// Video provider for one Veo model variant
pub struct VeoVideoProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    variant: String,
}

impl VeoVideoProvider {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            variant: variant.into(),
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Append the API key as the `key` query parameter, replacing any
    /// existing one
    fn authenticated_url(&self, uri: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(uri)
            .map_err(|e| ProviderError::InvalidResponse(format!("Invalid video URI: {}", e)))?;
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "key")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    fn redact(&self, text: &str) -> String {
        if self.api_key.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.api_key, "***")
        }
    }

    async fn check(response: reqwest::Response) -> Result<Value, ProviderError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

fn build_submit_body(request: &VideoRequest) -> Value {
    json!({
        "instances": [{
            "prompt": request.prompt,
            "image": {
                "bytesBase64Encoded": STANDARD.encode(&request.image.bytes),
                "mimeType": request.image.mime_type,
            }
        }],
        "parameters": {
            "aspectRatio": request.aspect_ratio,
            "durationSeconds": request.duration_secs,
            "seed": request.seed,
            "sampleCount": 1,
        }
    })
}

/// Map an operation-level `error` object to a provider error
fn operation_error(error: &Value) -> ProviderError {
    let code = error.get("code").and_then(|c| c.as_u64()).unwrap_or(500);
    let status = error.get("status").and_then(|s| s.as_str()).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("operation failed")
        .to_string();

    if code == u64::from(ProviderError::RATE_LIMIT_STATUS) || status == "RESOURCE_EXHAUSTED" {
        ProviderError::RateLimited(message)
    } else {
        ProviderError::Api {
            status: u16::try_from(code).unwrap_or(500),
            message,
        }
    }
}

fn parse_sample(entry: &Value) -> Result<Option<VideoOutput>, ProviderError> {
    let video = entry.get("video").unwrap_or(entry);
    let mime_type = video
        .get("mimeType")
        .and_then(|m| m.as_str())
        .map(str::to_string);

    if let Some(uri) = video.get("uri").and_then(|u| u.as_str()) {
        return Ok(Some(VideoOutput::Reference {
            uri: uri.to_string(),
            mime_type,
        }));
    }

    let encoded = video
        .get("bytesBase64Encoded")
        .or_else(|| video.get("videoBytes"))
        .and_then(|b| b.as_str());
    match encoded {
        Some(data) => {
            let bytes = STANDARD.decode(data).map_err(|e| {
                ProviderError::InvalidResponse(format!("Invalid video data: {}", e))
            })?;
            let mime_type = mime_type.unwrap_or_else(|| defaults::VIDEO_MIME_TYPE.to_string());
            Ok(Some(VideoOutput::Inline(MediaBlob::new(mime_type, bytes))))
        }
        None => Ok(None),
    }
}

/// Interpret an operation resource.
///
/// Sample entries without a URI or inline bytes are dropped; the gateway
/// treats a finished operation with no videos as having produced nothing.
pub(crate) fn parse_operation(body: &Value) -> Result<OperationState, ProviderError> {
    if let Some(error) = body.get("error") {
        return Err(operation_error(error));
    }

    if !body.get("done").and_then(|d| d.as_bool()).unwrap_or(false) {
        return Ok(OperationState::pending());
    }

    let samples = SAMPLE_POINTERS
        .iter()
        .find_map(|p| body.pointer(p).and_then(|s| s.as_array()));

    let mut videos = Vec::new();
    for entry in samples.into_iter().flatten() {
        if let Some(video) = parse_sample(entry)? {
            videos.push(video);
        }
    }
    Ok(OperationState::finished(videos))
}

#[async_trait]
impl VideoProvider for VeoVideoProvider {
    fn variant(&self) -> &str {
        &self.variant
    }

    async fn submit(&self, request: &VideoRequest) -> Result<OperationHandle, ProviderError> {
        let url = format!("{}/models/{}:predictLongRunning", self.base(), self.variant);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_submit_body(request))
            .send()
            .await?;
        let json = Self::check(response).await?;

        if let Some(error) = json.get("error") {
            return Err(operation_error(error));
        }
        json.get("name")
            .and_then(|n| n.as_str())
            .map(|n| OperationHandle(n.to_string()))
            .ok_or_else(|| ProviderError::InvalidResponse("Operation without a name".to_string()))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationState, ProviderError> {
        let url = format!("{}/{}", self.base(), handle.as_str().trim_start_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let json = Self::check(response).await?;

        parse_operation(&json)
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, ProviderError> {
        let url = self.authenticated_url(uri)?;
        log::info!("Downloading video from {}", self.redact(url.as_str()));

        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, self.redact(&body)));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
