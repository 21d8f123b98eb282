//! Image generation through the `generateContent` REST endpoint, plus the
//! `models` listing used for model discovery

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use super::{ImageProvider, ImageRequest, ModelCatalog, ModelInfo, ResponseEnvelope, ResponsePart};
use crate::error::ProviderError;
use crate::task::MediaBlob;

/// Header carrying the API key on every request
pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

/// Image provider backed by a Gemini image model
pub struct GeminiImageProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiImageProvider {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

/// Request body: the prompt first, then each reference image inline
fn build_request_body(request: &ImageRequest) -> Value {
    let mut parts = vec![json!({ "text": request.prompt })];
    for reference in &request.references {
        parts.push(json!({
            "inlineData": {
                "mimeType": reference.mime_type,
                "data": STANDARD.encode(&reference.bytes),
            }
        }));
    }

    let mut generation_config = json!({
        "responseModalities": ["TEXT", "IMAGE"],
        "seed": request.seed,
    });
    if let Some(temperature) = request.temperature {
        generation_config["temperature"] = json!(temperature);
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

/// Turn the first candidate's parts into a response envelope.
///
/// Inline data that is not an image is skipped. A response with no
/// candidates yields an empty envelope; deciding whether that is an error
/// is up to the gateway.
pub(crate) fn parse_response(body: &Value) -> Result<ResponseEnvelope, ProviderError> {
    let parts = match body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.pointer("/content/parts"))
        .and_then(|p| p.as_array())
    {
        Some(parts) => parts,
        None => return Ok(ResponseEnvelope::default()),
    };

    let mut envelope = ResponseEnvelope::default();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
            envelope.parts.push(ResponsePart::Text(text.to_string()));
            continue;
        }

        let Some(inline) = part.get("inlineData") else {
            continue;
        };
        let mime_type = inline
            .get("mimeType")
            .and_then(|m| m.as_str())
            .unwrap_or_default();
        if !mime_type.starts_with("image/") {
            continue;
        }
        let data = inline.get("data").and_then(|d| d.as_str()).ok_or_else(|| {
            ProviderError::InvalidResponse("Image part without data".to_string())
        })?;
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| ProviderError::InvalidResponse(format!("Invalid image data: {}", e)))?;
        envelope
            .parts
            .push(ResponsePart::Image(MediaBlob::new(mime_type, bytes)));
    }

    Ok(envelope)
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ResponseEnvelope, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let url = self.endpoint(model);
        log::debug!(
            "Requesting image from {} ({} reference(s), seed {})",
            model,
            request.references.len(),
            request.seed
        );

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parse_response(&json)
    }
}

/// Model listing of the generative language API
pub struct GeminiModelCatalog {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiModelCatalog {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

/// Models on one listing page, and the token of the next page if any
pub(crate) fn parse_model_list(body: &Value) -> (Vec<ModelInfo>, Option<String>) {
    let models = body
        .get("models")
        .and_then(|m| m.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|m| {
                    let name = m.get("name")?.as_str()?;
                    Some(ModelInfo {
                        name: name.to_string(),
                        display_name: m
                            .get("displayName")
                            .and_then(|d| d.as_str())
                            .map(str::to_string),
                        supported_methods: m
                            .get("supportedGenerationMethods")
                            .and_then(|s| s.as_array())
                            .map(|methods| {
                                methods
                                    .iter()
                                    .filter_map(|v| v.as_str().map(str::to_string))
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let next_page = body
        .get("nextPageToken")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    (models, next_page)
}

#[async_trait]
impl ModelCatalog for GeminiModelCatalog {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::from_status(status, body));
            }

            let json: Value = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse model list: {}", e))
            })?;
            let (page, next) = parse_model_list(&json);
            models.extend(page);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        log::debug!("Model listing returned {} model(s)", models.len());
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_layout() {
        let request = ImageRequest {
            prompt: "knight".to_string(),
            references: vec![MediaBlob::png(vec![1, 2, 3])],
            seed: 42,
            temperature: Some(0.4),
            model: None,
        };
        let body = build_request_body(&request);

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "knight");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert_eq!(body["generationConfig"]["seed"], 42);
        assert!(body["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn test_parse_text_and_image() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your sprite" },
                        { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
                    ]
                }
            }]
        });
        let envelope = parse_response(&body).unwrap();
        assert_eq!(envelope.first_text(), Some("Here is your sprite"));
        assert_eq!(envelope.first_image().unwrap().bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_skips_non_image_inline_data() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "audio/wav", "data": "AQID" } }]
                }
            }]
        });
        assert!(parse_response(&body).unwrap().first_image().is_none());
    }

    #[test]
    fn test_parse_without_candidates() {
        let envelope = parse_response(&json!({ "promptFeedback": {} })).unwrap();
        assert!(envelope.parts.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_base64() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "image/png", "data": "***" } }]
                }
            }]
        });
        assert!(matches!(
            parse_response(&body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_endpoint() {
        let provider = GeminiImageProvider::new(
            reqwest::Client::new(),
            "https://example.test/v1beta/",
            "key",
            "gemini-2.5-flash-image",
        );
        assert_eq!(
            provider.endpoint("gemini-2.5-flash-image"),
            "https://example.test/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_parse_model_list() {
        let body = json!({
            "models": [
                {
                    "name": "models/veo-2-generate-preview",
                    "displayName": "Veo 2",
                    "supportedGenerationMethods": ["predictLongRunning"]
                },
                { "displayName": "no name" },
                { "name": "models/gemini-2.5-flash-image" }
            ],
            "nextPageToken": "page-2"
        });
        let (models, next) = parse_model_list(&body);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id(), "veo-2-generate-preview");
        assert_eq!(models[0].display_name.as_deref(), Some("Veo 2"));
        assert_eq!(models[0].supported_methods, vec!["predictLongRunning"]);
        assert!(models[1].supported_methods.is_empty());
        assert_eq!(next.as_deref(), Some("page-2"));

        let (models, next) = parse_model_list(&json!({}));
        assert!(models.is_empty());
        assert!(next.is_none());
    }
}
