//! Configuration for the generation gateway

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, endpoints, env};
use crate::error::GenerationError;

/// Provider credentials, fallback chain and protocol timings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    /// API key for the image and video providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the provider REST API
    pub api_base_url: String,
    /// Model used for image (preview) generation
    pub image_model: String,
    /// Sampling temperature for image generation
    pub image_temperature: f32,
    /// Ordered video fallback chain
    pub video_variants: Vec<String>,
    /// Operator-preferred variant, tried first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_video_variant: Option<String>,
    /// Delay between operation status checks
    pub poll_interval_ms: u64,
    /// Status checks before a video attempt times out
    pub max_polls: u32,
    /// Requested clip length in seconds
    pub video_duration_secs: u32,
    /// Requested clip aspect ratio
    pub aspect_ratio: String,
    /// Default frame sampling rate for frame extraction
    pub sampling_rate_hz: f32,
    /// Frame extractor binary (defaults to `ffmpeg` on PATH)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
    /// API key for background removal (export path only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_bg_api_key: Option<String>,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Check the provider's model listing before each task
    pub discover_models: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: endpoints::API_BASE_URL.to_string(),
            image_model: defaults::IMAGE_MODEL.to_string(),
            image_temperature: defaults::IMAGE_TEMPERATURE,
            video_variants: defaults::VIDEO_VARIANTS
                .iter()
                .map(|v| v.to_string())
                .collect(),
            preferred_video_variant: None,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            max_polls: defaults::MAX_POLLS,
            video_duration_secs: defaults::VIDEO_DURATION_SECS,
            aspect_ratio: defaults::ASPECT_RATIO.to_string(),
            sampling_rate_hz: defaults::SAMPLING_RATE_HZ,
            ffmpeg_path: None,
            remove_bg_api_key: None,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            discover_models: defaults::DISCOVER_MODELS,
        }
    }
}

impl GenerationConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GenerationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            GenerationError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Overlay settings from the process environment
    pub fn apply_env(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(env::GEMINI_API_KEY).or_else(|| non_empty(env::GOOGLE_API_KEY)) {
            self.api_key = Some(key);
        }
        if let Some(variant) = non_empty(env::PREFERRED_VIDEO_VARIANT) {
            self.preferred_video_variant = Some(variant);
        }
        if let Some(key) = non_empty(env::REMOVE_BG_API_KEY) {
            self.remove_bg_api_key = Some(key);
        }
        if let Some(path) = non_empty(env::FFMPEG_PATH) {
            self.ffmpeg_path = Some(PathBuf::from(path));
        }
    }

    /// The video fallback chain with the preferred variant moved to the front.
    ///
    /// A preferred variant that is not in `video_variants` is ignored.
    pub fn fallback_chain(&self) -> Vec<String> {
        let mut chain = self.video_variants.clone();
        if let Some(ref preferred) = self.preferred_video_variant {
            match chain.iter().position(|v| v == preferred) {
                Some(index) => {
                    let variant = chain.remove(index);
                    chain.insert(0, variant);
                }
                None => log::warn!(
                    "Preferred video variant {} is not a configured variant; ignoring it",
                    preferred
                ),
            }
        }
        chain
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_polls, 60);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.video_variants.len(), 4);
        assert_eq!(config.fallback_chain()[0], "veo-3.1-fast-generate-preview");
    }

    #[test]
    fn test_preferred_variant_moves_to_front() {
        let config = GenerationConfig {
            preferred_video_variant: Some("veo-3.0-generate-preview".to_string()),
            ..Default::default()
        };
        let chain = config.fallback_chain();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain[0], "veo-3.0-generate-preview");
        assert_eq!(chain[1], "veo-3.1-fast-generate-preview");
    }

    #[test]
    fn test_unknown_preferred_variant_is_ignored() {
        let config = GenerationConfig {
            preferred_video_variant: Some("veo-typo".to_string()),
            ..Default::default()
        };
        assert_eq!(config.fallback_chain(), config.video_variants);

        let config = GenerationConfig {
            video_variants: vec!["a".to_string(), "b".to_string()],
            preferred_video_variant: Some("custom".to_string()),
            ..Default::default()
        };
        assert_eq!(config.fallback_chain(), vec!["a", "b"]);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"maxPolls": 3, "videoVariants": ["x"]}"#).unwrap();
        assert_eq!(config.max_polls, 3);
        assert_eq!(config.video_variants, vec!["x"]);
        assert_eq!(config.image_model, "gemini-2.5-flash-image");
        assert!(config.discover_models);

        let config: GenerationConfig =
            serde_json::from_str(r#"{"discoverModels": false}"#).unwrap();
        assert!(!config.discover_models);
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("GOOGLE_API_KEY", "google-key"),
            ("VEO_MODEL", "veo-2-generate-preview"),
            ("FFMPEG_PATH", "/opt/ffmpeg"),
        ]
        .into_iter()
        .collect();

        let mut config = GenerationConfig::default();
        config.apply_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("google-key"));
        assert_eq!(
            config.preferred_video_variant.as_deref(),
            Some("veo-2-generate-preview")
        );
        assert_eq!(config.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg")));
        assert!(config.remove_bg_api_key.is_none());
    }

    #[test]
    fn test_gemini_key_wins_over_google_key() {
        let mut config = GenerationConfig::default();
        config.apply_vars(|k| match k {
            "GEMINI_API_KEY" => Some("gemini".to_string()),
            "GOOGLE_API_KEY" => Some("google".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("gemini"));
    }
}
