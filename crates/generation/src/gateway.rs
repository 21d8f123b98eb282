//! Generation Gateway - single entry point for executing generation tasks
//!
//! Image tasks are one provider call. Video tasks walk the fallback chain
//! strictly in order: a rate-limited variant is skipped, other failures
//! advance while a later variant remains, and a variant that never finishes
//! within the poll budget fails the whole task. Frame-extraction tasks are
//! handed to the frame extraction adapter.

use std::sync::Arc;
use std::time::Duration;

use media_tools::{bundle_frames, FfmpegExtractor, FrameExtractionAdapter};

use crate::attempt::ProviderAttempt;
use crate::config::GenerationConfig;
use crate::constants::defaults;
use crate::discovery;
use crate::error::{ErrorKind, GenerationError, Result};
use crate::output::normalize_video;
use crate::prompts;
use crate::provider::{
    GeminiImageProvider, GeminiModelCatalog, ImageProvider, ImageRequest, ModelCatalog, ModelInfo,
    OperationState, VeoVideoProvider, VideoProvider, VideoRequest,
};
use crate::task::{AnimationKind, GenerationTask, MediaBlob, ResolvedInputs, TaskOutput};

/// Longest diagnostic text quoted back when an image call returns no image
const DIAGNOSTIC_CHARS: usize = 100;

/// Protocol settings the gateway applies to every task
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub video_duration_secs: u32,
    pub aspect_ratio: String,
    /// Used when a frame-extraction task carries no rate of its own
    pub sampling_rate_hz: f32,
    pub image_temperature: Option<f32>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            max_polls: defaults::MAX_POLLS,
            video_duration_secs: defaults::VIDEO_DURATION_SECS,
            aspect_ratio: defaults::ASPECT_RATIO.to_string(),
            sampling_rate_hz: defaults::SAMPLING_RATE_HZ,
            image_temperature: Some(defaults::IMAGE_TEMPERATURE),
        }
    }
}

impl From<&GenerationConfig> for GatewaySettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_polls: config.max_polls,
            video_duration_secs: config.video_duration_secs,
            aspect_ratio: config.aspect_ratio.clone(),
            sampling_rate_hz: config.sampling_rate_hz,
            image_temperature: Some(config.image_temperature),
        }
    }
}

/// Executes generation tasks against the configured providers.
///
/// The gateway holds no per-task state, so one instance can serve
/// concurrent tasks for different nodes.
pub struct GenerationGateway {
    image: Arc<dyn ImageProvider>,
    video_chain: Vec<Arc<dyn VideoProvider>>,
    frames: FrameExtractionAdapter,
    settings: GatewaySettings,
    catalog: Option<Arc<dyn ModelCatalog>>,
}

impl GenerationGateway {
    pub fn new(
        image: Arc<dyn ImageProvider>,
        video_chain: Vec<Arc<dyn VideoProvider>>,
        frames: FrameExtractionAdapter,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            image,
            video_chain,
            frames,
            settings,
            catalog: None,
        }
    }

    /// Consult `catalog` before each image or video task and only use
    /// models it lists
    pub fn with_catalog(mut self, catalog: Arc<dyn ModelCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Build the HTTP-backed gateway described by `config`
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::Config("GEMINI_API_KEY or GOOGLE_API_KEY is not set".to_string())
            })?;

        let chain = config.fallback_chain();
        if chain.is_empty() {
            return Err(GenerationError::Config(
                "No video variants configured".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let image: Arc<dyn ImageProvider> = Arc::new(GeminiImageProvider::new(
            http_client.clone(),
            config.api_base_url.clone(),
            api_key.clone(),
            config.image_model.clone(),
        ));

        let video_chain = chain
            .into_iter()
            .map(|variant| {
                Arc::new(VeoVideoProvider::new(
                    http_client.clone(),
                    config.api_base_url.clone(),
                    api_key.clone(),
                    variant,
                )) as Arc<dyn VideoProvider>
            })
            .collect();

        let extractor = match config.ffmpeg_path {
            Some(ref path) => FfmpegExtractor::new(path.clone()),
            None => FfmpegExtractor::default(),
        };

        let gateway = Self::new(
            image,
            video_chain,
            FrameExtractionAdapter::new(Arc::new(extractor)),
            GatewaySettings::from(config),
        );
        if !config.discover_models {
            return Ok(gateway);
        }
        Ok(gateway.with_catalog(Arc::new(GeminiModelCatalog::new(
            http_client,
            config.api_base_url.clone(),
            api_key,
        ))))
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Variants in the order they will be tried
    pub fn video_variants(&self) -> Vec<&str> {
        self.video_chain.iter().map(|p| p.variant()).collect()
    }

    /// Execute one task and return its normalized output
    pub async fn run(&self, task: &GenerationTask) -> Result<TaskOutput> {
        log::info!(
            "Running {} task for node {} (seed {})",
            task.task_kind().as_str(),
            task.target_node_id,
            task.seed
        );

        match &task.inputs {
            ResolvedInputs::Image { prompt, references } => self
                .generate_image(prompt.as_deref(), references, task.seed)
                .await
                .map(TaskOutput::Image),
            ResolvedInputs::Video {
                source,
                animation,
                extra_prompt,
            } => self
                .generate_video(source, *animation, extra_prompt.as_deref(), task.seed)
                .await
                .map(TaskOutput::Video),
            ResolvedInputs::FrameExtraction {
                video,
                sampling_rate_hz,
            } => {
                let rate = sampling_rate_hz.unwrap_or(self.settings.sampling_rate_hz);
                self.extract_frames(video, rate).await
            }
        }
    }

    async fn generate_image(
        &self,
        prompt: Option<&str>,
        references: &[MediaBlob],
        seed: u32,
    ) -> Result<MediaBlob> {
        let provider = self.image.id();
        let model = match self.catalog {
            Some(_) => discovery::image_model_override(provider, &self.listed_models().await),
            None => None,
        };
        if let Some(ref model) = model {
            log::info!("{} is not listed; using {} instead", provider, model);
        }
        let request = ImageRequest {
            prompt: prompts::image_prompt(prompt),
            references: references.to_vec(),
            seed,
            temperature: self.settings.image_temperature,
            model,
        };

        let envelope = self
            .image
            .generate(&request)
            .await
            .map_err(|e| GenerationError::from_provider(provider, e))?;

        match envelope.first_image() {
            Some(image) if !image.is_empty() => Ok(image.clone()),
            _ => {
                let message = match envelope.first_text() {
                    Some(text) => format!(
                        "No image data found. Model returned text: {}",
                        text.chars().take(DIAGNOSTIC_CHARS).collect::<String>()
                    ),
                    None => format!("{} returned no image data", provider),
                };
                Err(GenerationError::NoOutputProduced(message))
            }
        }
    }

    async fn generate_video(
        &self,
        source: &MediaBlob,
        animation: AnimationKind,
        extra_prompt: Option<&str>,
        seed: u32,
    ) -> Result<MediaBlob> {
        if self.video_chain.is_empty() {
            return Err(GenerationError::Config(
                "No video variants configured".to_string(),
            ));
        }

        let request = VideoRequest {
            prompt: prompts::animation_prompt(animation, extra_prompt),
            image: source.clone(),
            seed,
            duration_secs: self.settings.video_duration_secs,
            aspect_ratio: self.settings.aspect_ratio.clone(),
        };
        let chain = self.available_chain().await?;
        log::info!(
            "Will try variants in order: {}",
            chain
                .iter()
                .map(|p| p.variant())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        let total = chain.len();
        let mut last_failure = None;

        for (index, provider) in chain.iter().enumerate() {
            let variant = provider.variant();
            log::info!("Attempting {} animation with {}", animation.as_str(), variant);

            match self.attempt_video(provider.as_ref(), &request).await {
                Ok(video) => {
                    log::info!(
                        "Generated video with {} ({} bytes)",
                        variant,
                        video.bytes.len()
                    );
                    return Ok(video);
                }
                Err(err @ GenerationError::Timeout { .. }) => {
                    log::error!("{}", err);
                    return Err(err);
                }
                Err(err) => {
                    if err.kind() == ErrorKind::RateLimited {
                        log::warn!("Rate limit hit with {}, trying next variant", variant);
                    } else if index + 1 < total {
                        log::warn!("Error with {}, trying next variant: {}", variant, err);
                    }
                    last_failure = Some((variant.to_string(), err));
                }
            }
        }

        match last_failure {
            Some((last_variant, source)) => Err(GenerationError::ChainExhausted {
                attempted: total,
                last_variant,
                source: Box::new(source),
            }),
            None => Err(GenerationError::Config(
                "No video variants configured".to_string(),
            )),
        }
    }

    /// Models from the catalog; empty when there is no catalog or the
    /// listing failed
    async fn listed_models(&self) -> Vec<ModelInfo> {
        let Some(ref catalog) = self.catalog else {
            return Vec::new();
        };
        match catalog.list_models().await {
            Ok(models) => models,
            Err(e) => {
                log::warn!("Failed to list models, keeping configured ones: {}", e);
                Vec::new()
            }
        }
    }

    /// The fallback chain narrowed to listed variants
    async fn available_chain(&self) -> Result<Vec<Arc<dyn VideoProvider>>> {
        if self.catalog.is_none() {
            return Ok(self.video_chain.clone());
        }
        let listed = self.listed_models().await;
        let configured = self.video_variants();
        let available = discovery::available_variants(&configured, &listed);

        let chain: Vec<Arc<dyn VideoProvider>> = self
            .video_chain
            .iter()
            .filter(|p| available.contains(&p.variant()))
            .cloned()
            .collect();
        if chain.is_empty() {
            return Err(GenerationError::Config(format!(
                "None of the configured video variants ({}) is available",
                configured.join(", ")
            )));
        }
        if chain.len() < self.video_chain.len() {
            log::info!("Available video variants: {}", available.join(", "));
        }
        Ok(chain)
    }

    /// Submit to one variant, poll until done or out of budget, and
    /// normalize the output
    async fn attempt_video(
        &self,
        provider: &dyn VideoProvider,
        request: &VideoRequest,
    ) -> Result<MediaBlob> {
        let variant = provider.variant();
        let handle = provider
            .submit(request)
            .await
            .map_err(|e| GenerationError::from_provider(variant, e))?;

        let mut attempt = ProviderAttempt::submitted(variant, handle);
        let max_polls = self.settings.max_polls;

        let finished: OperationState = loop {
            if attempt.poll_count >= max_polls {
                attempt.time_out();
                return Err(GenerationError::Timeout {
                    provider: variant.to_string(),
                    polls: attempt.poll_count,
                });
            }

            tokio::time::sleep(self.settings.poll_interval).await;

            let state = match provider.poll(&attempt.operation_handle).await {
                Ok(state) => state,
                Err(e) => {
                    attempt.fail();
                    return Err(GenerationError::from_provider(variant, e));
                }
            };
            attempt.record_poll(state.done, max_polls);
            if state.done {
                break state;
            }
        };
        attempt.complete();

        let result = normalize_video(provider, finished).await;
        if result.is_err() {
            attempt.fail();
        }
        result
    }

    async fn extract_frames(&self, video: &MediaBlob, sampling_rate_hz: f32) -> Result<TaskOutput> {
        let frames = self.frames.extract_frames(&video.bytes, sampling_rate_hz).await?;
        if frames.is_empty() {
            return Err(GenerationError::NoOutputProduced(
                "Frame extraction produced no frames".to_string(),
            ));
        }
        let archive = bundle_frames(&frames)?;
        Ok(TaskOutput::Frames { frames, archive })
    }
}
