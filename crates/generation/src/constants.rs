//! Generation constants
//!
//! Single source of truth for provider endpoints, model names and protocol
//! timings.

/// Provider endpoints
pub mod endpoints {
    /// Base URL of the generative language REST API
    pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    /// Background removal endpoint (export path only)
    pub const REMOVE_BG_URL: &str = "https://api.remove.bg/v1.0/removebg";
}

/// Environment variables read by `GenerationConfig::apply_env`
pub mod env {
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    pub const PREFERRED_VIDEO_VARIANT: &str = "VEO_MODEL";
    pub const REMOVE_BG_API_KEY: &str = "REMOVEBG_API_KEY";
    pub const FFMPEG_PATH: &str = "FFMPEG_PATH";
}

/// Default values for generation configuration
pub mod defaults {
    /// Image generation model (supports generateContent with image output)
    pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
    /// Sampling temperature for image generation
    pub const IMAGE_TEMPERATURE: f32 = 0.4;
    /// Video variants, tried in this order
    pub const VIDEO_VARIANTS: &[&str] = &[
        "veo-3.1-fast-generate-preview",
        "veo-3.1-generate-preview",
        "veo-3.0-generate-preview",
        "veo-2-generate-preview",
    ];
    /// Delay between operation status checks
    pub const POLL_INTERVAL_MS: u64 = 5_000;
    /// Status checks before a video attempt times out (60 * 5s = 5 minutes)
    pub const MAX_POLLS: u32 = 60;
    /// Requested clip length; the provider accepts 4-8 seconds
    pub const VIDEO_DURATION_SECS: u32 = 4;
    /// Requested clip aspect ratio
    pub const ASPECT_RATIO: &str = "16:9";
    /// Frame sampling rate for frame extraction (~8 fps gives 24-32 frames)
    pub const SAMPLING_RATE_HZ: f32 = 8.0;
    /// HTTP request timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
    /// Narrow configured models to the provider's model listing
    pub const DISCOVER_MODELS: bool = true;
    /// MIME type assumed for generated video when the provider omits it
    pub const VIDEO_MIME_TYPE: &str = "video/mp4";
    /// MIME type assumed for images when none is known
    pub const IMAGE_MIME_TYPE: &str = "image/png";
}
