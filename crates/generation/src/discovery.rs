//! Model discovery
//!
//! Narrows the configured models to the ones the provider's listing says are
//! available. An empty listing (or one that could not be fetched) leaves the
//! configuration as it is.

use crate::provider::ModelInfo;

/// Listing entries that look like video models
const VIDEO_FAMILY: &str = "veo";
/// Listing entries that look like image models served by `generateContent`
const IMAGE_FAMILY: &str = "flash-image";

/// Keep the variants of `chain` that the listing advertises, in chain order.
///
/// When the listing holds no video models at all, every variant is kept.
pub fn available_variants<'a>(chain: &[&'a str], listed: &[ModelInfo]) -> Vec<&'a str> {
    let listed_video: Vec<&str> = listed
        .iter()
        .map(ModelInfo::id)
        .filter(|id| id.to_lowercase().contains(VIDEO_FAMILY))
        .collect();
    if listed_video.is_empty() {
        return chain.to_vec();
    }
    chain
        .iter()
        .copied()
        .filter(|variant| listed_video.contains(variant))
        .collect()
}

/// The image model to use instead of `configured`, if any.
///
/// Returns `None` when the listing is empty, already advertises
/// `configured`, or has no image model to offer instead.
pub fn image_model_override(configured: &str, listed: &[ModelInfo]) -> Option<String> {
    if listed.is_empty() || listed.iter().any(|m| m.id() == configured) {
        return None;
    }
    listed
        .iter()
        .map(ModelInfo::id)
        .find(|id| id.to_lowercase().contains(IMAGE_FAMILY))
        .map(str::to_string)
}
