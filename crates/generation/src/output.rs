//! Normalization of finished video operations to a single byte payload

use crate::constants::defaults;
use crate::error::{GenerationError, Result};
use crate::provider::{OperationState, VideoOutput, VideoProvider};
use crate::task::MediaBlob;

/// Resolve the first video of a finished operation to bytes.
///
/// Inline bytes are used as they are; a reference on the provider's own
/// hosting is downloaded through the provider; any other reference scheme
/// is unsupported.
pub async fn normalize_video(
    provider: &dyn VideoProvider,
    state: OperationState,
) -> Result<MediaBlob> {
    let variant = provider.variant();
    let Some(video) = state.videos.into_iter().next() else {
        return Err(GenerationError::NoOutputProduced(format!(
            "{} completed without any videos",
            variant
        )));
    };

    let blob = match video {
        VideoOutput::Inline(blob) => blob,
        VideoOutput::Reference { uri, mime_type } => {
            if !provider.is_hosted_reference(&uri) {
                return Err(GenerationError::UnsupportedOutputReference(uri));
            }
            let bytes = provider
                .download(&uri)
                .await
                .map_err(|e| GenerationError::from_provider(variant, e))?;
            MediaBlob::new(
                mime_type.unwrap_or_else(|| defaults::VIDEO_MIME_TYPE.to_string()),
                bytes,
            )
        }
    };

    if blob.is_empty() {
        return Err(GenerationError::NoOutputProduced(format!(
            "{} returned an empty video",
            variant
        )));
    }
    Ok(blob)
}
