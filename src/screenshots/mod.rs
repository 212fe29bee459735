//! Timestamp-driven screenshot capture
//!
//! Frames are never decoded locally: a video CDN renders the frame at a given
//! offset, and the resulting image is copied into the screenshots bucket.

pub mod cdn;
pub mod extractor;

pub use cdn::FrameUrlBuilder;
pub use extractor::{ScreenshotError, ScreenshotExtractor, default_fallback_image};

use async_trait::async_trait;

use crate::manual::Screenshot;

/// Produces one screenshot per timestamp, in the same order.
///
/// Implementations substitute a fallback image for frames they cannot
/// capture instead of failing the batch.
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn extract(&self, video_url: &str, timestamps: &[u32]) -> Vec<Screenshot>;
}
