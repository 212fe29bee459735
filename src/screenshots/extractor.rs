use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bon::Builder;
use futures::{StreamExt, stream};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ScreenshotSource;
use super::cdn::FrameUrlBuilder;
use crate::config::ScreenshotConfig;
use crate::error::ErrorKind;
use crate::http::{FetchError, HttpClient};
use crate::manual::Screenshot;
use crate::observability::Metrics;
use crate::storage::{StorageClient, StorageError, unique_prefix};

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="800" height="450" viewBox="0 0 800 450"><rect width="800" height="450" fill="#F3F4F6"/><text x="400" y="225" font-family="sans-serif" font-size="24" fill="#9CA3AF" text-anchor="middle" dominant-baseline="middle">Screenshot unavailable</text></svg>"##;

/// Inline image used when a frame cannot be captured
pub fn default_fallback_image() -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(PLACEHOLDER_SVG)
    )
}

#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("Failed to fetch frame: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to store frame: {0}")]
    Storage(#[from] StorageError),
}

impl ScreenshotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScreenshotError::Fetch(e) => e.kind(),
            ScreenshotError::Storage(e) => e.kind(),
        }
    }
}

/// Captures frames through the CDN and persists them to the screenshots bucket
#[derive(Builder)]
pub struct ScreenshotExtractor {
    http: HttpClient,
    storage: StorageClient,
    frame_urls: FrameUrlBuilder,
    #[builder(default = default_fallback_image())]
    fallback_url: String,
    #[builder(default = Duration::from_secs(3600))]
    signed_url_ttl: Duration,
    #[builder(default = 3)]
    max_concurrency: usize,
    metrics: Option<Arc<Metrics>>,
}

impl ScreenshotExtractor {
    pub fn from_config(
        http: HttpClient,
        storage: StorageClient,
        config: &ScreenshotConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::builder()
            .http(http)
            .storage(storage)
            .frame_urls(FrameUrlBuilder::new(
                &config.cdn_base_url,
                &config.cloud_name,
                config.signing_secret.clone(),
            ))
            .fallback_url(
                config
                    .fallback_image_url
                    .clone()
                    .unwrap_or_else(default_fallback_image),
            )
            .signed_url_ttl(config.signed_url_ttl())
            .max_concurrency(config.max_concurrency)
            .metrics(metrics)
            .build()
    }

    /// Fetch one frame, store it and return a time-limited URL to it
    async fn capture(&self, video_url: &str, timestamp: u32) -> Result<String, ScreenshotError> {
        let frame_url = self.frame_urls.frame_url(video_url, timestamp);
        let image = self.http.get_bytes(&frame_url).await?;

        let key = format!("screenshot_{}_{}s.jpg", unique_prefix(), timestamp);
        self.storage.upload(&key, image).await?;

        let url = self.storage.signed_url(&key, self.signed_url_ttl).await?;
        debug!(timestamp, key = %key, "Captured screenshot");
        Ok(url)
    }

    async fn capture_or_fallback(&self, index: usize, video_url: &str, timestamp: u32) -> Screenshot {
        let url = match self.capture(video_url, timestamp).await {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    timestamp,
                    kind = %e.kind(),
                    error = %e,
                    "Screenshot capture failed, using fallback image"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.screenshot_fallback();
                }
                self.fallback_url.clone()
            }
        };
        Screenshot::for_step(index, timestamp, url)
    }
}

#[async_trait]
impl ScreenshotSource for ScreenshotExtractor {
    async fn extract(&self, video_url: &str, timestamps: &[u32]) -> Vec<Screenshot> {
        info!(count = timestamps.len(), "Extracting screenshots");

        let captures: Vec<_> = timestamps
            .iter()
            .enumerate()
            .map(|(index, &timestamp)| self.capture_or_fallback(index, video_url, timestamp))
            .collect();

        stream::iter(captures)
            .buffered(self.max_concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;

    #[test]
    fn test_default_fallback_is_inline_svg() {
        let url = default_fallback_image();
        assert!(url.starts_with("data:image/svg+xml;base64,"));
        let decoded = STANDARD
            .decode(url.trim_start_matches("data:image/svg+xml;base64,"))
            .unwrap();
        assert!(String::from_utf8(decoded).unwrap().contains("Screenshot unavailable"));
    }

    #[tokio::test]
    async fn test_unreachable_cdn_yields_fallback_per_timestamp() {
        let metrics = Arc::new(Metrics::new());
        let settings = HttpSettings {
            connect_timeout_secs: 1,
            request_timeout_secs: 2,
            ..HttpSettings::default()
        };
        let extractor = ScreenshotExtractor::builder()
            .http(HttpClient::new(&settings).unwrap())
            .storage(StorageClient::in_memory("screenshots", "http://localhost"))
            .frame_urls(FrameUrlBuilder::new("http://127.0.0.1:9", "demo", None))
            .fallback_url("https://fallback/img.png".to_string())
            .metrics(metrics.clone())
            .build();

        let shots = extractor.extract("https://v/x.mp4", &[5, 15]).await;

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].id, "screenshot_0");
        assert_eq!(shots[1].timestamp, 15);
        assert!(shots.iter().all(|s| s.url == "https://fallback/img.png"));
        assert_eq!(metrics.snapshot().screenshot_fallbacks, 2);
    }
}
