use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::analyzer::{AnalyzerError, GeminiAnalyzer};
use crate::config::Config;
use crate::http::{FetchError, HttpClient};
use crate::observability::Metrics;
use crate::pipeline::ManualPipeline;
use crate::screenshots::ScreenshotExtractor;
use crate::storage::{StorageClient, StorageError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] FetchError),

    #[error("Failed to open storage: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to configure analyzer: {0}")]
    Analyzer(#[from] AnalyzerError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub videos: StorageClient,
    pub screenshots: StorageClient,
    pub pipeline: Arc<ManualPipeline>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        videos: StorageClient,
        screenshots: StorageClient,
        pipeline: ManualPipeline,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            videos,
            screenshots,
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }

    /// Wire the production clients from configuration
    pub fn from_config(config: Config) -> Result<Self, StartupError> {
        let metrics = Arc::new(Metrics::new());
        let http = HttpClient::new(&config.http)?;

        let videos = StorageClient::from_config(&config.storage, &config.storage.videos_bucket)?;
        let screenshots =
            StorageClient::from_config(&config.storage, &config.storage.screenshots_bucket)?;

        let analyzer = GeminiAnalyzer::new(&http, &config.gemini)?;
        let extractor = ScreenshotExtractor::from_config(
            http,
            screenshots.clone(),
            &config.screenshots,
            metrics.clone(),
        );

        let pipeline = ManualPipeline::builder()
            .analyzer(Arc::new(analyzer))
            .screenshots(Arc::new(extractor))
            .placeholder_policy(config.screenshots.placeholder_policy)
            .build();

        info!(
            provider = ?config.storage.provider,
            model = %config.gemini.model,
            "Application state initialized"
        );

        Ok(Self::new(config, videos, screenshots, pipeline, metrics))
    }

    /// Storage client for a bucket this server owns
    pub fn bucket(&self, name: &str) -> Option<&StorageClient> {
        [&self.videos, &self.screenshots]
            .into_iter()
            .find(|client| client.bucket() == name)
    }
}
