//! Server-side manual generation: analyze, capture screenshots, assemble

use bon::Builder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::analyzer::{AnalyzerError, VideoAnalyzer};
use crate::error::{ErrorKind, Stage};
use crate::manual::{AssemblyError, PlaceholderPolicy, ProcessingRequest, Screenshot, assemble};
use crate::screenshots::ScreenshotSource;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Analysis(#[from] AnalyzerError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Analysis(e) => e.kind(),
            PipelineError::Assembly(e) => e.kind(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Analysis(_) => Stage::Analysis,
            PipelineError::Assembly(_) => Stage::Assembly,
        }
    }
}

/// Successful `POST /process-video` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedManual {
    pub manual_content: String,
    pub screenshots: Vec<Screenshot>,
}

#[derive(Builder)]
pub struct ManualPipeline {
    analyzer: Arc<dyn VideoAnalyzer>,
    screenshots: Arc<dyn ScreenshotSource>,
    #[builder(default)]
    placeholder_policy: PlaceholderPolicy,
}

impl ManualPipeline {
    pub async fn process(&self, request: &ProcessingRequest) -> Result<ProcessedManual, PipelineError> {
        let started = Instant::now();

        let analysis = self.analyzer.analyze(request).await?;

        let screenshots = self
            .screenshots
            .extract(&request.video_url, &analysis.screenshot_timestamps)
            .await;

        let manual_content = assemble(
            &analysis.manual_content,
            &screenshots,
            self.placeholder_policy,
        )?;

        info!(
            screenshots = screenshots.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Video processing completed"
        );

        Ok(ProcessedManual {
            manual_content,
            screenshots,
        })
    }
}
