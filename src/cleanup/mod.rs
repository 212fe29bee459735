//! Retention sweep over the videos and screenshots buckets

pub mod signature;

pub use signature::{SIGNATURE_HEADER, SignatureError, TIMESTAMP_HEADER, sign, verify};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::storage::{StorageClient, StorageError};

/// Result for a single bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketReport {
    pub deleted: usize,
    pub total: usize,
    pub deleted_files: Vec<String>,
}

/// Screenshot cleanup either completes or reports why it did not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScreenshotOutcome {
    Swept(BucketReport),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub message: String,
    pub videos: BucketReport,
    pub screenshots: ScreenshotOutcome,
}

impl CleanupReport {
    pub fn deleted_total(&self) -> usize {
        let screenshots = match &self.screenshots {
            ScreenshotOutcome::Swept(report) => report.deleted,
            ScreenshotOutcome::Failed { .. } => 0,
        };
        self.videos.deleted + screenshots
    }
}

/// Delete objects older than `retention` from both buckets.
///
/// A failure on the videos bucket aborts the sweep; a failure on the
/// screenshots bucket is reported alongside the video results.
pub async fn sweep(
    videos: &StorageClient,
    screenshots: &StorageClient,
    retention: Duration,
) -> Result<CleanupReport, StorageError> {
    let cutoff = Utc::now() - retention;
    info!(%cutoff, "Starting cleanup");

    let video_report = sweep_bucket(videos, cutoff).await.inspect_err(|e| {
        error!(bucket = %videos.bucket(), error = %e, "Video cleanup failed");
    })?;

    let (screenshots, message) = match sweep_bucket(screenshots, cutoff).await {
        Ok(report) => {
            let message = format!(
                "Cleanup completed. Videos: {} deleted, Screenshots: {} deleted",
                video_report.deleted, report.deleted
            );
            (ScreenshotOutcome::Swept(report), message)
        }
        Err(e) => {
            error!(bucket = %screenshots.bucket(), error = %e, "Screenshot cleanup failed");
            let message = format!(
                "Deleted {} video files. Screenshot cleanup failed.",
                video_report.deleted
            );
            (ScreenshotOutcome::Failed { error: e.to_string() }, message)
        }
    };

    info!(%message, "Cleanup finished");
    Ok(CleanupReport {
        message,
        videos: video_report,
        screenshots,
    })
}

async fn sweep_bucket(
    storage: &StorageClient,
    cutoff: chrono::DateTime<Utc>,
) -> Result<BucketReport, StorageError> {
    let (expired, total) = storage.list_older_than(cutoff).await?;
    info!(
        bucket = %storage.bucket(),
        total,
        expired = expired.len(),
        "Listed bucket"
    );

    let deleted_files = if expired.is_empty() {
        Vec::new()
    } else {
        storage.delete_many(&expired).await
    };

    Ok(BucketReport {
        deleted: deleted_files.len(),
        total,
        deleted_files,
    })
}
