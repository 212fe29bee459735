//! Wire models for the manualgen HTTP API.
//!
//! Every endpoint except `/cleanup-videos` and `/health` answers with the
//! [`ApiResponse`] envelope:
//!
//! ```json
//! {
//!   "success": false,
//!   "error": "Failed to fetch video from URL: HTTP 404 Not Found - ",
//!   "errorKind": "fetch",
//!   "stage": "analysis"
//! }
//! ```
//!
//! - `POST /upload` returns `data: {url, key}` ([`UploadedVideo`])
//! - `POST /process-video` accepts [`ProcessVideoBody`] and returns
//!   `data: {manualContent, screenshots}`
//! - `errorKind` / `stage` are only present on failures and let clients pick
//!   a message without parsing `error`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cleanup::CleanupReport;
use crate::error::{ErrorKind, Stage};
use crate::observability::MetricsSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            stage: None,
        }
    }

    pub fn failure(error: impl Into<String>, kind: ErrorKind, stage: Option<Stage>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_kind: Some(kind),
            stage,
        }
    }
}

/// Header carrying the original (url-encoded) file name of an upload
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Raw `POST /process-video` body; fields are checked by `validation`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoBody {
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub detail_level: Option<String>,
}

/// Result of `POST /upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedVideo {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: CleanupReport,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
