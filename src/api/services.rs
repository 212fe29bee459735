use std::collections::BTreeMap;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{debug, info};

use super::{
    models::{
        ApiResponse, CleanupResponse, FILE_NAME_HEADER, HealthResponse, ProcessVideoBody,
        UploadedVideo,
    },
    state::AppState,
    utils::{
        check_content_length, content_type, content_type_for_key, extension_for_video, header_str,
        parse_content_type, parse_video_content_type,
    },
    validation::validate_process_request,
};
use crate::api::error::ApiError;
use crate::cleanup::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sweep, verify};
use crate::error::Stage;
use crate::pipeline::ProcessedManual;
use crate::storage::{StorageClient, StorageError};

/// Video upload endpoint (POST /upload)
///
/// The body is the raw video. `Content-Type` must be one of the allowed
/// video types and the size must stay under `limits.max_video_bytes`. The
/// optional `X-File-Name` header (url-encoded) names the stored object.
pub async fn upload_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<ApiResponse<UploadedVideo>>, ApiError> {
    let limits = &state.config.limits;
    let mime_type = parse_video_content_type(content_type(&headers)?, limits)?;

    let max_bytes = limits.max_video_bytes.as_u64();
    check_content_length(&headers, max_bytes)?;
    let data = read_body(body, max_bytes).await?;
    if data.is_empty() {
        return Err(ApiError::InvalidPayload("video body is empty".to_string()));
    }

    let file_name = header_str(&headers, FILE_NAME_HEADER)
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("video.{}", extension_for_video(&mime_type)));

    let size = data.len();
    let uploaded = state
        .videos
        .upload_video(data, &file_name)
        .await
        .map_err(|source| ApiError::Storage {
            stage: Stage::Upload,
            source,
        })?;

    info!(key = %uploaded.key, size, mime_type = %mime_type, "Video uploaded");

    Ok(Json(ApiResponse::ok(UploadedVideo {
        url: uploaded.url,
        key: uploaded.key,
    })))
}

/// Manual generation endpoint (POST /process-video)
///
/// Runs analysis, screenshot capture and assembly for a stored video and
/// answers with `{manualContent, screenshots}`. Missing fields are a 400;
/// pipeline failures are a 500 carrying `errorKind` and `stage`.
pub async fn process_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<ApiResponse<ProcessedManual>>, ApiError> {
    parse_content_type(content_type(&headers)?)?;

    let data = read_body(body, state.config.server.max_request_bytes.as_u64()).await?;
    let raw: ProcessVideoBody = serde_json::from_slice(&data)?;
    let request = validate_process_request(raw)?;

    info!(
        language = %request.language,
        detail_level = %request.detail_level,
        "Processing video"
    );
    debug!(video_url = %request.video_url, "Video source");

    match state.pipeline.process(&request).await {
        Ok(processed) => {
            state.metrics.manual_generated();
            Ok(Json(ApiResponse::ok(processed)))
        }
        Err(e) => {
            state.metrics.manual_failed();
            Err(e.into())
        }
    }
}

/// Retention sweep endpoint (POST /cleanup-videos)
///
/// Requires `X-Cleanup-Signature` and `X-Timestamp`; see [`crate::cleanup::sign`].
pub async fn cleanup_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<CleanupResponse>, ApiError> {
    let data = read_body(body, state.config.server.max_request_bytes.as_u64()).await?;

    let cleanup = &state.config.cleanup;
    let secret = cleanup
        .secret
        .as_deref()
        .ok_or_else(|| ApiError::Internal("cleanup secret is not configured".to_string()))?;

    verify(
        secret,
        header_str(&headers, SIGNATURE_HEADER),
        header_str(&headers, TIMESTAMP_HEADER),
        &data,
        Utc::now().timestamp(),
        cleanup.max_clock_skew_secs,
    )
    .map_err(ApiError::Unauthorized)?;

    let report = sweep(&state.videos, &state.screenshots, cleanup.retention())
        .await
        .map_err(|source| ApiError::Storage {
            stage: Stage::Cleanup,
            source,
        })?;

    state.metrics.objects_deleted(report.deleted_total() as u64);

    Ok(Json(CleanupResponse {
        success: true,
        report,
    }))
}

/// Stored object endpoint (GET /objects/{bucket}/{*key})
///
/// Lets the public URLs of the local and in-memory backends resolve.
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let storage = state
        .bucket(&bucket)
        .ok_or_else(|| ApiError::NotFound(format!("bucket {}", bucket)))?;

    let data = storage.download(&key).await.map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::NotFound(format!("{}/{}", bucket, key)),
        other => ApiError::Internal(other.to_string()),
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for_key(&key))], data))
}

/// Health check endpoint (GET /health)
///
/// Probes both buckets and reports the metric counters. Returns 503 if any
/// component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("videos_storage".to_string(), probe(&state.videos).await);
    components.insert(
        "screenshots_storage".to_string(),
        probe(&state.screenshots).await,
    );

    let all_healthy = components.values().all(|status| status == "healthy");
    let (status_code, overall_status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}

async fn probe(storage: &StorageClient) -> String {
    match storage.exists("health-probe").await {
        Ok(_) => "healthy".to_string(),
        Err(e) => {
            debug!(bucket = %storage.bucket(), error = %e, "Storage probe failed");
            "unhealthy".to_string()
        }
    }
}

/// Reads the request body, failing as soon as it grows past `limit`
///
/// Decompression is handled by `RequestDecompressionLayer`, so the limit
/// applies to the decoded size.
async fn read_body(body: Body, limit: u64) -> Result<Bytes, ApiError> {
    let max = usize::try_from(limit).unwrap_or(usize::MAX);

    match Limited::new(body, max).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge { limit })
        }
        Err(err) => Err(ApiError::InvalidPayload(format!(
            "failed to read request body: {}",
            err
        ))),
    }
}
