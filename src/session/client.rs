//! HTTP client for the manualgen API

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::de::{DeserializeOwned, IgnoredAny};
use thiserror::Error;
use tracing::{debug, info};

use super::video::VideoAsset;
use crate::api::models::{ApiResponse, CleanupResponse, FILE_NAME_HEADER, UploadedVideo};
use crate::cleanup::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sign};
use crate::config::HttpSettings;
use crate::error::{ErrorKind, Stage};
use crate::http::{HttpClient, truncate};
use crate::manual::ProcessingRequest;
use crate::pipeline::ProcessedManual;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error envelope or a non-2xx status
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        kind: ErrorKind,
        stage: Option<Stage>,
    },

    /// The request never produced a response
    #[error("{message}")]
    Transport {
        stage: Option<Stage>,
        message: String,
    },

    #[error("Request timed out")]
    TimedOut { stage: Option<Stage> },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Api { kind, .. } => *kind,
            ClientError::Transport { .. } => ErrorKind::Fetch,
            ClientError::TimedOut { .. } => ErrorKind::Timeout,
            ClientError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            ClientError::Api { stage, .. }
            | ClientError::Transport { stage, .. }
            | ClientError::TimedOut { stage } => *stage,
            ClientError::InvalidResponse(_) => None,
        }
    }

    /// No HTTP response was received
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport { .. } | ClientError::TimedOut { .. }
        )
    }

    fn from_reqwest(err: reqwest::Error, stage: Option<Stage>) -> Self {
        if err.is_timeout() {
            ClientError::TimedOut { stage }
        } else {
            ClientError::Transport {
                stage,
                message: err.to_string(),
            }
        }
    }
}

/// Stores a selected video and returns where it can be fetched from
#[async_trait]
pub trait VideoUploader: Send + Sync {
    async fn upload(&self, video: &VideoAsset) -> Result<UploadedVideo, ClientError>;
}

/// Turns an uploaded video into manual content
#[async_trait]
pub trait ManualService: Send + Sync {
    async fn process(&self, request: &ProcessingRequest) -> Result<ProcessedManual, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, settings: &HttpSettings) -> Result<Self, ClientError> {
        let http = HttpClient::new(settings).map_err(|e| ClientError::Transport {
            stage: None,
            message: e.to_string(),
        })?;

        Ok(Self::with_client(http.inner().clone(), base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server to delete expired objects, signing the request with `secret`
    pub async fn cleanup(&self, secret: &str) -> Result<CleanupResponse, ClientError> {
        let stage = Some(Stage::Cleanup);
        let body = b"{}".to_vec();
        let timestamp = Utc::now().timestamp();
        let signature = sign(secret, timestamp, &body);

        let response = self
            .client
            .post(self.endpoint("cleanup-videos"))
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(TIMESTAMP_HEADER, timestamp.to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, stage))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(e, stage))?;

        if status.is_success() {
            return serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }

        Err(error_from_body(status, &bytes, stage))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl VideoUploader for ApiClient {
    async fn upload(&self, video: &VideoAsset) -> Result<UploadedVideo, ClientError> {
        let stage = Some(Stage::Upload);
        debug!(file = %video.file_name, size = video.size, "Uploading video");

        let response = self
            .client
            .post(self.endpoint("upload"))
            .header(CONTENT_TYPE, &video.mime_type)
            .header(FILE_NAME_HEADER, urlencoding::encode(&video.file_name).into_owned())
            .body(video.bytes.clone())
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, stage))?;

        let uploaded: UploadedVideo = read_envelope(response, stage).await?;
        info!(key = %uploaded.key, "Video uploaded");
        Ok(uploaded)
    }
}

#[async_trait]
impl ManualService for ApiClient {
    async fn process(&self, request: &ProcessingRequest) -> Result<ProcessedManual, ClientError> {
        debug!(
            language = %request.language,
            detail_level = %request.detail_level,
            "Requesting manual generation"
        );

        let response = self
            .client
            .post(self.endpoint("process-video"))
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, None))?;

        read_envelope(response, None).await
    }
}

/// Decode the `{success, data, error, errorKind, stage}` envelope.
///
/// `stage` is used when the server did not say which stage failed.
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    stage: Option<Stage>,
) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_reqwest(e, stage))?;

    if status.is_success() {
        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        if envelope.success {
            return envelope
                .data
                .ok_or_else(|| ClientError::InvalidResponse("missing data".to_string()));
        }
        return Err(api_error(status, envelope, stage));
    }

    Err(error_from_body(status, &bytes, stage))
}

fn error_from_body(status: StatusCode, bytes: &[u8], stage: Option<Stage>) -> ClientError {
    match serde_json::from_slice::<ApiResponse<IgnoredAny>>(bytes) {
        Ok(envelope) => api_error(status, envelope, stage),
        Err(_) => {
            let text = String::from_utf8_lossy(bytes);
            let message = if text.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                truncate(text.trim(), 200)
            };
            ClientError::Api {
                status: status.as_u16(),
                message,
                kind: kind_for_status(status),
                stage,
            }
        }
    }
}

fn api_error<T>(status: StatusCode, envelope: ApiResponse<T>, stage: Option<Stage>) -> ClientError {
    ClientError::Api {
        status: status.as_u16(),
        message: envelope
            .error
            .unwrap_or_else(|| format!("HTTP {}", status)),
        kind: envelope.error_kind.unwrap_or_else(|| kind_for_status(status)),
        stage: envelope.stage.or(stage),
    }
}

fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Auth,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ErrorKind::Timeout,
        _ => ErrorKind::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::{DetailLevel, GenerationOptions, Language};
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use bytes::Bytes;
    use serde_json::json;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn request() -> ProcessingRequest {
        ProcessingRequest::new(
            "http://videos/1_a.mp4",
            GenerationOptions {
                language: Language::En,
                detail_level: DetailLevel::Detailed,
            },
        )
    }

    #[tokio::test]
    async fn test_upload_sends_raw_body_and_encoded_name() {
        let app = Router::new().route(
            "/upload",
            post(|headers: HeaderMap, body: Bytes| async move {
                let name = headers.get("x-file-name").unwrap().to_str().unwrap().to_string();
                let mime = headers.get("content-type").unwrap().to_str().unwrap().to_string();
                Json(json!({
                    "success": true,
                    "data": {"url": format!("{}|{}|{}", name, mime, body.len()), "key": "k"}
                }))
            }),
        );
        let client = ApiClient::with_client(Client::new(), spawn(app).await);

        let video = VideoAsset::new("操作 demo.mp4", "video/mp4", Bytes::from_static(b"abc"));
        let uploaded = client.upload(&video).await.unwrap();

        assert_eq!(uploaded.key, "k");
        assert_eq!(
            uploaded.url,
            "%E6%93%8D%E4%BD%9C%20demo.mp4|video/mp4|3"
        );
    }

    #[tokio::test]
    async fn test_process_maps_error_envelope() {
        let app = Router::new().route(
            "/process-video",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Video processing timeout",
                        "errorKind": "timeout",
                        "stage": "analysis"
                    })),
                )
            }),
        );
        let client = ApiClient::with_client(Client::new(), spawn(app).await);

        let err = client.process(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.stage(), Some(Stage::Analysis));
        assert_eq!(err.to_string(), "Video processing timeout");
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_plain_text_errors_use_status_kind() {
        let app = Router::new().route(
            "/upload",
            post(|| async { (StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded") }),
        );
        let client = ApiClient::with_client(Client::new(), spawn(app).await);

        let video = VideoAsset::new("a.mp4", "video/mp4", Bytes::from_static(b"abc"));
        let err = client.upload(&video).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.stage(), Some(Stage::Upload));
        assert_eq!(err.to_string(), "length limit exceeded");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client = ApiClient::with_client(Client::new(), "http://127.0.0.1:9");
        let err = client.process(&request()).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.stage(), None);
    }

    #[tokio::test]
    async fn test_success_without_data_is_invalid() {
        let app = Router::new().route(
            "/process-video",
            post(|| async { Json(json!({"success": true})) }),
        );
        let client = ApiClient::with_client(Client::new(), spawn(app).await);

        let err = client.process(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::with_client(Client::new(), "http://localhost:8080/");
        assert_eq!(client.endpoint("upload"), "http://localhost:8080/upload");
    }
}
