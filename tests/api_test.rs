use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use manualgen::analyzer::{AnalyzerError, VideoAnalyzer};
use manualgen::api::{AppState, router};
use manualgen::cleanup::{SIGNATURE_HEADER, TIMESTAMP_HEADER, sign};
use manualgen::config::{ByteSize, Config};
use manualgen::manual::{AnalysisResult, ProcessingRequest, Screenshot};
use manualgen::observability::Metrics;
use manualgen::pipeline::ManualPipeline;
use manualgen::screenshots::ScreenshotSource;
use manualgen::storage::StorageClient;

const CLEANUP_SECRET: &str = "test-cleanup-secret";

/// Analyzer that echoes the request into the manual, or fails with a timeout
struct ScriptedAnalyzer {
    fail: bool,
}

#[async_trait]
impl VideoAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, request: &ProcessingRequest) -> Result<AnalysisResult, AnalyzerError> {
        if self.fail {
            return Err(AnalyzerError::Timeout { attempts: 30 });
        }
        Ok(AnalysisResult {
            manual_content: format!(
                "# Manual for {}\n\n![Step 1](PLACEHOLDER_IMAGE_0)\n",
                request.detail_level
            ),
            screenshot_timestamps: vec![5],
        })
    }
}

struct StaticScreenshots;

#[async_trait]
impl ScreenshotSource for StaticScreenshots {
    async fn extract(&self, _video_url: &str, timestamps: &[u32]) -> Vec<Screenshot> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, t)| Screenshot::for_step(i, *t, format!("https://img.test/{}.jpg", t)))
            .collect()
    }
}

struct TestApp {
    app: Router,
    state: AppState,
}

fn build_test_app(fail_analysis: bool, max_video_bytes: u64) -> TestApp {
    let mut config = Config::default();
    config.screenshots.cloud_name = "demo".to_string();
    config.cleanup.secret = Some(CLEANUP_SECRET.to_string());
    config.limits.max_video_bytes = ByteSize(max_video_bytes);

    let public_base = "http://localhost:8080/objects";
    let videos = StorageClient::in_memory("videos", public_base);
    let screenshots = StorageClient::in_memory("screenshots", public_base);

    let pipeline = ManualPipeline::builder()
        .analyzer(Arc::new(ScriptedAnalyzer {
            fail: fail_analysis,
        }))
        .screenshots(Arc::new(StaticScreenshots))
        .build();

    let state = AppState::new(
        config,
        videos,
        screenshots,
        pipeline,
        Arc::new(Metrics::new()),
    );

    TestApp {
        app: router(state.clone()),
        state,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn process_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-video")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn cleanup_request(signature: Option<String>, timestamp: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/cleanup-videos")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    if let Some(timestamp) = timestamp {
        builder = builder.header(TIMESTAMP_HEADER, timestamp.to_string());
    }
    builder.body(Body::from("{}")).unwrap()
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let test = build_test_app(false, 1024);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/process-video")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "content-type,x-cleanup-signature",
        )
        .body(Body::empty())
        .unwrap();

    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    for name in [
        "authorization",
        "x-client-info",
        "apikey",
        "content-type",
        "x-cleanup-signature",
        "x-timestamp",
    ] {
        assert!(allowed.contains(name), "missing {} in {}", name, allowed);
    }
}

#[tokio::test]
async fn test_process_video_missing_fields_is_400() {
    let test = build_test_app(false, 1024);

    let (status, body) = send_json(
        &test.app,
        process_request(json!({"videoUrl": "https://v.test/x.mp4", "language": "ja"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required parameters");
    assert_eq!(body["errorKind"], "validation");
}

#[tokio::test]
async fn test_process_video_requires_json_content_type() {
    let test = build_test_app(false, 1024);

    let request = Request::builder()
        .method("POST")
        .uri("/process-video")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = send(&test.app, request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_process_video_returns_assembled_manual() {
    let test = build_test_app(false, 1024);

    let (status, body) = send_json(
        &test.app,
        process_request(json!({
            "videoUrl": "https://v.test/x.mp4",
            "language": "en",
            "detailLevel": "detailed"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"]["manualContent"],
        "# Manual for detailed\n\n![Step 1](https://img.test/5.jpg)\n"
    );
    assert_eq!(body["data"]["screenshots"][0]["stepNumber"], 1);
    assert_eq!(test.state.metrics.snapshot().manuals_generated, 1);
}

#[tokio::test]
async fn test_process_video_failure_carries_kind_and_stage() {
    let test = build_test_app(true, 1024);

    let (status, body) = send_json(
        &test.app,
        process_request(json!({
            "videoUrl": "https://v.test/x.mp4",
            "language": "ja",
            "detailLevel": "simple"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "timeout");
    assert_eq!(body["stage"], "analysis");
    assert_eq!(test.state.metrics.snapshot().manuals_failed, 1);
}

#[tokio::test]
async fn test_upload_stores_video_and_serves_it() {
    let test = build_test_app(false, 1024);

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "video/mp4")
        .header("x-file-name", "my%20demo.mp4")
        .body(Body::from("fake-mp4-bytes"))
        .unwrap();
    let (status, body) = send_json(&test.app, request).await;

    assert_eq!(status, StatusCode::OK);
    let key = body["data"]["key"].as_str().unwrap().to_string();
    assert!(key.ends_with("_my_demo.mp4"), "unexpected key {}", key);
    assert_eq!(
        body["data"]["url"],
        format!("http://localhost:8080/objects/videos/{}", key)
    );

    let request = Request::builder()
        .uri(format!("/objects/videos/{}", key))
        .body(Body::empty())
        .unwrap();
    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"fake-mp4-bytes");
}

#[tokio::test]
async fn test_upload_rejects_wrong_type_and_oversized_body() {
    let test = build_test_app(false, 8);

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from("png"))
        .unwrap();
    let (status, body) = send_json(&test.app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["errorKind"], "validation");

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "video/webm")
        .body(Body::from("more than eight bytes"))
        .unwrap();
    let (status, _) = send_json(&test.app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unknown_object_is_404() {
    let test = build_test_app(false, 1024);

    let request = Request::builder()
        .uri("/objects/videos/missing.mp4")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .uri("/objects/other-bucket/a.jpg")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_without_signature_is_unauthorized() {
    let test = build_test_app(false, 1024);

    let (status, body) = send_json(&test.app, cleanup_request(None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["errorKind"], "auth");
}

#[tokio::test]
async fn test_cleanup_with_stale_timestamp_is_unauthorized() {
    let test = build_test_app(false, 1024);

    let stale = Utc::now().timestamp() - 301;
    let signature = sign(CLEANUP_SECRET, stale, b"{}");
    let (status, _) = send_json(&test.app, cleanup_request(Some(signature), Some(stale))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_with_wrong_secret_is_unauthorized() {
    let test = build_test_app(false, 1024);

    let now = Utc::now().timestamp();
    let signature = sign("some-other-secret", now, b"{}");
    let (status, _) = send_json(&test.app, cleanup_request(Some(signature), Some(now))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_keeps_fresh_objects() {
    let test = build_test_app(false, 1024);
    test.state
        .videos
        .upload("1_fresh.mp4", Bytes::from_static(b"v"))
        .await
        .unwrap();

    let now = Utc::now().timestamp();
    let signature = sign(CLEANUP_SECRET, now, b"{}");
    let (status, body) = send_json(&test.app, cleanup_request(Some(signature), Some(now))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Cleanup completed. Videos: 0 deleted, Screenshots: 0 deleted"
    );
    assert_eq!(body["videos"]["deleted"], 0);
    assert_eq!(body["videos"]["total"], 1);
    assert_eq!(body["videos"]["deletedFiles"], json!([]));
    assert_eq!(body["screenshots"]["total"], 0);
    assert!(test.state.videos.exists("1_fresh.mp4").await.unwrap());
}

#[tokio::test]
async fn test_health_reports_components_and_metrics() {
    let test = build_test_app(false, 1024);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send_json(&test.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["videos_storage"], "healthy");
    assert_eq!(body["components"]["screenshots_storage"], "healthy");
    assert_eq!(body["metrics"]["manualsGenerated"], 0);
}
