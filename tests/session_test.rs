//! Drives a `Session` through `ApiClient` against the real router on a local port.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use manualgen::analyzer::{AnalyzerError, VideoAnalyzer};
use manualgen::api::{AppState, router};
use manualgen::config::{Config, HttpSettings};
use manualgen::error::{ErrorKind, Stage};
use manualgen::manual::{
    AnalysisResult, DetailLevel, GenerationOptions, HtmlDocumentRenderer, Language,
    ProcessingRequest, Screenshot,
};
use manualgen::observability::Metrics;
use manualgen::pipeline::ManualPipeline;
use manualgen::screenshots::ScreenshotSource;
use manualgen::session::{
    ApiClient, ClientError, ProcessingStage, Session, SessionError, SessionStep, VideoAsset,
};
use manualgen::storage::StorageClient;

const PUBLIC_BASE: &str = "http://localhost:8080/objects";

struct StubAnalyzer {
    fail: bool,
}

#[async_trait]
impl VideoAnalyzer for StubAnalyzer {
    async fn analyze(&self, request: &ProcessingRequest) -> Result<AnalysisResult, AnalyzerError> {
        if self.fail {
            return Err(AnalyzerError::Timeout { attempts: 30 });
        }
        assert!(request.video_url.starts_with(&format!("{}/videos/", PUBLIC_BASE)));
        Ok(AnalysisResult {
            manual_content: format!(
                "# Checkout flow\n\n## Steps\n\n### 1. Open cart\n\n![Step 1](PLACEHOLDER_IMAGE_0)\n\n_{}_\n",
                request.detail_level
            ),
            screenshot_timestamps: vec![7],
        })
    }
}

struct StubScreenshots;

#[async_trait]
impl ScreenshotSource for StubScreenshots {
    async fn extract(&self, _video_url: &str, timestamps: &[u32]) -> Vec<Screenshot> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, t)| Screenshot::for_step(i, *t, format!("https://img.test/{}.jpg", t)))
            .collect()
    }
}

/// Serve the API on an ephemeral port and return a client for it
async fn spawn_server(fail_analysis: bool) -> (ApiClient, AppState) {
    let mut config = Config::default();
    config.cleanup.secret = Some("session-secret".to_string());

    let pipeline = ManualPipeline::builder()
        .analyzer(Arc::new(StubAnalyzer {
            fail: fail_analysis,
        }))
        .screenshots(Arc::new(StubScreenshots))
        .build();

    let state = AppState::new(
        config,
        StorageClient::in_memory("videos", PUBLIC_BASE),
        StorageClient::in_memory("screenshots", PUBLIC_BASE),
        pipeline,
        Arc::new(Metrics::new()),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ApiClient::new(format!("http://{}/", addr), &HttpSettings::default()).unwrap();
    (client, state)
}

fn session_with_video(language: Language) -> Session {
    let mut session = Session::new(Config::default().limits, true);
    session.set_options(GenerationOptions {
        language,
        detail_level: DetailLevel::Detailed,
    });
    session
        .select_file(VideoAsset::new(
            "checkout demo.mp4",
            "video/mp4",
            Bytes::from_static(b"not-really-a-video"),
        ))
        .unwrap();
    session
}

#[tokio::test]
async fn test_generate_end_to_end() {
    let (client, state) = spawn_server(false).await;
    let mut session = session_with_video(Language::En);
    session.set_consent(true);
    let progress = session.subscribe();

    let manual = session.generate(&client, &client).await.unwrap();

    assert_eq!(manual.title, "Checkout flow");
    assert_eq!(manual.language, Language::En);
    assert!(manual.content.contains("![Step 1](https://img.test/7.jpg)"));
    assert!(manual.content.contains("_detailed_"));
    assert_eq!(manual.screenshots.len(), 1);

    assert_eq!(session.step(), SessionStep::Result);
    assert_eq!(progress.borrow().stage, ProcessingStage::Completed);
    assert_eq!(progress.borrow().progress, 100);

    let uploaded = state.videos.list_older_than(chrono::Utc::now() + chrono::Duration::minutes(1));
    let (keys, total) = uploaded.await.unwrap();
    assert_eq!(total, 1);
    assert!(keys[0].ends_with("_checkout_demo.mp4"));
    assert_eq!(state.metrics.snapshot().manuals_generated, 1);

    let export = session.download_markdown().unwrap();
    assert!(export.file_name.ends_with(".md"));
    let document = session.render_document(&HtmlDocumentRenderer).unwrap();
    assert!(String::from_utf8_lossy(&document.bytes).contains("https://img.test/7.jpg"));
}

#[tokio::test]
async fn test_generate_requires_consent_before_any_request() {
    let (client, state) = spawn_server(false).await;
    let mut session = session_with_video(Language::Ja);

    let err = session.generate(&client, &client).await.unwrap_err();

    assert!(matches!(err, SessionError::ConsentRequired));
    assert_eq!(err.message(Language::Ja), "利用規約への同意が必要です");
    assert_eq!(session.step(), SessionStep::Upload);
    let (_, total) = state
        .videos
        .list_older_than(chrono::Utc::now())
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_server_side_timeout_moves_session_to_error() {
    let (client, state) = spawn_server(true).await;
    let mut session = session_with_video(Language::Ja);
    session.set_consent(true);

    let err = session.generate(&client, &client).await.unwrap_err();

    let SessionError::Client(client_err) = &err else {
        panic!("expected a client error, got {err:?}");
    };
    assert_eq!(client_err.kind(), ErrorKind::Timeout);
    assert_eq!(client_err.stage(), Some(Stage::Analysis));
    assert!(matches!(client_err, ClientError::Api { status: 500, .. }));

    assert_eq!(session.step(), SessionStep::Error);
    assert_eq!(session.error_message(), Some("タイムアウトしました"));
    assert_eq!(session.status().stage, ProcessingStage::Error);
    assert_eq!(session.status().progress, 0);
    assert!(session.download_markdown().is_err());
    assert_eq!(state.metrics.snapshot().manuals_failed, 1);
}

#[tokio::test]
async fn test_cleanup_through_client() {
    let (client, _state) = spawn_server(false).await;

    let response = client.cleanup("session-secret").await.unwrap();
    assert!(response.success);
    assert_eq!(response.report.videos.deleted, 0);

    let err = client.cleanup("wrong-secret").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
}
