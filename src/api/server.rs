use std::net::SocketAddr;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{error, info};

use super::{
    models::FILE_NAME_HEADER,
    services::{cleanup_videos, get_object, health, process_video, upload_video},
    state::AppState,
};
use crate::cleanup::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::config::Config;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes and middleware for the API, without binding a socket
pub fn router(state: AppState) -> Router {
    let max_pipelines = state.config.server.max_concurrent_pipelines.max(1);

    Router::new()
        .route("/upload", post(upload_video))
        .route(
            "/process-video",
            post(process_video).layer(ConcurrencyLimitLayer::new(max_pipelines)),
        )
        .route("/cleanup-videos", post(cleanup_videos))
        .route("/objects/{bucket}/{*key}", get(get_object))
        .route("/health", get(health))
        .with_state(state)
        // Decompress gzip request bodies before handlers read them
        .layer(RequestDecompressionLayer::new())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderName::from_static(FILE_NAME_HEADER),
        ])
}

pub async fn run(config: Config, address: SocketAddr) -> Result<(), AnyError> {
    config
        .validate_secrets()
        .map_err(|e| format!("Refusing to start: {}", e))?;

    info!("Initializing application state");
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "manualgen API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
