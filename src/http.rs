//! Shared outbound HTTP client
//!
//! One `reqwest::Client` is built from [`HttpSettings`] and cloned into every
//! adapter. Nothing here retries: a failed call is reported to the caller.

use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::HttpSettings;
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Connection timeout")]
    Timeout,

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidConfig(_) => ErrorKind::Internal,
            _ => ErrorKind::Fetch,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::RequestFailed(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Thin wrapper around a configured `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(&settings.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;

        Ok(Self { client })
    }

    /// Underlying client for adapters that need custom requests
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET a URL and return its body; non-2xx responses are errors
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        debug!("Starting download");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        debug!(size = bytes.len(), "Download completed");

        Ok(bytes)
    }
}

/// Clip remote error bodies before they end up in logs or error messages
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
