//! Gemini Files API + generateContent adapter

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::parse::parse_model_output;
use super::prompt::build_prompt;
use super::{AnalyzerError, Result, VideoAnalyzer};
use crate::config::GeminiConfig;
use crate::http::{HttpClient, truncate};
use crate::manual::{AnalysisResult, ProcessingRequest};

const DISPLAY_NAME: &str = "uploaded_video.mp4";
const DEFAULT_VIDEO_MIME: &str = "video/mp4";
const UPLOAD_URL_HEADERS: [&str; 2] = ["x-goog-upload-url", "x-gupload-upload-url"];

#[derive(Debug, Deserialize)]
struct UploadedFileEnvelope {
    file: Option<UploadedFile>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileStatus {
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Video downloaded from the caller's URL
struct FetchedVideo {
    bytes: Bytes,
    mime_type: String,
}

/// Analyzes videos with a hosted Gemini model
#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    client: Client,
    api_key: String,
    base_url: String,
    upload_base_url: String,
    model: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiAnalyzer {
    pub fn new(http: &HttpClient, config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(AnalyzerError::MissingApiKey)?;

        Ok(Self {
            client: http.inner().clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            poll_interval: config.poll_interval(),
            max_poll_attempts: config.max_poll_attempts,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    async fn fetch_video(&self, video_url: &str) -> Result<FetchedVideo> {
        let response = self
            .client
            .get(video_url)
            .send()
            .await
            .map_err(|e| AnalyzerError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Fetch(describe_failure(response).await));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok())
            .filter(|m| m.type_() == mime::VIDEO)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AnalyzerError::Fetch(e.to_string()))?;

        info!(size = bytes.len(), mime_type = %mime_type, "Downloaded video for analysis");
        Ok(FetchedVideo { bytes, mime_type })
    }

    /// Open a resumable upload session and return its upload URL
    async fn start_upload(&self, video: &FetchedVideo) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/files", self.upload_base_url))
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Type", &video.mime_type)
            .header(
                "X-Goog-Upload-Header-Content-Length",
                video.bytes.len().to_string(),
            )
            .json(&json!({ "file": { "display_name": DISPLAY_NAME } }))
            .send()
            .await
            .map_err(|e| AnalyzerError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Upload(describe_failure(response).await));
        }

        if let Some(url) = upload_url_from_headers(response.headers()) {
            debug!("Upload session started");
            return Ok(url);
        }

        let body = response.text().await.unwrap_or_default();
        upload_url_from_body(&body)
            .ok_or_else(|| AnalyzerError::Upload("No upload URL received from Gemini".to_string()))
    }

    /// Send the bytes and finalize; returns the remote file URI
    async fn upload_content(&self, upload_url: &str, video: FetchedVideo) -> Result<String> {
        let size = video.bytes.len();
        let response = self
            .client
            .put(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(video.bytes)
            .send()
            .await
            .map_err(|e| AnalyzerError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Upload(describe_failure(response).await));
        }

        let envelope: UploadedFileEnvelope = response
            .json()
            .await
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;

        let uri = envelope
            .file
            .and_then(|f| f.uri)
            .ok_or_else(|| AnalyzerError::InvalidResponse("upload result has no file.uri".into()))?;

        info!(size, file_uri = %uri, "Video uploaded to Gemini");
        Ok(uri)
    }

    /// Wait until the uploaded file is ACTIVE
    async fn wait_until_active(&self, file_uri: &str) -> Result<()> {
        let file_name = file_uri.rsplit('/').next().unwrap_or(file_uri);
        let status_url = format!("{}/files/{}", self.base_url, file_name);

        for attempt in 1..=self.max_poll_attempts {
            match self
                .client
                .get(&status_url)
                .query(&[("key", self.api_key.as_str())])
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    let state = response
                        .json::<FileStatus>()
                        .await
                        .ok()
                        .and_then(|s| s.state)
                        .unwrap_or_default();
                    debug!(attempt, state = %state, "Polled file state");

                    match state.as_str() {
                        "ACTIVE" => return Ok(()),
                        "FAILED" => return Err(AnalyzerError::ProcessingFailed),
                        _ => {}
                    }
                }
                Ok(response) => {
                    warn!(attempt, status = %response.status(), "File status poll was not OK");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "File status poll failed");
                }
            }

            if attempt < self.max_poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(AnalyzerError::Timeout {
            attempts: self.max_poll_attempts,
        })
    }

    async fn generate(&self, file_uri: &str, mime_type: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "fileData": { "mimeType": mime_type, "fileUri": file_uri } },
                    { "text": prompt }
                ]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalyzerError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Generation(describe_failure(response).await));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::InvalidResponse(e.to_string()))?;

        extract_text(data)
    }
}

#[async_trait]
impl VideoAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, request: &ProcessingRequest) -> Result<AnalysisResult> {
        info!(
            language = %request.language,
            detail_level = %request.detail_level,
            model = %self.model,
            "Starting video analysis"
        );

        let video = self.fetch_video(&request.video_url).await?;
        let mime_type = video.mime_type.clone();
        let upload_url = self.start_upload(&video).await?;
        let file_uri = self.upload_content(&upload_url, video).await?;

        self.wait_until_active(&file_uri).await?;

        let prompt = build_prompt(request.language, request.detail_level);
        let text = self.generate(&file_uri, &mime_type, &prompt).await?;

        let result = parse_model_output(&text, request.language);
        info!(
            screenshots = result.screenshot_timestamps.len(),
            "Video analysis completed"
        );
        Ok(result)
    }
}

fn upload_url_from_headers(headers: &HeaderMap) -> Option<String> {
    UPLOAD_URL_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn upload_url_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["uploadUrl", "upload_url"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn extract_text(data: GenerateResponse) -> Result<String> {
    let candidate = data
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AnalyzerError::InvalidResponse("No candidates found".into()))?;

    let part = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .ok_or_else(|| AnalyzerError::InvalidResponse("Invalid candidate structure".into()))?;

    part.text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AnalyzerError::InvalidResponse("No text content found".into()))
}

async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("HTTP {} - {}", status, truncate(&body, 512))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_upload_url_header_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-gupload-upload-url",
            HeaderValue::from_static("https://second"),
        );
        assert_eq!(
            upload_url_from_headers(&headers).as_deref(),
            Some("https://second")
        );

        headers.insert("x-goog-upload-url", HeaderValue::from_static("https://first"));
        assert_eq!(
            upload_url_from_headers(&headers).as_deref(),
            Some("https://first")
        );
    }

    #[test]
    fn test_upload_url_from_body() {
        assert_eq!(
            upload_url_from_body(r#"{"upload_url": "https://u"}"#).as_deref(),
            Some("https://u")
        );
        assert_eq!(upload_url_from_body("not json"), None);
        assert_eq!(upload_url_from_body("{}"), None);
    }

    #[test]
    fn test_extract_text_requires_full_structure() {
        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            extract_text(empty),
            Err(AnalyzerError::InvalidResponse(_))
        ));

        let no_parts: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": []}}]}"#).unwrap();
        assert!(matches!(
            extract_text(no_parts),
            Err(AnalyzerError::InvalidResponse(_))
        ));

        let ok: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(ok).unwrap(), "hello");
    }

    #[test]
    fn test_new_requires_api_key() {
        let http = HttpClient::new(&Default::default()).unwrap();
        let config = GeminiConfig::default();
        assert!(matches!(
            GeminiAnalyzer::new(&http, &config),
            Err(AnalyzerError::MissingApiKey)
        ));
    }
}
