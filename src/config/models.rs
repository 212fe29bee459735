use crate::humanize::ByteSize;
use crate::manual::PlaceholderPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub limits: UploadLimits,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub screenshots: ScreenshotConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Upper bound for JSON request bodies (video uploads use `limits`)
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: ByteSize,
    /// Pipelines allowed to run at once on this instance
    #[serde(default = "default_max_concurrent_pipelines")]
    pub max_concurrent_pipelines: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_request_bytes: default_max_request_bytes(),
            max_concurrent_pipelines: default_max_concurrent_pipelines(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_request_bytes() -> ByteSize {
    ByteSize::mebibytes(1)
}

fn default_max_concurrent_pipelines() -> usize {
    4
}

/// Storage provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    #[default]
    Local,
    Memory,
}

/// Storage configuration shared by the videos and screenshots buckets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_videos_bucket")]
    pub videos_bucket: String,
    #[serde(default = "default_screenshots_bucket")]
    pub screenshots_bucket: String,
    /// Base of publicly readable object URLs; `<base>/<bucket>/<key>`
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Root directory for the `local` provider
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Local,
            videos_bucket: default_videos_bucket(),
            screenshots_bucket: default_screenshots_bucket(),
            public_base_url: default_public_base_url(),
            local_root: default_local_root(),
            endpoint: None,
            region: None,
            access_key: None,
            secret_key: None,
        }
    }
}

fn default_videos_bucket() -> String {
    "videos".to_string()
}

fn default_screenshots_bucket() -> String {
    "screenshots".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/objects".to_string()
}

fn default_local_root() -> PathBuf {
    PathBuf::from("data/objects")
}

/// Limits applied to uploaded videos before any network call
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadLimits {
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: ByteSize,
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_video_bytes: default_max_video_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

fn default_max_video_bytes() -> ByteSize {
    ByteSize::mebibytes(500)
}

fn default_allowed_mime_types() -> Vec<String> {
    ["video/mp4", "video/quicktime", "video/x-msvideo", "video/webm"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Hosted multimodal model settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_upload_base_url")]
    pub upload_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Loaded from `GEMINI_API_KEY`
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl GeminiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            upload_base_url: default_gemini_upload_base_url(),
            model: default_gemini_model(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            api_key: None,
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_upload_base_url() -> String {
    "https://generativelanguage.googleapis.com/upload/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    30
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    2048
}

/// Frame-extraction CDN and screenshot persistence settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenshotConfig {
    #[serde(default = "default_cdn_base_url")]
    pub cdn_base_url: String,
    #[serde(default)]
    pub cloud_name: String,
    /// Substitute image for frames that could not be derived; defaults to an inline SVG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_image_url: Option<String>,
    #[serde(default = "default_signed_url_ttl_secs")]
    pub signed_url_ttl_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub placeholder_policy: PlaceholderPolicy,
    /// Loaded from `CLOUDINARY_API_SECRET`; enables signed delivery URLs
    #[serde(skip)]
    pub signing_secret: Option<String>,
}

impl ScreenshotConfig {
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            cdn_base_url: default_cdn_base_url(),
            cloud_name: String::new(),
            fallback_image_url: None,
            signed_url_ttl_secs: default_signed_url_ttl_secs(),
            max_concurrency: default_max_concurrency(),
            placeholder_policy: PlaceholderPolicy::default(),
            signing_secret: None,
        }
    }
}

fn default_cdn_base_url() -> String {
    "https://res.cloudinary.com".to_string()
}

fn default_signed_url_ttl_secs() -> u64 {
    3600
}

fn default_max_concurrency() -> usize {
    3
}

/// Retention sweep settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u32,
    #[serde(default = "default_max_clock_skew_secs")]
    pub max_clock_skew_secs: u64,
    /// Loaded from `CLEANUP_SECRET`
    #[serde(skip)]
    pub secret: Option<String>,
}

impl CleanupConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.retention_minutes))
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            retention_minutes: default_retention_minutes(),
            max_clock_skew_secs: default_max_clock_skew_secs(),
            secret: None,
        }
    }
}

fn default_retention_minutes() -> u32 {
    15
}

fn default_max_clock_skew_secs() -> u64 {
    300
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("manualgen/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.limits.max_video_bytes.as_u64(), 500 * 1024 * 1024);
        assert_eq!(config.limits.allowed_mime_types.len(), 4);
        assert_eq!(config.gemini.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.gemini.max_poll_attempts, 30);
        assert_eq!(config.screenshots.signed_url_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cleanup.retention(), chrono::Duration::minutes(15));
        assert_eq!(config.cleanup.max_clock_skew_secs, 300);
    }
}
