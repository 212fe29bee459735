use super::models::{Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Storage provider is S3 but missing credentials (access_key or secret_key)")]
    MissingS3Credentials,

    #[error("Videos and screenshots must use different buckets (both are '{bucket}')")]
    SharedBucket { bucket: String },

    #[error("Bucket name must not be empty: {field}")]
    EmptyBucketName { field: &'static str },

    #[error("public_base_url must be an http(s) URL, got '{url}'")]
    InvalidPublicBaseUrl { url: String },

    #[error("At least one allowed video mime type is required")]
    NoAllowedMimeTypes,

    #[error("Mime type '{value}' is not a video type")]
    NonVideoMimeType { value: String },

    #[error("max_video_bytes must be positive")]
    InvalidMaxVideoBytes,

    #[error("Polling must be bounded: {field} = {value}")]
    InvalidPolling { field: &'static str, value: u64 },

    #[error("screenshots.cloud_name is required")]
    MissingCloudName,

    #[error("{field} must be at least 1")]
    ZeroConcurrency { field: &'static str },

    #[error("Retention window must be positive: {field} = {value}")]
    InvalidRetention { field: &'static str, value: u64 },

    #[error("Missing secret: {env_var} environment variable is not set")]
    MissingSecret { env_var: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_storage(config)?;
    validate_limits(config)?;
    validate_gemini(config)?;
    validate_screenshots(config)?;
    validate_cleanup(config)?;
    Ok(())
}

/// The subset a client process relies on: upload limits only
pub fn validate_client(config: &Config) -> Result<(), ValidationError> {
    validate_limits(config)
}

/// Secrets the server cannot run without. Client-only commands skip this.
pub fn validate_secrets(config: &Config) -> Result<(), ValidationError> {
    if config.gemini.api_key.is_none() {
        return Err(ValidationError::MissingSecret {
            env_var: "GEMINI_API_KEY",
        });
    }
    if config.cleanup.secret.is_none() {
        return Err(ValidationError::MissingSecret {
            env_var: "CLEANUP_SECRET",
        });
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    let storage = &config.storage;

    if storage.videos_bucket.trim().is_empty() {
        return Err(ValidationError::EmptyBucketName {
            field: "storage.videos_bucket",
        });
    }
    if storage.screenshots_bucket.trim().is_empty() {
        return Err(ValidationError::EmptyBucketName {
            field: "storage.screenshots_bucket",
        });
    }
    if storage.videos_bucket == storage.screenshots_bucket {
        return Err(ValidationError::SharedBucket {
            bucket: storage.videos_bucket.clone(),
        });
    }

    if !storage.public_base_url.starts_with("http://")
        && !storage.public_base_url.starts_with("https://")
    {
        return Err(ValidationError::InvalidPublicBaseUrl {
            url: storage.public_base_url.clone(),
        });
    }

    if storage.provider == StorageProvider::S3
        && (storage.access_key.is_none() || storage.secret_key.is_none())
    {
        return Err(ValidationError::MissingS3Credentials);
    }

    Ok(())
}

fn validate_limits(config: &Config) -> Result<(), ValidationError> {
    if config.limits.max_video_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxVideoBytes);
    }

    if config.limits.allowed_mime_types.is_empty() {
        return Err(ValidationError::NoAllowedMimeTypes);
    }

    for value in &config.limits.allowed_mime_types {
        let is_video = value
            .parse::<mime::Mime>()
            .map(|m| m.type_() == mime::VIDEO)
            .unwrap_or(false);
        if !is_video {
            return Err(ValidationError::NonVideoMimeType {
                value: value.clone(),
            });
        }
    }

    Ok(())
}

fn validate_gemini(config: &Config) -> Result<(), ValidationError> {
    if config.gemini.max_poll_attempts == 0 {
        return Err(ValidationError::InvalidPolling {
            field: "gemini.max_poll_attempts",
            value: 0,
        });
    }
    Ok(())
}

fn validate_screenshots(config: &Config) -> Result<(), ValidationError> {
    if config.screenshots.cloud_name.trim().is_empty() {
        return Err(ValidationError::MissingCloudName);
    }
    if config.screenshots.max_concurrency == 0 {
        return Err(ValidationError::ZeroConcurrency {
            field: "screenshots.max_concurrency",
        });
    }
    if config.server.max_concurrent_pipelines == 0 {
        return Err(ValidationError::ZeroConcurrency {
            field: "server.max_concurrent_pipelines",
        });
    }
    Ok(())
}

fn validate_cleanup(config: &Config) -> Result<(), ValidationError> {
    if config.cleanup.retention_minutes == 0 {
        return Err(ValidationError::InvalidRetention {
            field: "cleanup.retention_minutes",
            value: 0,
        });
    }
    if config.cleanup.max_clock_skew_secs == 0 {
        return Err(ValidationError::InvalidRetention {
            field: "cleanup.max_clock_skew_secs",
            value: 0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.screenshots.cloud_name = "demo".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_cloud_name() {
        let config = Config::default();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingCloudName)
        ));
    }

    #[test]
    fn test_shared_bucket_rejected() {
        let mut config = valid_config();
        config.storage.screenshots_bucket = config.storage.videos_bucket.clone();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::SharedBucket { .. })
        ));
    }

    #[test]
    fn test_s3_requires_credentials() {
        let mut config = valid_config();
        config.storage.provider = StorageProvider::S3;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingS3Credentials)
        ));

        config.storage.access_key = Some("key".to_string());
        config.storage.secret_key = Some("secret".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_non_video_mime_type_rejected() {
        let mut config = valid_config();
        config.limits.allowed_mime_types.push("image/png".to_string());
        assert!(matches!(
            validate(&config),
            Err(ValidationError::NonVideoMimeType { .. })
        ));
    }

    #[test]
    fn test_zero_poll_attempts_rejected() {
        let mut config = valid_config();
        config.gemini.max_poll_attempts = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidPolling { .. })
        ));
    }

    #[test]
    fn test_client_validation_ignores_server_sections() {
        let config = Config::default();
        assert!(validate_client(&config).is_ok());

        let mut config = Config::default();
        config.limits.allowed_mime_types.clear();
        assert!(matches!(
            validate_client(&config),
            Err(ValidationError::NoAllowedMimeTypes)
        ));
    }

    #[test]
    fn test_secrets_required_for_server() {
        let mut config = valid_config();
        assert!(matches!(
            validate_secrets(&config),
            Err(ValidationError::MissingSecret {
                env_var: "GEMINI_API_KEY"
            })
        ));

        config.gemini.api_key = Some("key".to_string());
        assert!(matches!(
            validate_secrets(&config),
            Err(ValidationError::MissingSecret {
                env_var: "CLEANUP_SECRET"
            })
        ));

        config.cleanup.secret = Some("secret".to_string());
        assert!(validate_secrets(&config).is_ok());
    }
}
