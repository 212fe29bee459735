//! Configuration management for manualgen
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use manualgen::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `MANUALGEN__<section>__<key>`
//!
//! Examples:
//! - `MANUALGEN__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `MANUALGEN__STORAGE__PROVIDER=s3`
//! - `MANUALGEN__LIMITS__MAX_VIDEO_BYTES=200MB`
//!
//! Secrets are read from plain environment variables only: `GEMINI_API_KEY`,
//! `CLOUDINARY_API_SECRET`, `CLEANUP_SECRET`, `S3_ACCESS_KEY`, `S3_SECRET_KEY`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/manualgen.toml`.
//! This can be overridden using the `MANUALGEN_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    CleanupConfig, Config, GeminiConfig, HttpSettings, ScreenshotConfig, ServerConfig,
    StorageConfig, StorageProvider, UploadLimits,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`MANUALGEN__*`)
    /// 2. TOML file (default: `config/manualgen.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration for client commands (`generate`, `cleanup`).
    ///
    /// Server-only sections such as `screenshots.cloud_name` are not required.
    pub fn load_for_client() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate_client(&config)?;
        Ok(config)
    }

    /// Check the secrets a server process needs
    pub fn validate_secrets(&self) -> Result<(), ConfigError> {
        validation::validate_secrets(self)?;
        Ok(())
    }

    /// Effective configuration as TOML. Secret fields are never serialized.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
