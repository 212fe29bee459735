//! Remote video analysis
//!
//! A [`VideoAnalyzer`] turns a video URL into Markdown with
//! `PLACEHOLDER_IMAGE_<i>` tokens plus the timestamps to capture for them.

pub mod gemini;
pub mod parse;
pub mod prompt;

pub use gemini::GeminiAnalyzer;
pub use parse::{DEFAULT_TIMESTAMPS, parse_model_output};
pub use prompt::build_prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::manual::{AnalysisResult, ProcessingRequest};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Failed to fetch video from URL: {0}")]
    Fetch(String),

    #[error("Failed to upload video to Gemini: {0}")]
    Upload(String),

    #[error("Video processing failed")]
    ProcessingFailed,

    #[error("Video processing timeout after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Gemini content generation error: {0}")]
    Generation(String),

    #[error("Invalid response from Gemini API: {0}")]
    InvalidResponse(String),
}

impl AnalyzerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzerError::MissingApiKey => ErrorKind::Internal,
            AnalyzerError::Fetch(_) => ErrorKind::Fetch,
            AnalyzerError::Upload(_) => ErrorKind::Upload,
            AnalyzerError::ProcessingFailed => ErrorKind::Internal,
            AnalyzerError::Timeout { .. } => ErrorKind::Timeout,
            AnalyzerError::Generation(_) => ErrorKind::Fetch,
            AnalyzerError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[async_trait]
pub trait VideoAnalyzer: Send + Sync {
    async fn analyze(&self, request: &ProcessingRequest) -> Result<AnalysisResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(AnalyzerError::Fetch("x".into()).kind(), ErrorKind::Fetch);
        assert_eq!(
            AnalyzerError::Timeout { attempts: 30 }.kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            AnalyzerError::InvalidResponse("x".into()).kind(),
            ErrorKind::InvalidResponse
        );
    }
}
