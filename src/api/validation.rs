use thiserror::Error;

use super::models::ProcessVideoBody;
use crate::manual::{DetailLevel, Language, ProcessingRequest};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("Missing required parameters")]
    MissingParameters,
    #[error("videoUrl must be an http/https url")]
    InvalidVideoUrl,
    #[error("{0}")]
    InvalidLanguage(String),
    #[error("{0}")]
    InvalidDetailLevel(String),
}

/// All three fields are required and must be non-empty
pub fn validate_process_request(
    body: ProcessVideoBody,
) -> Result<ProcessingRequest, RequestValidationError> {
    let (Some(video_url), Some(language), Some(detail_level)) =
        (non_empty(body.video_url), non_empty(body.language), non_empty(body.detail_level))
    else {
        return Err(RequestValidationError::MissingParameters);
    };

    if !video_url.starts_with("http://") && !video_url.starts_with("https://") {
        return Err(RequestValidationError::InvalidVideoUrl);
    }

    let language: Language = language
        .parse()
        .map_err(RequestValidationError::InvalidLanguage)?;
    let detail_level: DetailLevel = detail_level
        .parse()
        .map_err(RequestValidationError::InvalidDetailLevel)?;

    Ok(ProcessingRequest {
        video_url,
        language,
        detail_level,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
