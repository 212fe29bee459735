//! API utility functions
//!
//! Pure, stateless helpers for request processing, kept out of
//! `services.rs` so they can be unit tested.

use axum::http::{
    HeaderMap,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};

use crate::api::error::ApiError;
use crate::config::UploadLimits;

/// Parses and validates a Content-Type header for application/json
///
/// Accepts `application/json` with optional parameters; rejects
/// `application/jsonp`, `application/json-patch+json`, `text/json` and
/// malformed media types.
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::UnsupportedMediaType(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::UnsupportedMediaType(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Checks the declared video type against the allowed list; returns the
/// bare `type/subtype`
pub fn parse_video_content_type(content_type: &str, limits: &UploadLimits) -> Result<String, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::UnsupportedMediaType(format!("invalid Content-Type: {}", content_type))
    })?;
    let essence = media_type.essence_str().to_ascii_lowercase();

    if media_type.type_() != mime::VIDEO
        || !limits
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    {
        return Err(ApiError::UnsupportedMediaType(format!(
            "unsupported video type: {}",
            essence
        )));
    }

    Ok(essence)
}

/// Rejects a request whose declared `Content-Length` is already over `limit`
pub fn check_content_length(headers: &HeaderMap, limit: u64) -> Result<(), ApiError> {
    let declared = header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse::<u64>().ok());
    match declared {
        Some(length) if length > limit => Err(ApiError::PayloadTooLarge { limit }),
        _ => Ok(()),
    }
}

pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn content_type(headers: &HeaderMap) -> Result<&str, ApiError> {
    header_str(headers, CONTENT_TYPE.as_str())
        .ok_or_else(|| ApiError::UnsupportedMediaType("missing Content-Type header".to_string()))
}

/// Content type used when serving a stored object
pub fn content_type_for_key(key: &str) -> &'static str {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

/// Extension used to name an upload that arrived without `X-File-Name`
pub fn extension_for_video(mime_type: &str) -> &'static str {
    mime_guess::get_mime_extensions_str(mime_type)
        .and_then(|extensions| extensions.first().copied())
        .unwrap_or("mp4")
}
