use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ApiResponse;
use super::validation::RequestValidationError;
use crate::cleanup::SignatureError;
use crate::error::{ErrorKind, Stage};
use crate::pipeline::PipelineError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidPayload(String),
    #[error("payload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("Unauthorized")]
    Unauthorized(#[source] SignatureError),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("{source}")]
    Storage {
        stage: Stage,
        #[source]
        source: StorageError,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(_) | ApiError::Storage { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidPayload(_)
            | ApiError::PayloadTooLarge { .. }
            | ApiError::UnsupportedMediaType(_) => ErrorKind::Validation,
            ApiError::Unauthorized(e) => e.kind(),
            ApiError::NotFound(_) => ErrorKind::Fetch,
            ApiError::Pipeline(e) => e.kind(),
            ApiError::Storage { source, .. } => source.kind(),
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            ApiError::Pipeline(e) => Some(e.stage()),
            ApiError::Storage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = %self.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self, kind = %self.kind(), "Request rejected");
        }

        let body: ApiResponse<()> = ApiResponse::failure(self.to_string(), self.kind(), self.stage());
        (status, Json(body)).into_response()
    }
}

impl From<RequestValidationError> for ApiError {
    fn from(value: RequestValidationError) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(format!("invalid JSON body: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerError;

    #[test]
    fn test_pipeline_errors_carry_stage() {
        let err = ApiError::from(PipelineError::Analysis(AnalyzerError::ProcessingFailed));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.stage(), Some(Stage::Analysis));
        assert_eq!(err.to_string(), "Video processing failed");
    }

    #[test]
    fn test_signature_errors_are_unauthorized() {
        let err = ApiError::Unauthorized(SignatureError::Expired);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.to_string(), "Unauthorized");
    }
}
