//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::CoachError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &CoachError) -> StatusCode {
    match err {
        CoachError::InvalidInput { .. } | CoachError::PriceData { .. } => StatusCode::BAD_REQUEST,
        CoachError::UpstreamGeneration { .. } => StatusCode::BAD_GATEWAY,
        CoachError::ArtifactWrite { .. }
        | CoachError::Database { .. }
        | CoachError::DatabaseQuery { .. }
        | CoachError::ConfigParse { .. }
        | CoachError::ConfigMissing { .. }
        | CoachError::ConfigInvalid { .. }
        | CoachError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CoachError> for WebError {
    fn from(err: CoachError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        }
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}
