//! API error handling
//!
//! Errors render as `{"error": true, "message": "..."}`, the same body shape
//! a successful submit returns with `error: false`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::error::Error;

use super::handlers::SendFileResponse;

/// Admin API error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Registry(crate::registry::RegistryError::UnknownChannel(channel)) => {
                ApiError::NotFound(format!("channel {} does not exist", channel))
            }
            Error::Protocol(_) => ApiError::BadRequest("error while sending file".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Admin API request failed");
        } else {
            tracing::debug!(error = %self, "Admin API request rejected");
        }

        let body = SendFileResponse {
            error: true,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
