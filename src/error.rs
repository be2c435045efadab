//! Handler-level error type and its mapping onto HTTP responses.

use chrono::{SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::http::{Response, StatusCode};
use crate::router::IntoResponse;

/// Everything a route handler can fail with.
///
/// Each variant maps to exactly one status code. The JSON body is always
/// `{statusCode, error, message, requestId, timestamp}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0} header is required")]
    MissingHeader(&'static str),

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    NotFound {
        resource: &'static str,
        message: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

/// Result alias used by route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(resource: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::MissingHeader(_) | Self::InvalidJson(_) => {
                StatusCode::BadRequest
            }
            Self::Unauthorized(_) => StatusCode::Unauthorized,
            Self::Forbidden(_) => StatusCode::Forbidden,
            Self::NotFound { .. } => StatusCode::NotFound,
            Self::Conflict(_) => StatusCode::Conflict,
            Self::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Short label placed in the `error` field of the body.
    pub fn label(&self) -> String {
        match self {
            Self::MissingHeader(header) => format!("Missing {header}"),
            Self::NotFound { resource, .. } => format!("{resource} not found"),
            other => other.status().canonical_reason().to_owned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self, request_id: Option<&str>) -> Response {
        let status = self.status();
        let request_id = request_id.unwrap_or_default();

        if status.is_server_error() {
            error!(request_id, error = %self, "request failed");
        } else if matches!(status, StatusCode::Unauthorized | StatusCode::Forbidden) {
            debug!(request_id, error = %self, "request rejected");
        } else {
            warn!(request_id, error = %self, "request rejected");
        }

        Response::json(
            status,
            &json!({
                "statusCode": status.as_u16(),
                "error": self.label(),
                "message": self.to_string(),
                "requestId": request_id,
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        )
    }
}
