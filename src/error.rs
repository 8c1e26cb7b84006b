//! Mapping of library errors onto HTTP responses for the JSON API.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::admin::AdminError;
use crate::backends::BackendError;
use crate::leads::LeadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Too many requests, try again in {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error("{0}")]
    Internal(String),
    /// Webhook failures answer `{ok: false, message}` instead of `{error}`
    #[error("{message}")]
    Webhook { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Webhook { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Webhook { message, .. } => json!({ "ok": false, "message": message }),
            other => json!({ "error": other.to_string() }),
        };
        let mut response = (status, Json(body)).into_response();
        if let Self::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

impl From<LeadError> for ApiError {
    fn from(err: LeadError) -> Self {
        match err {
            LeadError::Invalid(invalid) => Self::BadRequest(invalid.to_string()),
            LeadError::NotConfigured | LeadError::SendFailed(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Validation(message) => Self::BadRequest(message),
            AdminError::NotFound => Self::NotFound(err.to_string()),
            AdminError::Backend(BackendError::Forbidden) => Self::Forbidden(err.to_string()),
            AdminError::Backend(BackendError::NotFound(_)) => Self::NotFound(err.to_string()),
            other => {
                error!("Admin action failed: {}", other);
                Self::Internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::ValidationError;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(LeadError::Invalid(ValidationError::MessageTooShort)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(LeadError::NotConfigured).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::from(AdminError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AdminError::ReorderFailed { failed: 1, total: 3 }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "42");
    }

    #[test]
    fn not_configured_message_is_stable() {
        assert_eq!(
            ApiError::from(LeadError::NotConfigured).to_string(),
            "Email server not configured"
        );
    }
}
