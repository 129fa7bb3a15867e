//! HTTP error rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hub_core::HubError;
use serde_json::json;
use tracing::{debug, error};

/// Error returned by every handler; rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", err);
        } else {
            debug!("Request rejected: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!("Blocking task failed: {}", err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_hub_error() {
        assert_eq!(ApiError::from(HubError::not_found("tag", 7)).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(HubError::Sort { name: "color".into() }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(HubError::forbidden("builtin")).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(HubError::Fatal { message: "pk".into() }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_is_display_text() {
        let err = ApiError::from(HubError::not_found("tag", 7));
        assert_eq!(err.message, "tag id=7 not found.");
    }
}
