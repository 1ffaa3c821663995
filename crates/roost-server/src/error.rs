//! HTTP error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// An API error rendered as `{"error": "..."}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

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

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }

    /// Map a backend wire error onto the status the relay should answer
    /// with: rejections keep the upstream status and message, crashes
    /// keep the status but carry the hint, transport failures are a 502.
    pub fn from_backend(error: roost_stream::Error) -> Self {
        let status = error
            .status()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<roost_session::Error> for ApiError {
    fn from(error: roost_session::Error) -> Self {
        if error.is_not_found() {
            Self::not_found()
        } else {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

impl From<roost_stream::Error> for ApiError {
    fn from(error: roost_stream::Error) -> Self {
        Self::from_backend(error)
    }
}
