//! A single response type every handler in this crate funnels its
//! failures through, so the HTTP status/JSON-body mapping for each
//! downstream crate's error type lives in exactly one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    status: StatusCode,
    message: String,
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

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<floatchat_sessions::SessionError> for ApiError {
    fn from(err: floatchat_sessions::SessionError) -> Self {
        use floatchat_sessions::SessionError::*;
        let status = match &err {
            NotFound(_) | MessageNotFound(_) => StatusCode::NOT_FOUND,
            NotAwaitingConfirmation(_) | InvalidId(_) => StatusCode::BAD_REQUEST,
            Database(_) | Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<floatchat_search::SearchError> for ApiError {
    fn from(err: floatchat_search::SearchError) -> Self {
        use floatchat_search::SearchError::*;
        let status = match &err {
            DatasetNotFound(_) | RegionNotFound { .. } => StatusCode::NOT_FOUND,
            VariableNotAllowed(_) => StatusCode::BAD_REQUEST,
            Database(_) | Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::bad_request(format!("invalid id: {err}"))
    }
}
