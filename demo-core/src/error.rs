use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error returned by demo route handlers.
///
/// Client faults map to 4xx, everything else to 500. The body always has the
/// shape `{"success": false, "error": "<message>"}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request was understood but its content is invalid.
    #[error("{0}")]
    BadRequest(String),

    /// The addressed entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with the current state (duplicate, already done).
    #[error("{0}")]
    Conflict(String),

    /// Unexpected failure inside the service.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        (
            status,
            Json(json!({"success": false, "error": self.to_string()})),
        )
            .into_response()
    }
}

/// A specialized Result type for route handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
