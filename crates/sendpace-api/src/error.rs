//! API error responses

use axum::{http::StatusCode, Json};
use sendpace_common::Error;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<T, ApiError>;

/// Map a domain error to a status code and body
pub fn api_error(err: Error) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    // internal details stay in the log
    let message = if status.is_server_error() {
        error!("Request failed: {}", err);
        match err {
            Error::Messaging(_) => "Messaging bridge error".to_string(),
            _ => "Internal server error".to_string(),
        }
    } else {
        err.to_string()
    };

    (
        status,
        Json(ErrorResponse {
            error: err.code().to_lowercase(),
            message,
        }),
    )
}

/// 422 with a custom message
pub fn validation_error(message: impl Into<String>) -> ApiError {
    api_error(Error::Validation(message.into()))
}

/// 404 with a custom message
pub fn not_found(message: impl Into<String>) -> ApiError {
    api_error(Error::NotFound(message.into()))
}
