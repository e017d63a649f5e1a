//! Unified error handling for the server.
//!
//! Provides a single error type that maps to HTTP responses.
//!
//! # Response bodies
//!
//! - Generic failures: `{"error": ..., "details"?: ..., "status": ...}`
//! - Vote failures keep the vote response shape:
//!   `{"success": false, "error": ..., "results": ...}`
//!
//! Internal error messages never reach the client directly. The message is
//! attached to the response extensions as [`InternalDetails`] and only copied
//! into the body when the server runs in development mode.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storage::StoreError;
use tracing::error;
use types::{PollResults, ValidationError, VoteResponse};

/// Application error type with HTTP response mapping.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Unknown poll id (404).
    #[error("Poll not found")]
    PollNotFound,

    /// Request body failed validation (400).
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Path parameters failed validation (400).
    #[error("Invalid parameters: {0}")]
    InvalidParams(ValidationError),

    /// Body is not the JSON we expect (400).
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Body exceeds the configured size limit (413).
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Voter already voted on this poll (409).
    #[error("You have already voted on this poll")]
    AlreadyVoted(PollResults),

    /// Option does not belong to the poll (400).
    #[error("Invalid option for this poll")]
    UnknownOption,

    /// Client exceeded its request budget (429).
    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    /// Internal server error (500).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Message of a 500 response, kept out of the body by default.
#[derive(Debug, Clone)]
pub struct InternalDetails(pub String);

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub status: u16,
}

impl ErrorBody {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details,
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        match self {
            AppError::PollNotFound => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorBody::new(status, message, None))).into_response()
            }
            AppError::Validation(err) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ErrorBody::new(status, "Validation failed", Some(err.to_string()));
                (status, Json(body)).into_response()
            }
            AppError::InvalidParams(err) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ErrorBody::new(status, "Invalid parameters", Some(err.to_string()));
                (status, Json(body)).into_response()
            }
            AppError::MalformedPayload(details) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ErrorBody::new(status, "Validation failed", Some(details));
                (status, Json(body)).into_response()
            }
            AppError::PayloadTooLarge => {
                let status = StatusCode::PAYLOAD_TOO_LARGE;
                (status, Json(ErrorBody::new(status, message, None))).into_response()
            }
            AppError::AlreadyVoted(results) => (
                StatusCode::CONFLICT,
                Json(VoteResponse::rejected(message, Some(results))),
            )
                .into_response(),
            AppError::UnknownOption => (
                StatusCode::BAD_REQUEST,
                Json(VoteResponse::rejected(message, None)),
            )
                .into_response(),
            AppError::RateLimited { retry_after_secs } => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                let retry_after = HeaderValue::from_str(&retry_after_secs.to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("60"));
                (
                    status,
                    [(header::RETRY_AFTER, retry_after)],
                    Json(ErrorBody::new(status, message, None)),
                )
                    .into_response()
            }
            AppError::Internal(details) => {
                error!(error = %details, "request failed");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let mut response =
                    (status, Json(ErrorBody::new(status, "Internal server error", None)))
                        .into_response();
                response.extensions_mut().insert(InternalDetails(details));
                response
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        // Bodies without Content-Length hit the limit while buffering
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::MalformedPayload(rejection.body_text())
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
