use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::collector::FeedError;
use crate::leads::SlackError;
use crate::newsletter::MailerLiteError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    ValidationError(#[from] crate::validation::ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Missing or invalid admin token")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Feed error: {0}")]
    FeedError(#[from] FeedError),

    #[error("MailerLite error: {0}")]
    MailerLiteError(#[from] MailerLiteError),

    #[error("Slack error: {0}")]
    SlackError(#[from] SlackError),

    #[error("{0}")]
    Upstream(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Internal server error")]
    InternalError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::ValidationError(ref err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::BadRequest(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(ref message) => (StatusCode::CONFLICT, message.clone()),
            ApiError::StorageError(StorageError::NotFound(ref path)) => {
                (StatusCode::NOT_FOUND, format!("{path} not found"))
            }
            ApiError::StorageError(StorageError::InvalidPath(ref path)) => {
                (StatusCode::BAD_REQUEST, format!("Invalid path: {path}"))
            }
            ApiError::DatabaseError(ref err) => {
                // Log the detailed error but don't expose it to the client
                error!(error = %err, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::StorageError(ref err) => {
                error!(error = %err, "Storage error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::FeedError(ref err) => {
                error!(error = %err, "Feed error occurred");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            ApiError::MailerLiteError(ref err) => {
                error!(error = %err, "MailerLite request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Newsletter delivery service request failed".to_string(),
                )
            }
            ApiError::SlackError(ref err) => {
                error!(error = %err, "Slack request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Notification delivery failed".to_string(),
                )
            }
            ApiError::Upstream(ref message) => (StatusCode::BAD_GATEWAY, message.clone()),
            ApiError::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "success": false,
            "error": error_message
        }));

        (status, body).into_response()
    }
}
