//! # Error Handling
//!
//! Application error type and its conversion into HTTP responses.
//!
//! Every error renders as `{"error": "..."}`. Client-caused failures use 400
//! so the browser client can show the message; storage and internal
//! failures use 5xx with a generic message and are logged in full.

use crate::db::kv::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
///
/// The `#[from]` attributes let `?` convert library errors directly.
#[derive(Error, Debug)]
pub enum AppError {
    /// Key-value backend failures
    ///
    /// Kept distinct from "not found" so an outage never looks like an
    /// unregistered user.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// WebAuthn protocol errors raised by webauthn-rs
    ///
    /// Common causes: invalid signature, mismatched challenge or origin
    #[error("WebAuthn error: {0}")]
    WebAuthn(#[from] webauthn_rs::prelude::WebauthnError),

    /// Ceremony response rejected by our own checks
    #[error("Verification failed: {0}")]
    Verification(String),

    /// JSON serialization/deserialization of stored state
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No record exists for the username
    #[error("User '{0}' not found")]
    UnknownUser(String),

    /// Bad request errors (400)
    #[error("{0}")]
    BadRequest(String),

    /// Authentication errors (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Optimistic update kept losing to concurrent writers (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Store(e) => {
                tracing::error!("Storage error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            AppError::WebAuthn(e) => {
                tracing::warn!("WebAuthn error: {:?}", e);
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Verification(_) | AppError::UnknownUser(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Malformed or missing JSON bodies become a 400 with the usual `{error}` shape
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;
