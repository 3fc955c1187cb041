// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type shared by the engine, the stores and the routes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("invalid time '{0}': expected now, HHMM, HH:MM or an RFC 3339 timestamp")]
    Parse(String),

    #[error("no usable OAuth credential: register a token or ask an admin to register one")]
    NoCredential,

    #[error("failed to request: status code: {status}, response: {body}")]
    RemoteRequest { status: u16, body: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("an error occurred while processing the {} record", english_ordinal(*.ordinal))]
    BatchEntry { ordinal: usize },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Chat API error: {0}")]
    Chat(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Text shown to a chat user when a command fails.
    pub fn user_message(&self) -> String {
        format!(":warning: Error occurred: {}", self)
    }

    /// Whether the HR vendor rejected the request (as opposed to a local failure).
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, AppError::RemoteRequest { .. })
    }
}

/// English ordinal for a 1-based position ("1st", "2nd", "11th", "23rd").
pub fn english_ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Parse(_) | AppError::BatchEntry { .. } => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(self.to_string()))
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::NoCredential => (
                StatusCode::FORBIDDEN,
                "no_credential",
                Some(self.to_string()),
            ),
            AppError::RemoteRequest { .. } | AppError::OAuth(_) | AppError::Http(_) => {
                (StatusCode::BAD_GATEWAY, "upstream_error", Some(self.to_string()))
            }
            AppError::Chat(msg) => (StatusCode::BAD_GATEWAY, "chat_error", Some(msg.clone())),
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
