// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use timecard_sync::error::AppError;

#[test]
fn test_is_remote_rejection_matches() {
    let err = AppError::RemoteRequest {
        status: 401,
        body: "expired".to_string(),
    };
    assert!(err.is_remote_rejection());
}

#[test]
fn test_is_remote_rejection_no_match() {
    assert!(!AppError::Http("connection refused".to_string()).is_remote_rejection());
    assert!(!AppError::NoCredential.is_remote_rejection());
    assert!(!AppError::BatchEntry { ordinal: 1 }.is_remote_rejection());
}

#[test]
fn test_status_mapping() {
    let cases = [
        (AppError::Parse("25:99".to_string()), StatusCode::BAD_REQUEST),
        (AppError::BatchEntry { ordinal: 3 }, StatusCode::BAD_REQUEST),
        (AppError::NoCredential, StatusCode::FORBIDDEN),
        (AppError::NotFound("user 'U1'".to_string()), StatusCode::NOT_FOUND),
        (
            AppError::RemoteRequest {
                status: 500,
                body: String::new(),
            },
            StatusCode::BAD_GATEWAY,
        ),
        (AppError::Storage("disk full".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}

#[tokio::test]
async fn test_internal_details_are_hidden() {
    let response = AppError::Storage("/var/lib/users/U1: permission denied".to_string())
        .into_response();
    let bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body, serde_json::json!({"error": "storage_error"}));
}
