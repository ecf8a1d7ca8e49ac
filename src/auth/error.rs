// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors for signed chat events.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Rejection for requests on the signed event route.
#[derive(Debug)]
pub enum AuthError {
    /// No signature header present
    MissingSignature,
    /// Signature header is not valid base64
    MalformedSignature,
    /// Signature does not match the body
    InvalidSignature,
    /// Request body could not be read
    UnreadableBody,
    /// Body is signed correctly but is not a valid event
    MalformedPayload(String),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingSignature => "missing_signature",
            AuthError::MalformedSignature => "malformed_signature",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::UnreadableBody => "unreadable_body",
            AuthError::MalformedPayload(_) => "malformed_payload",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingSignature
            | AuthError::MalformedSignature
            | AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AuthError::UnreadableBody => StatusCode::BAD_REQUEST,
            AuthError::MalformedPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingSignature => write!(f, "X-Relay-Signature header is required"),
            AuthError::MalformedSignature => write!(f, "Signature header is not valid base64"),
            AuthError::InvalidSignature => write!(f, "Signature does not match request body"),
            AuthError::UnreadableBody => write!(f, "Request body could not be read"),
            AuthError::MalformedPayload(msg) => write!(f, "Invalid event payload: {msg}"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_signature_returns_401() {
        let response = AuthError::MissingSignature.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_signature");
    }

    #[tokio::test]
    async fn malformed_payload_returns_422() {
        let response = AuthError::MalformedPayload("missing field".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
