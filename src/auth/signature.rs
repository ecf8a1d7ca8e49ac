// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for HMAC-signed JSON bodies.
//!
//! ```rust,ignore
//! async fn handler(SignedJson(event): SignedJson<ChatEvent>) -> impl IntoResponse {
//!     // event came from a holder of EVENTS_SECRET
//! }
//! ```

use axum::{
    body::to_bytes,
    extract::{FromRequest, Request},
};
use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;

use super::AuthError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-relay-signature";

/// Largest event body accepted (1 MiB).
const MAX_EVENT_BYTES: usize = 1024 * 1024;

/// JSON body whose signature was verified against `EVENTS_SECRET`.
pub struct SignedJson<T>(pub T);

impl<T> FromRequest<AppState> for SignedJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        let header = parts
            .headers
            .get(SIGNATURE_HEADER)
            .ok_or(AuthError::MissingSignature)?
            .to_str()
            .map_err(|_| AuthError::MalformedSignature)?;
        let signature =
            Base64::decode_vec(header.trim()).map_err(|_| AuthError::MalformedSignature)?;

        let bytes = to_bytes(body, MAX_EVENT_BYTES)
            .await
            .map_err(|_| AuthError::UnreadableBody)?;

        verify_signature(state.events_secret.as_bytes(), &bytes, &signature)?;

        let value = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedPayload(e.to_string()))?;
        Ok(SignedJson(value))
    }
}

/// Base64 HMAC-SHA256 of `body` under `secret`.
pub fn sign_body(secret: &[u8], body: &[u8]) -> Result<String, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
    mac.update(body);
    Ok(Base64::encode_string(&mac.finalize().into_bytes()))
}

/// Constant-time check of a raw signature against `body`.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &[u8]) -> Result<(), AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AuthError::InternalError(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(signature).map_err(|_| AuthError::InvalidSignature)
}
