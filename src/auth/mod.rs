// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Event Authentication
//!
//! The chat gateway adapter posts inbound events to `/v1/chat/events`.
//! Each request carries `X-Relay-Signature: base64(HMAC-SHA256(secret, body))`
//! computed over the raw body with the shared `EVENTS_SECRET`.
//!
//! ## Security
//!
//! - The signature is checked before the body is parsed
//! - Comparison is constant-time
//! - Bodies above 1 MiB are rejected unread
//!
//! The web widget routes are unauthenticated, as the widget runs in the
//! customer's browser and holds no secret.

pub mod error;
pub mod signature;

pub use error::AuthError;
pub use signature::{sign_body, verify_signature, SignedJson, SIGNATURE_HEADER};
