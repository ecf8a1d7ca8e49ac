// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time code delivery.
//!
//! Codes for sensitive actions go out of band to the administrator's email
//! address. [`HttpMailer`] posts to a transactional-mail JSON API; the
//! [`DisabledDelivery`] fallback is used when no mail API is configured and
//! makes every sensitive action fail closed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("code delivery is not configured")]
    NotConfigured,

    #[error("mail request failed: {0}")]
    Request(String),

    #[error("mail API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Out-of-band channel for one-time codes.
#[async_trait]
pub trait CodeDelivery: Send + Sync {
    /// Deliver `code` to `address`. `action` names what the code authorizes.
    async fn send_one_time_code(
        &self,
        address: &str,
        code: &str,
        action: &str,
    ) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    text: String,
}

/// JSON mail API client (bearer-key authenticated).
#[derive(Debug, Clone)]
pub struct HttpMailer {
    endpoint: String,
    api_key: String,
    from: String,
    http: Client,
}

impl HttpMailer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
            http,
        })
    }
}

/// Subject and plain-text body for a one-time code email.
fn compose(code: &str, action: &str) -> (String, String) {
    let subject = format!("Support admin verification: {action}");
    let text = format!(
        "Your verification code for `{action}` is {code}.\n\n\
         It expires in 10 minutes and can be used once. \
         If you did not request this action, ignore this email."
    );
    (subject, text)
}

#[async_trait]
impl CodeDelivery for HttpMailer {
    async fn send_one_time_code(
        &self,
        address: &str,
        code: &str,
        action: &str,
    ) -> Result<(), DeliveryError> {
        let (subject, text) = compose(code, action);
        let request = MailRequest {
            from: &self.from,
            to: [address],
            subject,
            text,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Mail API rejected one-time code");
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(action = %action, "One-time code emailed to administrator");
        Ok(())
    }
}

/// Delivery used when no mail API is configured. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDelivery;

#[async_trait]
impl CodeDelivery for DisabledDelivery {
    async fn send_one_time_code(
        &self,
        _address: &str,
        _code: &str,
        action: &str,
    ) -> Result<(), DeliveryError> {
        warn!(action = %action, "One-time code requested but mail delivery is disabled");
        Err(DeliveryError::NotConfigured)
    }
}
