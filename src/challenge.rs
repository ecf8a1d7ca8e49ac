// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # One-Time Code Challenges
//!
//! Sensitive administrative actions are two-step: the operator requests the
//! action, a 6-digit code is emailed to the administrator, and `/verify`
//! with that code releases an [`AuthorizedAction`].
//!
//! ## Rules
//!
//! - At most one challenge is live per process. Issuing a new one replaces
//!   the previous one.
//! - Codes live for 10 minutes and are single-use.
//! - Only an HMAC tag of the code is held in memory. The code itself is
//!   handed to the delivery collaborator and then dropped.
//! - A wrong code leaves the challenge live. An expired one is voided.
//! - Challenges are never persisted; a restart voids them.
//!
//! [`AuthorizedAction`] has no public constructor, so administrative
//! operations that take one can only run after a successful validation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::delivery::{CodeDelivery, DeliveryError};
use crate::storage::Ticket;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued code stays valid.
pub const CHALLENGE_TTL_MINUTES: i64 = 10;

/// Largest multiple of 10^6 that fits in a u32. Draws at or above it are
/// rejected so every 6-digit code is equally likely.
const CODE_SAMPLE_LIMIT: u32 = 4_294_000_000;
const CODE_SPACE: u32 = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("no pending action to verify")]
    NoPendingChallenge,

    #[error("verification code expired")]
    ChallengeExpired,

    #[error("verification code does not match")]
    CodeMismatch,

    #[error("failed to deliver verification code: {0}")]
    DeliveryFailed(#[from] DeliveryError),

    #[error("secure random generator failed")]
    Rng,

    #[error("challenge MAC error: {0}")]
    Crypto(String),
}

/// Action waiting for code confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    /// Encrypted export of every ticket.
    Backup,
    /// Delete every ticket.
    DeleteAll,
    /// Replace every ticket with an already-decrypted backup.
    Restore { tickets: Vec<Ticket> },
}

impl PendingAction {
    /// Short machine name, used in logs and the audit trail.
    pub fn tag(&self) -> &'static str {
        match self {
            PendingAction::Backup => "backup",
            PendingAction::DeleteAll => "delete-all",
            PendingAction::Restore { .. } => "restore",
        }
    }

    /// Human-readable description, used in the email.
    pub fn label(&self) -> String {
        match self {
            PendingAction::Backup => "export an encrypted backup of all tickets".to_string(),
            PendingAction::DeleteAll => "delete ALL tickets".to_string(),
            PendingAction::Restore { tickets } => {
                format!("replace all tickets with a backup of {} tickets", tickets.len())
            }
        }
    }
}

/// Proof that a challenge was validated. Only [`ChallengeManager`] creates these.
#[derive(Debug)]
pub struct AuthorizedAction {
    action: PendingAction,
}

impl AuthorizedAction {
    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    pub(crate) fn into_action(self) -> PendingAction {
        self.action
    }

    #[cfg(test)]
    pub(crate) fn granted(action: PendingAction) -> Self {
        Self { action }
    }
}

/// What the requester learns about an issued challenge. Never the code.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub id: u64,
    pub action: &'static str,
    pub expires_at: DateTime<Utc>,
}

struct Challenge {
    id: u64,
    code_tag: Vec<u8>,
    expires_at: DateTime<Utc>,
    action: PendingAction,
}

/// Single-slot challenge holder.
pub struct ChallengeManager {
    slot: Mutex<Option<Challenge>>,
    next_id: AtomicU64,
    mac_key: [u8; 32],
    rng: SystemRandom,
    delivery: Arc<dyn CodeDelivery>,
    admin_address: String,
    ttl: Duration,
}

impl ChallengeManager {
    pub fn new(
        delivery: Arc<dyn CodeDelivery>,
        admin_address: impl Into<String>,
    ) -> Result<Self, ChallengeError> {
        let rng = SystemRandom::new();
        let mut mac_key = [0u8; 32];
        rng.fill(&mut mac_key).map_err(|_| ChallengeError::Rng)?;

        Ok(Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
            mac_key,
            rng,
            delivery,
            admin_address: admin_address.into(),
            ttl: Duration::minutes(CHALLENGE_TTL_MINUTES),
        })
    }

    /// Issue a challenge for `action`, replacing any live one.
    pub async fn issue(&self, action: PendingAction) -> Result<IssuedChallenge, ChallengeError> {
        self.issue_at(action, Utc::now()).await
    }

    pub(crate) async fn issue_at(
        &self,
        action: PendingAction,
        now: DateTime<Utc>,
    ) -> Result<IssuedChallenge, ChallengeError> {
        let code = self.generate_code()?;
        let code_tag = self.tag(&code)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let expires_at = now + self.ttl;
        let tag = action.tag();
        let label = action.label();

        {
            let mut slot = self.slot.lock().await;
            if slot.is_some() {
                info!(challenge_id = id, "Replacing pending challenge");
            }
            *slot = Some(Challenge {
                id,
                code_tag,
                expires_at,
                action,
            });
        }

        if let Err(e) = self
            .delivery
            .send_one_time_code(&self.admin_address, &code, &label)
            .await
        {
            warn!(
                challenge_id = id,
                action = tag,
                error = %e,
                "Voiding challenge after failed delivery"
            );
            let mut slot = self.slot.lock().await;
            if slot.as_ref().is_some_and(|c| c.id == id) {
                *slot = None;
            }
            return Err(e.into());
        }

        info!(challenge_id = id, action = tag, expires_at = %expires_at, "Challenge issued");
        Ok(IssuedChallenge {
            id,
            action: tag,
            expires_at,
        })
    }

    /// Validate a code against the live challenge.
    pub async fn validate(&self, code: &str) -> Result<AuthorizedAction, ChallengeError> {
        self.validate_at(code, Utc::now()).await
    }

    pub(crate) async fn validate_at(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizedAction, ChallengeError> {
        let mut slot = self.slot.lock().await;
        let challenge = slot.take().ok_or(ChallengeError::NoPendingChallenge)?;

        if now > challenge.expires_at {
            info!(
                challenge_id = challenge.id,
                action = challenge.action.tag(),
                "Challenge expired"
            );
            return Err(ChallengeError::ChallengeExpired);
        }

        if !self.matches(code.trim(), &challenge.code_tag)? {
            warn!(challenge_id = challenge.id, "Challenge code mismatch");
            *slot = Some(challenge);
            return Err(ChallengeError::CodeMismatch);
        }

        info!(challenge_id = challenge.id, action = challenge.action.tag(), "Challenge validated");
        Ok(AuthorizedAction {
            action: challenge.action,
        })
    }

    /// Whether a challenge is currently held (expired or not).
    pub async fn has_pending(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    fn generate_code(&self) -> Result<String, ChallengeError> {
        loop {
            let mut buf = [0u8; 4];
            self.rng.fill(&mut buf).map_err(|_| ChallengeError::Rng)?;
            let draw = u32::from_be_bytes(buf);
            if draw < CODE_SAMPLE_LIMIT {
                return Ok(format!("{:06}", draw % CODE_SPACE));
            }
        }
    }

    fn mac(&self) -> Result<HmacSha256, ChallengeError> {
        HmacSha256::new_from_slice(&self.mac_key).map_err(|e| ChallengeError::Crypto(e.to_string()))
    }

    fn tag(&self, code: &str) -> Result<Vec<u8>, ChallengeError> {
        let mut mac = self.mac()?;
        mac.update(code.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Constant-time comparison of a candidate code against the stored tag.
    fn matches(&self, code: &str, tag: &[u8]) -> Result<bool, ChallengeError> {
        let mut mac = self.mac()?;
        mac.update(code.as_bytes());
        Ok(mac.verify_slice(tag).is_ok())
    }
}
