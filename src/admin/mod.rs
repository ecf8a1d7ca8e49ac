// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Administrative Operations
//!
//! Bulk export, wipe and restore of the ticket store. The only public entry
//! point for the destructive paths is [`AdminOperations::execute`], which
//! takes an [`AuthorizedAction`] released by a validated challenge.
//!
//! Restores are decoded and validated before the challenge is issued
//! ([`AdminOperations::decode_backup`]). Once authorized, the store is
//! replaced in a single write transaction.

pub mod cipher;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

pub use cipher::{BackupCipher, CipherError};

use crate::challenge::{AuthorizedAction, PendingAction};
use crate::storage::{DbError, SupportDatabase, Ticket, TicketRepository};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("backup could not be decrypted or is invalid: {0}")]
    DecryptionFailed(String),

    #[error("backup encryption failed: {0}")]
    EncryptionFailed(#[from] CipherError),

    #[error("backup serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

/// An encrypted export ready to be sent to the administrator.
#[derive(Debug, Clone)]
pub struct EncryptedBackup {
    pub filename: String,
    pub ciphertext: Vec<u8>,
    pub ticket_count: usize,
}

/// Result of an authorized administrative action.
#[derive(Debug)]
pub enum AdminOutcome {
    Exported(EncryptedBackup),
    Wiped { removed: usize },
    Restored { restored: usize },
}

pub struct AdminOperations {
    db: Arc<SupportDatabase>,
    cipher: BackupCipher,
}

impl AdminOperations {
    pub fn new(db: Arc<SupportDatabase>, cipher: BackupCipher) -> Self {
        Self { db, cipher }
    }

    /// Run an authorized action.
    pub fn execute(&self, authorized: AuthorizedAction) -> Result<AdminOutcome, AdminError> {
        match authorized.into_action() {
            PendingAction::Backup => self.export_encrypted().map(AdminOutcome::Exported),
            PendingAction::DeleteAll => self
                .wipe_all()
                .map(|removed| AdminOutcome::Wiped { removed }),
            PendingAction::Restore { tickets } => self
                .replace_tickets(&tickets)
                .map(|restored| AdminOutcome::Restored { restored }),
        }
    }

    /// Decrypt and validate a backup without touching the store.
    ///
    /// Rejects anything that is not a JSON array of tickets with non-empty,
    /// unique thread ids.
    pub fn decode_backup(&self, ciphertext: &[u8]) -> Result<Vec<Ticket>, AdminError> {
        let plaintext = self
            .cipher
            .open(ciphertext)
            .map_err(|e| AdminError::DecryptionFailed(e.to_string()))?;

        let tickets: Vec<Ticket> = serde_json::from_slice(&plaintext)
            .map_err(|e| AdminError::DecryptionFailed(format!("unexpected backup shape: {e}")))?;

        let mut seen = HashSet::with_capacity(tickets.len());
        for ticket in &tickets {
            if ticket.thread_id.trim().is_empty() {
                return Err(AdminError::DecryptionFailed(
                    "backup contains a ticket without thread id".to_string(),
                ));
            }
            if !seen.insert(ticket.thread_id.as_str()) {
                return Err(AdminError::DecryptionFailed(format!(
                    "backup contains thread {} twice",
                    ticket.thread_id
                )));
            }
        }
        Ok(tickets)
    }

    fn export_encrypted(&self) -> Result<EncryptedBackup, AdminError> {
        let tickets = TicketRepository::new(&self.db).list_all()?;
        let plaintext = serde_json::to_vec(&tickets)?;
        let ciphertext = self.cipher.seal(&plaintext)?;
        let filename = format!("support-backup-{}.enc", Utc::now().format("%Y%m%d-%H%M%S"));

        info!(tickets = tickets.len(), filename = %filename, "Encrypted backup exported");
        Ok(EncryptedBackup {
            filename,
            ciphertext,
            ticket_count: tickets.len(),
        })
    }

    fn wipe_all(&self) -> Result<usize, AdminError> {
        let removed = TicketRepository::new(&self.db).delete_all()?;
        info!(removed, "Ticket store wiped");
        Ok(removed)
    }

    fn replace_tickets(&self, tickets: &[Ticket]) -> Result<usize, AdminError> {
        let restored = TicketRepository::new(&self.db).replace_all(tickets)?;
        info!(restored, "Ticket store restored from backup");
        Ok(restored)
    }
}
