// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Customer denylist.
//!
//! Identity keys are NFKC-normalized and trimmed before use, so visually
//! identical identities map to the same entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

use super::super::database::{DbResult, SupportDatabase, ACCESS_DENIALS};

/// Denylist entry blocking new sessions for one identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AccessDenial {
    /// Normalized customer identity.
    pub identity: String,
    /// Free-text reason given by the operator.
    pub reason: String,
    /// When the entry was created or last updated.
    pub banned_at: DateTime<Utc>,
}

/// Normalize an identity key for denylist lookups.
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().nfkc().collect()
}

/// Denylist repository.
pub struct AccessControlList<'a> {
    db: &'a SupportDatabase,
}

impl<'a> AccessControlList<'a> {
    pub fn new(db: &'a SupportDatabase) -> Self {
        Self { db }
    }

    /// Deny an identity. Upserts: an existing entry gets the new reason.
    pub fn ban(&self, identity: &str, reason: &str) -> DbResult<AccessDenial> {
        let denial = AccessDenial {
            identity: normalize_identity(identity),
            reason: reason.to_string(),
            banned_at: Utc::now(),
        };
        let json = serde_json::to_vec(&denial)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ACCESS_DENIALS)?;
            table.insert(denial.identity.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(denial)
    }

    /// Remove an identity from the denylist.
    ///
    /// Returns whether an entry existed. Missing entries are not an error.
    pub fn unban(&self, identity: &str) -> DbResult<bool> {
        let key = normalize_identity(identity);

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ACCESS_DENIALS)?;
            let previous = table.remove(key.as_str())?;
            previous.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Look up the denylist entry for an identity.
    pub fn get(&self, identity: &str) -> DbResult<Option<AccessDenial>> {
        let key = normalize_identity(identity);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCESS_DENIALS)?;
        let denial = match table.get(key.as_str())? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(denial)
    }

    /// Whether new sessions are blocked for this identity.
    pub fn is_denied(&self, identity: &str) -> DbResult<bool> {
        Ok(self.get(identity)?.is_some())
    }
}
