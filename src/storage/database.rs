// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded support database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `tickets`: thread_id → serialized Ticket (JSON bytes)
//! - `access_denials`: normalized identity → serialized AccessDenial
//! - `audit_events`: composite key (timestamp_be|event_id) → serialized AuditEvent
//!
//! Every mutation runs inside a single write transaction. redb serializes
//! writers, so a read-modify-write inside one transaction (e.g. appending a
//! message to a ticket transcript) cannot lose a concurrent update.

use std::path::{Path, PathBuf};

use redb::{Database, ReadTransaction, ReadableDatabase, TableDefinition, WriteTransaction};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: thread_id → serialized Ticket (JSON bytes).
pub(crate) const TICKETS: TableDefinition<&str, &[u8]> = TableDefinition::new("tickets");

/// Denylist: normalized customer identity → serialized AccessDenial.
pub(crate) const ACCESS_DENIALS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("access_denials");

/// Audit trail: `timestamp_micros_be | event_uuid` → serialized AuditEvent.
pub(crate) const AUDIT_EVENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("audit_events");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// SupportDatabase
// =============================================================================

/// Embedded ACID document store for tickets, the denylist and the audit trail.
pub struct SupportDatabase {
    db: Database,
    path: PathBuf,
}

impl SupportDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TICKETS)?;
            let _ = write_txn.open_table(ACCESS_DENIALS)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Support database opened");

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database answers a read transaction on every table.
    pub fn health_check(&self) -> DbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(TICKETS)?;
        let _ = read_txn.open_table(ACCESS_DENIALS)?;
        let _ = read_txn.open_table(AUDIT_EVENTS)?;
        Ok(())
    }

    pub(crate) fn begin_read(&self) -> DbResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> DbResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }
}
