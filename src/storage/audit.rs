// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Session lifecycle, denylist changes, challenge outcomes and every bulk
//! administrative action are recorded in the `audit_events` table. Bulk
//! wipe and restore only touch tickets, so the trail survives them.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{DbResult, SupportDatabase, AUDIT_EVENTS};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Session events
    SessionStarted,
    SessionClosed,
    SessionRejected,

    // Denylist events
    IdentityBanned,
    IdentityUnbanned,

    // Challenge events
    ChallengeIssued,
    ChallengeFailed,

    // Bulk operations
    BackupExported,
    StoreWiped,
    StoreRestored,

    // Auth events
    PermissionDenied,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Chat user or customer identity that triggered the event.
    pub actor_id: Option<String>,
    /// Resource affected (thread id, identity, ...).
    pub resource_id: Option<String>,
    /// Resource type (ticket, identity, store).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            actor_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the actor.
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Build the table key: big-endian microsecond timestamp, then the event id.
///
/// Keys sort chronologically, so a reverse scan yields newest first.
fn event_key(event: &AuditEvent) -> Vec<u8> {
    let micros = event.timestamp.timestamp_micros().max(0) as u64;
    let mut key = Vec::with_capacity(8 + event.event_id.len());
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(event.event_id.as_bytes());
    key
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a SupportDatabase,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(db: &'a SupportDatabase) -> Self {
        Self { db }
    }

    /// Append an audit event.
    pub fn log(&self, event: &AuditEvent) -> DbResult<()> {
        let key = event_key(event);
        let json = serde_json::to_vec(event)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Most recent events, newest first.
    pub fn recent(&self, limit: usize) -> DbResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let mut events = Vec::with_capacity(limit);
        for entry in table.iter()?.rev().take(limit) {
            let (_, value) = entry?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }
}

/// Helper macro for logging audit events. Failures are logged, never raised.
#[macro_export]
macro_rules! audit_log {
    ($db:expr, $event:expr) => {{
        let repo = $crate::storage::AuditRepository::new($db);
        if let Err(e) = repo.log(&$event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($db:expr, $event_type:expr, $actor:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_actor($actor)
            .with_resource($resource_type, $resource_id);
        $crate::audit_log!($db, event);
    }};
}
