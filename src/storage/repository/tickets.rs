// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ticket repository on the embedded support database.
//!
//! A ticket is keyed by the chat thread it is bound to. The thread id is the
//! only uniqueness constraint: `create` refuses to overwrite an existing
//! record, and the transcript is only ever extended through `append_message`.
//! Field names are camelCase because the web widget reads these documents
//! verbatim from the history endpoint.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, ReadableTableMetadata};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{DbError, DbResult, SupportDatabase, TICKETS};

/// Lifecycle status of a ticket. `Closed` is terminal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    #[default]
    Open,
    Closed,
}

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    /// The customer, via the web widget.
    Customer,
    /// The support operator, via the chat thread.
    Operator,
    /// Messages generated by the relay itself.
    System,
}

/// One transcript entry. Entries are append-only and never edited.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    /// Role of the sender.
    pub sender: SenderRole,
    /// Display name of the author, when one is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Message text.
    pub content: String,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

impl TicketMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            sender: SenderRole::System,
            author: None,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn customer(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: SenderRole::Customer,
            author: Some(author.into()),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn operator(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: SenderRole::Operator,
            author: Some(author.into()),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A support session bound 1:1 to a chat thread.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Chat thread id (unique, immutable).
    pub thread_id: String,
    /// Customer display name.
    pub customer_name: String,
    /// Customer external identity (denylist key).
    pub customer_identity: String,
    /// Customer handle on the web side.
    pub customer_handle: String,
    /// Avatar image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Banner image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: TicketStatus,
    /// When the session started.
    pub created_at: DateTime<Utc>,
    /// Transcript in insertion order.
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
}

impl Ticket {
    /// Append a transcript entry, keeping timestamps non-decreasing.
    pub fn push_message(&mut self, mut message: TicketMessage) -> &TicketMessage {
        if let Some(last) = self.messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

/// Repository for ticket operations on the support database.
pub struct TicketRepository<'a> {
    db: &'a SupportDatabase,
}

impl<'a> TicketRepository<'a> {
    /// Create a new TicketRepository.
    pub fn new(db: &'a SupportDatabase) -> Self {
        Self { db }
    }

    /// Insert a new ticket. Fails if the thread id is already bound.
    pub fn create(&self, ticket: &Ticket) -> DbResult<()> {
        let json = serde_json::to_vec(ticket)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TICKETS)?;
            if table.get(ticket.thread_id.as_str())?.is_some() {
                return Err(DbError::AlreadyExists(format!(
                    "Ticket {}",
                    ticket.thread_id
                )));
            }
            table.insert(ticket.thread_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a ticket by thread id.
    pub fn get(&self, thread_id: &str) -> DbResult<Option<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS)?;
        let ticket = match table.get(thread_id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(ticket)
    }

    /// Atomically append one message to a ticket's transcript.
    ///
    /// Returns the entry as stored (its timestamp may have been clamped).
    pub fn append_message(
        &self,
        thread_id: &str,
        message: TicketMessage,
    ) -> DbResult<TicketMessage> {
        self.modify(thread_id, |ticket| ticket.push_message(message).clone())
    }

    /// Set the lifecycle status of a ticket.
    pub fn set_status(&self, thread_id: &str, status: TicketStatus) -> DbResult<Ticket> {
        self.modify(thread_id, |ticket| {
            ticket.status = status;
            ticket.clone()
        })
    }

    /// All tickets, ordered by thread id.
    pub fn list_all(&self) -> DbResult<Vec<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS)?;

        let mut tickets = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            tickets.push(serde_json::from_slice(value.value())?);
        }
        Ok(tickets)
    }

    /// Number of stored tickets.
    pub fn count(&self) -> DbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS)?;
        Ok(table.len()?)
    }

    /// Delete every ticket in one transaction. Returns how many were removed.
    pub fn delete_all(&self) -> DbResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(TICKETS)?;
            clear_table(&mut table)?
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Replace the entire ticket set in one transaction.
    ///
    /// Either the old set is fully replaced or nothing changes.
    pub fn replace_all(&self, tickets: &[Ticket]) -> DbResult<usize> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TICKETS)?;
            clear_table(&mut table)?;
            for ticket in tickets {
                let json = serde_json::to_vec(ticket)?;
                if table
                    .insert(ticket.thread_id.as_str(), json.as_slice())?
                    .is_some()
                {
                    // Dropping the transaction without commit aborts it.
                    return Err(DbError::AlreadyExists(format!(
                        "Ticket {}",
                        ticket.thread_id
                    )));
                }
            }
        }
        write_txn.commit()?;
        Ok(tickets.len())
    }

    /// Read-modify-write a single ticket inside one write transaction.
    fn modify<T>(&self, thread_id: &str, apply: impl FnOnce(&mut Ticket) -> T) -> DbResult<T> {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut table = write_txn.open_table(TICKETS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(thread_id)?
                    .ok_or_else(|| DbError::NotFound(format!("Ticket {thread_id}")))?;
                existing.value().to_vec()
            };

            let mut ticket: Ticket = serde_json::from_slice(&existing_bytes)?;
            let result = apply(&mut ticket);

            let json = serde_json::to_vec(&ticket)?;
            table.insert(thread_id, json.as_slice())?;
            result
        };
        write_txn.commit()?;
        Ok(result)
    }
}

fn clear_table(table: &mut redb::Table<'_, &'static str, &'static [u8]>) -> DbResult<usize> {
    let keys = table
        .iter()?
        .map(|entry| entry.map(|(key, _)| key.value().to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    for key in &keys {
        table.remove(key.as_str())?;
    }
    Ok(keys.len())
}
