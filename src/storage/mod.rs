// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single embedded redb database under
//! `DATA_DIR`:
//!
//! ```text
//! {DATA_DIR}/
//!   support.redb
//!     tickets          # thread_id -> Ticket (transcript embedded)
//!     access_denials   # identity  -> AccessDenial
//!     audit_events     # time|id   -> AuditEvent
//! ```
//!
//! Repositories borrow the database and expose typed CRUD for one entity
//! each. Mutations are single write transactions; ticket transcripts are
//! extended with an in-transaction append, never by a caller-side
//! read-modify-write.

pub mod audit;
pub mod database;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use database::{DbError, DbResult, SupportDatabase};
pub use repository::{
    AccessControlList, AccessDenial, SenderRole, Ticket, TicketMessage, TicketRepository,
    TicketStatus,
};
