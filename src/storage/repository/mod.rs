// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the support database.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using the SupportDatabase for all transactions.

pub mod access;
pub mod tickets;

pub use access::{normalize_identity, AccessControlList, AccessDenial};
pub use tickets::{SenderRole, Ticket, TicketMessage, TicketRepository, TicketStatus};
