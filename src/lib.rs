// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Support Bridge - web widget to chat thread relay
//!
//! Customers open support sessions from the web widget; each session becomes
//! a thread in the operators' support channel and messages flow both ways.
//! Bulk backup, wipe and restore of tickets are gated behind one-time codes
//! emailed to the administrator.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - HMAC signatures on inbound chat events
//! - `relay` - ticket lifecycle and message relay
//! - `commands` - operator slash commands
//! - `challenge` - one-time code challenges for sensitive actions
//! - `admin` - encrypted backup, wipe and restore
//! - `chat` - chat platform client (Discord REST)
//! - `delivery` - one-time code email delivery
//! - `storage` - embedded database (redb)

pub mod admin;
pub mod api;
pub mod auth;
pub mod challenge;
pub mod chat;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod error;
pub mod models;
pub mod relay;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
