// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Operator Commands
//!
//! Slash commands available in the support channel. The set is closed: the
//! gateway adapter sends `{ "name": "<command>", ...options }` and anything
//! outside this enum is rejected at deserialization time.
//!
//! | Command | Options | Effect |
//! |---------|---------|--------|
//! | `close-support` | | Close the ticket bound to the current thread |
//! | `questions-list` | | Show the predefined question table |
//! | `question` | `id` | Send a predefined question to the customer |
//! | `ban` | `identity`, `reason?` | Deny new sessions for an identity |
//! | `unban` | `identity` | Remove a denylist entry |
//! | `backup` | | Request an encrypted export (one-time code) |
//! | `delete-all` | | Request a full wipe (one-time code) |
//! | `restore` | `attachment_url` | Request a restore from an uploaded backup (one-time code) |
//! | `verify` | `code` | Confirm the pending sensitive action |
//!
//! Only the configured administrator may run any of them.

pub mod dispatch;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use dispatch::CommandHandler;

/// A parsed operator command.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum OperatorCommand {
    CloseSupport,
    QuestionsList,
    Question {
        id: u32,
    },
    Ban {
        identity: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Unban {
        identity: String,
    },
    Backup,
    DeleteAll,
    Restore {
        attachment_url: String,
    },
    Verify {
        code: String,
    },
}

impl OperatorCommand {
    /// Command name as registered on the chat platform.
    pub fn name(&self) -> &'static str {
        match self {
            OperatorCommand::CloseSupport => "close-support",
            OperatorCommand::QuestionsList => "questions-list",
            OperatorCommand::Question { .. } => "question",
            OperatorCommand::Ban { .. } => "ban",
            OperatorCommand::Unban { .. } => "unban",
            OperatorCommand::Backup => "backup",
            OperatorCommand::DeleteAll => "delete-all",
            OperatorCommand::Restore { .. } => "restore",
            OperatorCommand::Verify { .. } => "verify",
        }
    }
}

/// Reply the gateway adapter posts back to the invoking operator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CommandReply {
    /// Reply text.
    pub content: String,
    /// Only visible to the invoking user.
    pub ephemeral: bool,
}

impl CommandReply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}
