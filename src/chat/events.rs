// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbound chat events, as delivered by the gateway adapter.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::commands::OperatorCommand;

/// A message posted in some chat channel.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel (or thread) the message was posted in.
    pub channel_id: String,
    /// Platform id of the author.
    pub author_id: String,
    /// Display name of the author.
    pub author_name: String,
    /// True when the relay's own bot account wrote the message.
    #[serde(default)]
    pub author_is_self: bool,
    /// True when the channel is a thread.
    #[serde(default)]
    pub is_thread_scoped: bool,
    /// Message text.
    pub content: String,
}

/// A slash command invoked by a chat user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct InboundCommand {
    /// Channel the command was invoked in.
    pub channel_id: String,
    /// Platform id of the invoking user.
    pub user_id: String,
    /// Parsed command and its options.
    pub command: OperatorCommand,
}

/// Event envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Message(InboundMessage),
    Command(InboundCommand),
}
