// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Chat Platform Capability
//!
//! The relay never talks to a chat SDK directly. Everything it needs from the
//! platform goes through [`ChatPlatform`]:
//!
//! - create a thread under the support channel
//! - post text or an embed into a thread
//! - delete a thread
//! - send a file to the administrator's private channel
//! - download an attachment the operator uploaded
//!
//! Inbound traffic (thread messages and slash commands) arrives as
//! [`ChatEvent`]s posted by the gateway adapter to `/v1/chat/events`.

pub mod discord;
pub mod events;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use discord::DiscordClient;
pub use events::{ChatEvent, InboundCommand, InboundMessage};

/// Error type for chat platform calls.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Request(String),

    #[error("chat platform returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("chat response was invalid: {0}")]
    InvalidResponse(String),

    #[error("chat call timed out after {0:?}")]
    Timeout(Duration),

    #[error("attachment rejected: {0}")]
    AttachmentRejected(String),
}

/// A field inside an embed card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich card content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub thumbnail_url: Option<String>,
    pub image_url: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Outbound message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    Text(String),
    Embed(Embed),
}

/// A file addressed to a user's private channel.
#[derive(Debug, Clone)]
pub struct DirectFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub note: String,
}

/// Operations the relay consumes from the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Create a thread-scoped channel under `parent_id`. Returns the thread id.
    async fn create_thread_channel(&self, parent_id: &str, title: &str)
        -> Result<String, ChatError>;

    /// Post a message into a channel or thread.
    async fn post_message(&self, channel_id: &str, message: &ChatMessage) -> Result<(), ChatError>;

    /// Delete a channel or thread.
    async fn delete_channel(&self, channel_id: &str) -> Result<(), ChatError>;

    /// Deliver a file to a user's private channel.
    async fn send_direct_file(&self, user_id: &str, file: DirectFile) -> Result<(), ChatError>;

    /// Download an attachment uploaded to the platform.
    async fn fetch_attachment(&self, url: &str) -> Result<Vec<u8>, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_builder_collects_fields() {
        let embed = Embed::new("New ticket")
            .field("Name", "Alice", true)
            .field("Identity", "alice@example.com", false);

        assert_eq!(embed.title, "New ticket");
        assert_eq!(embed.fields.len(), 2);
        assert!(embed.fields[0].inline);
        assert_eq!(embed.fields[1].value, "alice@example.com");
        assert!(embed.thumbnail_url.is_none());
    }
}
