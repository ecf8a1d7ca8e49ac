// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ticket Relay
//!
//! Mirrors a support conversation between the web widget and a chat thread.
//!
//! ## Flow
//!
//! 1. The widget starts a session. Unless the identity is denylisted, a
//!    thread named `🔴 Support - {name}` is created under the support channel,
//!    an intro card is posted, and the ticket is stored with a system entry.
//! 2. Customer messages are posted to the thread as `**{author}**: {text}`
//!    and then appended to the transcript.
//! 3. Operator messages in the thread are appended as `operator` entries.
//!    The widget polls the history endpoint to see them.
//! 4. Closing marks the ticket `closed` and deletes the thread after a
//!    grace period.
//!
//! Posting and recording are two separate steps. A post that succeeds
//! followed by a failed append leaves the message visible in the thread but
//! missing from the transcript.

pub mod questions;
pub mod scheduler;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use scheduler::DeletionScheduler;

use crate::audit_log;
use crate::chat::{ChatError, ChatMessage, ChatPlatform, Embed, InboundMessage};
use crate::storage::{
    AccessControlList, AuditEvent, AuditEventType, DbError, SupportDatabase, Ticket,
    TicketMessage, TicketRepository, TicketStatus,
};

/// Red side bar on the intro card.
const INTRO_COLOR: u32 = 0xE7_4C_3C;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("access denied for this identity")]
    AccessDenied,

    #[error("failed to create support thread: {0}")]
    ChannelCreateFailed(#[source] ChatError),

    #[error("chat operation failed: {0}")]
    ChannelOperationFailed(#[source] ChatError),

    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    #[error("ticket already exists for thread {0}")]
    TicketAlreadyExists(String),

    #[error("unknown question id {0}")]
    UnknownQuestionId(u32),

    #[error("storage error: {0}")]
    Storage(DbError),
}

impl From<DbError> for RelayError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => RelayError::TicketNotFound(what),
            DbError::AlreadyExists(what) => RelayError::TicketAlreadyExists(what),
            other => RelayError::Storage(other),
        }
    }
}

/// Relay tuning.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Parent channel for support threads.
    pub support_channel_id: String,
    /// Offset used to render local times on the intro card.
    pub display_offset: FixedOffset,
    /// Delay between close and thread deletion.
    pub close_grace: Duration,
    /// Upper bound for any single chat call.
    pub chat_timeout: Duration,
}

impl RelaySettings {
    pub fn new(support_channel_id: impl Into<String>, display_offset: FixedOffset) -> Self {
        Self {
            support_channel_id: support_channel_id.into(),
            display_offset,
            close_grace: Duration::from_secs(5),
            chat_timeout: Duration::from_secs(15),
        }
    }
}

/// Customer details supplied by the widget.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub customer_name: String,
    pub customer_identity: String,
    pub customer_handle: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketHistory {
    pub messages: Vec<TicketMessage>,
    pub status: TicketStatus,
}

/// What happened to an inbound thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorMessageOutcome {
    Recorded,
    IgnoredSelf,
    IgnoredNotThread,
    IgnoredCommand,
    IgnoredUnknownThread,
}

pub struct TicketRelay {
    db: Arc<SupportDatabase>,
    chat: Arc<dyn ChatPlatform>,
    settings: RelaySettings,
    deletions: DeletionScheduler,
}

impl TicketRelay {
    pub fn new(
        db: Arc<SupportDatabase>,
        chat: Arc<dyn ChatPlatform>,
        settings: RelaySettings,
        shutdown: &CancellationToken,
    ) -> Self {
        let deletions = DeletionScheduler::new(
            chat.clone(),
            settings.close_grace,
            settings.chat_timeout,
            shutdown,
        );
        Self {
            db,
            chat,
            settings,
            deletions,
        }
    }

    pub fn deletions(&self) -> &DeletionScheduler {
        &self.deletions
    }

    /// Open a support session and return its thread id.
    pub async fn start_session(&self, session: NewSession) -> Result<String, RelayError> {
        if AccessControlList::new(&self.db).is_denied(&session.customer_identity)? {
            audit_log!(
                &self.db,
                AuditEvent::new(AuditEventType::SessionRejected)
                    .with_actor(session.customer_identity.as_str())
                    .failed("identity is denylisted")
            );
            info!(
                identity = %session.customer_identity,
                "Rejected session for denylisted identity"
            );
            return Err(RelayError::AccessDenied);
        }

        let title = format!("🔴 Support - {}", session.customer_name);
        let thread_id = self
            .bounded(
                self.chat
                    .create_thread_channel(&self.settings.support_channel_id, &title),
            )
            .await
            .map_err(RelayError::ChannelCreateFailed)?;

        let created_at = Utc::now();
        let intro = ChatMessage::Embed(self.intro_card(&session, created_at));
        if let Err(e) = self.bounded(self.chat.post_message(&thread_id, &intro)).await {
            warn!(thread_id = %thread_id, error = %e, "Failed to post intro card");
        }

        let ticket = Ticket {
            thread_id: thread_id.clone(),
            customer_name: session.customer_name.clone(),
            customer_identity: session.customer_identity.clone(),
            customer_handle: session.customer_handle,
            avatar_url: session.avatar_url,
            banner_url: session.banner_url,
            status: TicketStatus::Open,
            created_at,
            messages: vec![TicketMessage::system(format!(
                "Support session started for {}",
                session.customer_name
            ))],
        };
        TicketRepository::new(&self.db)
            .create(&ticket)
            .map_err(|e| match e {
                DbError::AlreadyExists(_) => RelayError::TicketAlreadyExists(thread_id.clone()),
                other => other.into(),
            })?;

        audit_log!(
            &self.db,
            AuditEventType::SessionStarted,
            session.customer_identity.as_str(),
            "ticket",
            thread_id.as_str()
        );
        info!(thread_id = %thread_id, customer = %session.customer_name, "Support session started");
        Ok(thread_id)
    }

    /// Transcript and status. Unknown threads read as an empty closed ticket.
    pub fn get_history(&self, thread_id: &str) -> Result<TicketHistory, RelayError> {
        let history = match TicketRepository::new(&self.db).get(thread_id)? {
            Some(ticket) => TicketHistory {
                messages: ticket.messages,
                status: ticket.status,
            },
            None => TicketHistory {
                messages: Vec::new(),
                status: TicketStatus::Closed,
            },
        };
        Ok(history)
    }

    /// Post a customer message to the thread, then record it.
    pub async fn relay_customer_message(
        &self,
        thread_id: &str,
        author: &str,
        content: &str,
    ) -> Result<TicketMessage, RelayError> {
        let repo = TicketRepository::new(&self.db);
        if repo.get(thread_id)?.is_none() {
            return Err(RelayError::TicketNotFound(thread_id.to_string()));
        }

        let text = ChatMessage::Text(format!("**{author}**: {content}"));
        self.bounded(self.chat.post_message(thread_id, &text))
            .await
            .map_err(RelayError::ChannelOperationFailed)?;

        let stored = repo.append_message(thread_id, TicketMessage::customer(author, content))?;
        debug!(thread_id = %thread_id, "Customer message relayed");
        Ok(stored)
    }

    /// Record a message an operator wrote in a support thread.
    pub fn relay_operator_message(
        &self,
        message: &InboundMessage,
    ) -> Result<OperatorMessageOutcome, RelayError> {
        if message.author_is_self {
            return Ok(OperatorMessageOutcome::IgnoredSelf);
        }
        if !message.is_thread_scoped {
            return Ok(OperatorMessageOutcome::IgnoredNotThread);
        }
        if message.content.starts_with('/') {
            return Ok(OperatorMessageOutcome::IgnoredCommand);
        }

        let entry = TicketMessage::operator(message.author_name.as_str(), message.content.as_str());
        match TicketRepository::new(&self.db).append_message(&message.channel_id, entry) {
            Ok(_) => {
                debug!(thread_id = %message.channel_id, "Operator message recorded");
                Ok(OperatorMessageOutcome::Recorded)
            }
            Err(DbError::NotFound(_)) => Ok(OperatorMessageOutcome::IgnoredUnknownThread),
            Err(e) => Err(e.into()),
        }
    }

    /// Append a predefined question as a system entry the customer will see.
    pub fn send_predefined_question(
        &self,
        thread_id: &str,
        question_id: u32,
    ) -> Result<&'static str, RelayError> {
        let text =
            questions::lookup(question_id).ok_or(RelayError::UnknownQuestionId(question_id))?;
        TicketRepository::new(&self.db).append_message(
            thread_id,
            TicketMessage::system(format!("📝 PRE-SUPPORT QUESTION: {text}")),
        )?;
        info!(thread_id = %thread_id, question_id, "Pre-support question sent");
        Ok(text)
    }

    pub fn list_questions(&self) -> String {
        questions::render_list()
    }

    /// Mark the ticket closed and schedule its thread for deletion.
    pub async fn close_session(&self, thread_id: &str) -> Result<Ticket, RelayError> {
        let ticket = TicketRepository::new(&self.db).set_status(thread_id, TicketStatus::Closed)?;
        self.deletions.schedule(thread_id).await;
        info!(thread_id = %thread_id, "Support session closed");
        Ok(ticket)
    }

    fn intro_card(&self, session: &NewSession, created_at: chrono::DateTime<Utc>) -> Embed {
        let local = created_at.with_timezone(&self.settings.display_offset);
        let mut card = Embed::new("🎫 New Support Session")
            .field("Name", session.customer_name.as_str(), true)
            .field("Identity", session.customer_identity.as_str(), true)
            .field("Handle", session.customer_handle.as_str(), true)
            .field("Started", local.format("%Y-%m-%d %H:%M:%S %:z").to_string(), false);
        card.color = INTRO_COLOR;
        card.thumbnail_url = session.avatar_url.clone();
        card.image_url = session.banner_url.clone();
        card.timestamp = Some(created_at);
        card
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ChatError>>,
    ) -> Result<T, ChatError> {
        let limit = self.settings.chat_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| ChatError::Timeout(limit))?
    }
}
