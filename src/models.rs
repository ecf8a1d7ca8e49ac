// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON handling
//! and OpenAPI documentation.
//!
//! Field names are camelCase because the web widget already speaks that
//! format (`threadId`, not `thread_id`).
//!
//! ## Model Categories
//!
//! - **Tickets**: session start, history polling, customer messages
//! - **Chat events**: the reply returned to the gateway adapter

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::commands::CommandReply;
use crate::storage::{TicketMessage, TicketStatus};

// =============================================================================
// Ticket Models
// =============================================================================

/// Request to open a support session from the widget.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTicketRequest {
    /// Customer display name.
    pub name: String,
    /// External identity of the customer (denylist key).
    pub identity: String,
    /// Customer handle on the web side.
    #[serde(default)]
    pub handle: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Banner image URL.
    #[serde(default)]
    pub banner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTicketResponse {
    pub success: bool,
    /// Thread the widget should poll and post to.
    pub thread_id: String,
}

/// Transcript as seen by the widget.
///
/// Unknown threads answer with an empty transcript and status `closed`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketHistoryResponse {
    pub success: bool,
    pub messages: Vec<TicketMessage>,
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub thread_id: String,
    /// Display name shown in the thread.
    pub author: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    pub success: bool,
}

// =============================================================================
// Chat Event Models
// =============================================================================

/// Outcome of an inbound chat event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    /// Whether a thread message was added to a transcript.
    pub recorded: bool,
    /// Reply to post back for command events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<CommandReply>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_accepts_widget_payload() {
        let request: StartTicketRequest = serde_json::from_value(serde_json::json!({
            "name": "Alice",
            "identity": "alice@example.com",
            "avatar": "https://cdn.example/a.png"
        }))
        .unwrap();
        assert_eq!(request.name, "Alice");
        assert!(request.handle.is_none());
        assert!(request.banner.is_none());
    }

    #[test]
    fn responses_use_camel_case() {
        let json = serde_json::to_value(StartTicketResponse {
            success: true,
            thread_id: "T1".to_string(),
        })
        .unwrap();
        assert_eq!(json["threadId"], "T1");

        let request: SendMessageRequest =
            serde_json::from_str(r#"{"threadId":"T1","author":"Alice","message":"hi"}"#).unwrap();
        assert_eq!(request.thread_id, "T1");
    }

    #[test]
    fn event_response_omits_missing_reply() {
        let json = serde_json::to_value(EventResponse {
            recorded: true,
            reply: None,
        })
        .unwrap();
        assert!(json.get("reply").is_none());
    }
}
