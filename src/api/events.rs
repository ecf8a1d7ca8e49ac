// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbound chat events from the gateway adapter.

use axum::{extract::State, Json};
use tracing::debug;

use crate::auth::SignedJson;
use crate::chat::ChatEvent;
use crate::error::ApiError;
use crate::models::EventResponse;
use crate::relay::OperatorMessageOutcome;
use crate::state::AppState;

/// Handle a thread message or operator command.
///
/// Command replies are returned for the adapter to post back.
#[utoipa::path(
    post,
    path = "/v1/chat/events",
    tag = "Chat",
    request_body = ChatEvent,
    params(("X-Relay-Signature" = String, Header, description = "base64 HMAC-SHA256 of the body")),
    responses(
        (status = 200, description = "Event handled", body = EventResponse),
        (status = 401, description = "Missing or invalid signature"),
        (status = 422, description = "Unknown event or command")
    )
)]
pub async fn chat_event(
    State(state): State<AppState>,
    SignedJson(event): SignedJson<ChatEvent>,
) -> Result<Json<EventResponse>, ApiError> {
    let response = match event {
        ChatEvent::Message(message) => {
            let outcome = state.relay.relay_operator_message(&message)?;
            debug!(channel_id = %message.channel_id, outcome = ?outcome, "Thread message handled");
            EventResponse {
                recorded: outcome == OperatorMessageOutcome::Recorded,
                reply: None,
            }
        }
        ChatEvent::Command(command) => EventResponse {
            recorded: false,
            reply: Some(state.commands.handle(&command).await),
        },
    };
    Ok(Json(response))
}
