// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Web widget endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::ApiError;
use crate::models::{
    SendMessageRequest, SendMessageResponse, StartTicketRequest, StartTicketResponse,
    TicketHistoryResponse,
};
use crate::relay::NewSession;
use crate::state::AppState;

fn non_empty(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Open a support session.
///
/// Creates the operator thread and returns its id.
#[utoipa::path(
    post,
    path = "/api/tickets/start",
    tag = "Tickets",
    request_body = StartTicketRequest,
    responses(
        (status = 200, description = "Session started", body = StartTicketResponse),
        (status = 400, description = "Missing name or identity"),
        (status = 403, description = "Identity is denylisted"),
        (status = 502, description = "Chat platform unavailable")
    )
)]
pub async fn start_ticket(
    State(state): State<AppState>,
    Json(request): Json<StartTicketRequest>,
) -> Result<Json<StartTicketResponse>, ApiError> {
    non_empty(&request.name, "name")?;
    non_empty(&request.identity, "identity")?;

    let handle = request.handle.unwrap_or_else(|| request.name.clone());
    let thread_id = state
        .relay
        .start_session(NewSession {
            customer_name: request.name,
            customer_identity: request.identity,
            customer_handle: handle,
            avatar_url: request.avatar,
            banner_url: request.banner,
        })
        .await?;

    Ok(Json(StartTicketResponse {
        success: true,
        thread_id,
    }))
}

/// Transcript polling for the widget.
#[utoipa::path(
    get,
    path = "/api/tickets/history/{thread_id}",
    tag = "Tickets",
    params(("thread_id" = String, Path, description = "Support thread id")),
    responses(
        (status = 200, description = "Transcript and status", body = TicketHistoryResponse)
    )
)]
pub async fn ticket_history(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<TicketHistoryResponse>, ApiError> {
    let history = state.relay.get_history(&thread_id)?;
    Ok(Json(TicketHistoryResponse {
        success: true,
        messages: history.messages,
        status: history.status,
    }))
}

/// Relay a customer message into the thread.
#[utoipa::path(
    post,
    path = "/api/tickets/send",
    tag = "Tickets",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message relayed", body = SendMessageResponse),
        (status = 400, description = "Empty message"),
        (status = 404, description = "Unknown thread"),
        (status = 502, description = "Chat platform unavailable")
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    non_empty(&request.message, "message")?;

    state
        .relay
        .relay_customer_message(&request.thread_id, &request.author, &request.message)
        .await?;

    Ok(Json(SendMessageResponse { success: true }))
}
