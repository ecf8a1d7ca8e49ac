// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    chat::{ChatEvent, InboundCommand, InboundMessage},
    commands::{CommandReply, OperatorCommand},
    models::{
        EventResponse, SendMessageRequest, SendMessageResponse, StartTicketRequest,
        StartTicketResponse, TicketHistoryResponse,
    },
    state::AppState,
    storage::{SenderRole, TicketMessage, TicketStatus},
};

pub mod events;
pub mod health;
pub mod tickets;

pub fn router(state: AppState) -> Router {
    let ticket_routes = Router::new()
        .route("/tickets/start", post(tickets::start_ticket))
        .route("/tickets/history/{thread_id}", get(tickets::ticket_history))
        .route("/tickets/send", post(tickets::send_message));

    let v1_routes = Router::new().route("/chat/events", post(events::chat_event));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api", ticket_routes)
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        tickets::start_ticket,
        tickets::ticket_history,
        tickets::send_message,
        events::chat_event
    ),
    components(
        schemas(
            StartTicketRequest,
            StartTicketResponse,
            TicketHistoryResponse,
            SendMessageRequest,
            SendMessageResponse,
            TicketMessage,
            SenderRole,
            TicketStatus,
            ChatEvent,
            InboundMessage,
            InboundCommand,
            OperatorCommand,
            CommandReply,
            EventResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Tickets", description = "Web widget support sessions"),
        (name = "Chat", description = "Signed events from the chat gateway adapter")
    )
)]
pub struct ApiDoc;
