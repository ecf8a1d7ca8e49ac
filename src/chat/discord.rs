// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discord REST (v10) implementation of [`ChatPlatform`].
//!
//! Only the REST surface is used here. The gateway connection that produces
//! inbound events lives in a separate adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{ChatError, ChatMessage, ChatPlatform, DirectFile, Embed};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Channel type for a public thread.
const PUBLIC_THREAD: u8 = 11;

/// Threads archive after a day without activity.
const AUTO_ARCHIVE_MINUTES: u32 = 1440;

/// Discord rejects thread names longer than this (in characters).
const THREAD_NAME_LIMIT: usize = 100;

/// Hosts that serve message attachments.
const ATTACHMENT_HOSTS: &[&str] = &["cdn.discordapp.com", "media.discordapp.net"];

/// Upper bound for downloaded attachments (25 MiB, the platform upload cap).
const MAX_ATTACHMENT_BYTES: usize = 25 * 1024 * 1024;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct DiscordClient {
    api_base: String,
    bot_token: String,
    http: Client,
}

impl DiscordClient {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ChatError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("Bot {}", self.bot_token))
    }

    /// Send a request and return the JSON body (`Value::Null` for empty bodies).
    async fn send(&self, request: RequestBuilder) -> Result<Value, ChatError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ChatError::InvalidResponse(e.to_string()))
    }

    /// Open (or reuse) the private channel with a user.
    async fn open_direct_channel(&self, user_id: &str) -> Result<String, ChatError> {
        let response = self
            .send(
                self.http
                    .post(self.url("/users/@me/channels"))
                    .json(&json!({ "recipient_id": user_id })),
            )
            .await?;
        extract_id(&response)
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn create_thread_channel(
        &self,
        parent_id: &str,
        title: &str,
    ) -> Result<String, ChatError> {
        let payload = json!({
            "name": truncate_chars(title, THREAD_NAME_LIMIT),
            "type": PUBLIC_THREAD,
            "auto_archive_duration": AUTO_ARCHIVE_MINUTES,
        });

        let response = self
            .send(
                self.http
                    .post(self.url(&format!("/channels/{parent_id}/threads")))
                    .json(&payload),
            )
            .await?;

        let thread_id = extract_id(&response)?;
        debug!(parent_id = %parent_id, thread_id = %thread_id, "Discord thread created");
        Ok(thread_id)
    }

    async fn post_message(&self, channel_id: &str, message: &ChatMessage) -> Result<(), ChatError> {
        self.send(
            self.http
                .post(self.url(&format!("/channels/{channel_id}/messages")))
                .json(&message_payload(message)),
        )
        .await?;
        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), ChatError> {
        self.send(self.http.delete(self.url(&format!("/channels/{channel_id}"))))
            .await?;
        Ok(())
    }

    async fn send_direct_file(&self, user_id: &str, file: DirectFile) -> Result<(), ChatError> {
        let channel_id = self.open_direct_channel(user_id).await?;

        let payload = json!({
            "content": file.note,
            "attachments": [{ "id": 0, "filename": file.filename }],
        });
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str("application/octet-stream")
            .map_err(|e| ChatError::Request(e.to_string()))?;
        let form = multipart::Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", part);

        self.send(
            self.http
                .post(self.url(&format!("/channels/{channel_id}/messages")))
                .multipart(form),
        )
        .await?;
        Ok(())
    }

    async fn fetch_attachment(&self, url: &str) -> Result<Vec<u8>, ChatError> {
        let url = validate_attachment_url(url)?;

        // CDN links are pre-signed; the bot token must not leave the API host.
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        if response
            .content_length()
            .is_some_and(|len| len as usize > MAX_ATTACHMENT_BYTES)
        {
            return Err(ChatError::AttachmentRejected("attachment too large".to_string()));
        }

        read_capped(response, MAX_ATTACHMENT_BYTES).await
    }
}

/// Read a body chunk by chunk, giving up as soon as it exceeds `limit`.
async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, ChatError> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ChatError::Request(e.to_string()))?
    {
        if body.len() + chunk.len() > limit {
            return Err(ChatError::AttachmentRejected("attachment too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Only HTTPS links on the platform's attachment CDN are accepted.
fn validate_attachment_url(raw: &str) -> Result<Url, ChatError> {
    let url = Url::parse(raw)
        .map_err(|e| ChatError::AttachmentRejected(format!("invalid URL: {e}")))?;

    if url.scheme() != "https" {
        return Err(ChatError::AttachmentRejected(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    match url.host_str() {
        Some(host) if ATTACHMENT_HOSTS.contains(&host) => Ok(url),
        Some(host) => Err(ChatError::AttachmentRejected(format!("host {host} not allowed"))),
        None => Err(ChatError::AttachmentRejected("missing host".to_string())),
    }
}

fn extract_id(response: &Value) -> Result<String, ChatError> {
    response
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ChatError::InvalidResponse("missing id in response".to_string()))
}

fn message_payload(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::Text(content) => json!({ "content": content }),
        ChatMessage::Embed(embed) => json!({ "embeds": [embed_json(embed)] }),
    }
}

fn embed_json(embed: &Embed) -> Value {
    let mut value = json!({
        "title": embed.title,
        "color": embed.color,
        "fields": embed
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
            .collect::<Vec<_>>(),
    });

    if let Some(description) = &embed.description {
        value["description"] = json!(description);
    }
    if let Some(url) = &embed.thumbnail_url {
        value["thumbnail"] = json!({ "url": url });
    }
    if let Some(url) = &embed.image_url {
        value["image"] = json!({ "url": url });
    }
    if let Some(timestamp) = &embed.timestamp {
        value["timestamp"] = json!(timestamp.to_rfc3339());
    }
    value
}

fn truncate_chars(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}
