// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process fakes and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatError, ChatMessage, ChatPlatform, DirectFile};
use crate::config::Config;
use crate::delivery::{CodeDelivery, DeliveryError};
use crate::state::AppState;
use crate::storage::{SupportDatabase, Ticket, TicketMessage, TicketRepository, TicketStatus};

pub const ADMIN_USER: &str = "admin-user";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const EVENTS_SECRET: &str = "test events secret";

pub fn temp_db() -> (Arc<SupportDatabase>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = SupportDatabase::open(&dir.path().join("support.redb")).unwrap();
    (Arc::new(db), dir)
}

pub fn sample_ticket(thread_id: &str) -> Ticket {
    Ticket {
        thread_id: thread_id.to_string(),
        customer_name: "Alice".to_string(),
        customer_identity: "alice@example.com".to_string(),
        customer_handle: "alice".to_string(),
        avatar_url: None,
        banner_url: None,
        status: TicketStatus::Open,
        created_at: Utc::now(),
        messages: vec![TicketMessage::system("Support session started for Alice")],
    }
}

pub fn test_config(data_dir: &Path) -> Config {
    let data_dir = data_dir.display().to_string();
    let vars = HashMap::from([
        ("DATA_DIR", data_dir.as_str()),
        ("DISCORD_TOKEN", "test-token"),
        ("SUPPORT_CHANNEL_ID", "support-channel"),
        ("ADMIN_USER_ID", ADMIN_USER),
        ("ADMIN_EMAIL", ADMIN_EMAIL),
        ("BACKUP_KEY", "test backup passphrase"),
        ("EVENTS_SECRET", EVENTS_SECRET),
    ]);
    Config::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
}

// =============================================================================
// Chat fake
// =============================================================================

#[derive(Default)]
struct ChatState {
    created: Vec<(String, String)>,
    posts: Vec<(String, ChatMessage)>,
    deleted: Vec<String>,
    direct_files: Vec<(String, DirectFile)>,
    attachments: HashMap<String, Vec<u8>>,
    next_thread: u64,
    fixed_thread_id: Option<String>,
    fail_creates: bool,
    fail_posts: bool,
    stall_posts: bool,
    fail_deletes: bool,
    fail_direct_files: bool,
}

/// Records every chat call; failures are switched on per operation.
#[derive(Default)]
pub struct RecordingChat {
    state: Mutex<ChatState>,
}

impl RecordingChat {
    pub fn created(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn posts(&self) -> Vec<(String, ChatMessage)> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn direct_files(&self) -> Vec<(String, DirectFile)> {
        self.state.lock().unwrap().direct_files.clone()
    }

    pub fn add_attachment(&self, url: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .attachments
            .insert(url.to_string(), bytes);
    }

    /// Every created thread gets this id.
    pub fn reuse_thread_id(&self, id: &str) {
        self.state.lock().unwrap().fixed_thread_id = Some(id.to_string());
    }

    pub fn fail_creates(&self) {
        self.state.lock().unwrap().fail_creates = true;
    }

    pub fn fail_posts(&self) {
        self.state.lock().unwrap().fail_posts = true;
    }

    /// Posts never complete.
    pub fn stall_posts(&self) {
        self.state.lock().unwrap().stall_posts = true;
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    pub fn fail_direct_files(&self) {
        self.state.lock().unwrap().fail_direct_files = true;
    }
}

fn unavailable() -> ChatError {
    ChatError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl ChatPlatform for RecordingChat {
    async fn create_thread_channel(
        &self,
        parent_id: &str,
        title: &str,
    ) -> Result<String, ChatError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates {
            return Err(unavailable());
        }
        state.next_thread += 1;
        let id = state
            .fixed_thread_id
            .clone()
            .unwrap_or_else(|| format!("thread-{}", state.next_thread));
        state.created.push((parent_id.to_string(), title.to_string()));
        Ok(id)
    }

    async fn post_message(&self, channel_id: &str, message: &ChatMessage) -> Result<(), ChatError> {
        let stall = {
            let mut state = self.state.lock().unwrap();
            if state.fail_posts {
                return Err(unavailable());
            }
            if !state.stall_posts {
                state.posts.push((channel_id.to_string(), message.clone()));
            }
            state.stall_posts
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), ChatError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(unavailable());
        }
        state.deleted.push(channel_id.to_string());
        Ok(())
    }

    async fn send_direct_file(&self, user_id: &str, file: DirectFile) -> Result<(), ChatError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_direct_files {
            return Err(unavailable());
        }
        state.direct_files.push((user_id.to_string(), file));
        Ok(())
    }

    async fn fetch_attachment(&self, url: &str) -> Result<Vec<u8>, ChatError> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .get(url)
            .cloned()
            .ok_or(ChatError::Status {
                status: 404,
                body: "not found".to_string(),
            })
    }
}

// =============================================================================
// Delivery fake
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentCode {
    pub address: String,
    pub code: String,
    pub action: String,
}

#[derive(Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<SentCode>>,
    fail_next: Mutex<bool>,
}

impl RecordingDelivery {
    pub fn sent(&self) -> Vec<SentCode> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_code(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|s| s.code.clone())
    }

    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait]
impl CodeDelivery for RecordingDelivery {
    async fn send_one_time_code(
        &self,
        address: &str,
        code: &str,
        action: &str,
    ) -> Result<(), DeliveryError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(DeliveryError::Status {
                status: 500,
                body: "mail outage".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentCode {
            address: address.to_string(),
            code: code.to_string(),
            action: action.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Fully wired state
// =============================================================================

pub struct Harness {
    pub state: AppState,
    pub chat: Arc<RecordingChat>,
    pub delivery: Arc<RecordingDelivery>,
    pub shutdown: CancellationToken,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let db = Arc::new(SupportDatabase::open(&config.database_path()).unwrap());
        let chat = Arc::new(RecordingChat::default());
        let delivery = Arc::new(RecordingDelivery::default());
        let shutdown = CancellationToken::new();

        let state = AppState::new(&config, db, chat.clone(), delivery.clone(), &shutdown).unwrap();
        Self {
            state,
            chat,
            delivery,
            shutdown,
            _dir: dir,
        }
    }

    /// Store a ticket directly, bypassing the relay.
    pub fn seed(&self, thread_id: &str) {
        TicketRepository::new(&self.state.db)
            .create(&sample_ticket(thread_id))
            .unwrap();
    }
}
