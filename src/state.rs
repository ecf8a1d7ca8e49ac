// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::admin::{AdminOperations, BackupCipher, CipherError};
use crate::challenge::{ChallengeError, ChallengeManager};
use crate::chat::ChatPlatform;
use crate::commands::CommandHandler;
use crate::config::Config;
use crate::delivery::CodeDelivery;
use crate::relay::{RelaySettings, TicketRelay};
use crate::storage::SupportDatabase;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backup cipher: {0}")]
    Cipher(#[from] CipherError),

    #[error("challenge manager: {0}")]
    Challenge(#[from] ChallengeError),
}

/// Shared handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SupportDatabase>,
    pub relay: Arc<TicketRelay>,
    pub commands: Arc<CommandHandler>,
    pub events_secret: Arc<str>,
}

impl AppState {
    /// Wire the relay, challenge manager and admin operations together.
    pub fn new(
        config: &Config,
        db: Arc<SupportDatabase>,
        chat: Arc<dyn ChatPlatform>,
        delivery: Arc<dyn CodeDelivery>,
        shutdown: &CancellationToken,
    ) -> Result<Self, StateError> {
        let settings = RelaySettings::new(config.support_channel_id.clone(), config.display_offset);
        let chat_timeout = settings.chat_timeout;
        let relay = Arc::new(TicketRelay::new(db.clone(), chat.clone(), settings, shutdown));

        let challenges = Arc::new(ChallengeManager::new(delivery, config.admin_email.clone())?);
        let admin = Arc::new(AdminOperations::new(
            db.clone(),
            BackupCipher::from_passphrase(&config.backup_key)?,
        ));

        let commands = Arc::new(CommandHandler::new(
            relay.clone(),
            challenges,
            admin,
            chat,
            db.clone(),
            config.admin_user_id.clone(),
            chat_timeout,
        ));

        Ok(Self {
            db,
            relay,
            commands,
            events_secret: Arc::from(config.events_secret.as_str()),
        })
    }
}
