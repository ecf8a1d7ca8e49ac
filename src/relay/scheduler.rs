// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deferred thread deletion.
//!
//! Closing a ticket leaves the thread visible for a short grace period
//! before it is deleted. Each pending deletion owns a child of the service
//! shutdown token, so shutdown cancels every deletion that has not fired.
//! Rescheduling the same thread replaces the earlier deletion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::ChatPlatform;

type PendingMap = HashMap<String, (u64, CancellationToken)>;

pub struct DeletionScheduler {
    chat: Arc<dyn ChatPlatform>,
    grace: Duration,
    call_timeout: Duration,
    pending: Arc<Mutex<PendingMap>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

impl DeletionScheduler {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        grace: Duration,
        call_timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Self {
        Self {
            chat,
            grace,
            call_timeout,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            shutdown: shutdown.child_token(),
        }
    }

    /// Delete `channel_id` once the grace period has elapsed.
    pub async fn schedule(&self, channel_id: &str) {
        let token = self.shutdown.child_token();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        {
            let mut pending = self.pending.lock().await;
            if let Some((_, previous)) =
                pending.insert(channel_id.to_string(), (generation, token.clone()))
            {
                previous.cancel();
            }
        }

        let chat = self.chat.clone();
        let pending = self.pending.clone();
        let channel_id = channel_id.to_string();
        let grace = self.grace;
        let call_timeout = self.call_timeout;

        debug!(channel_id = %channel_id, grace_secs = grace.as_secs(), "Thread deletion scheduled");

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(channel_id = %channel_id, "Thread deletion cancelled");
                }
                _ = tokio::time::sleep(grace) => {
                    let deleted =
                        tokio::time::timeout(call_timeout, chat.delete_channel(&channel_id)).await;
                    match deleted {
                        Ok(Ok(())) => info!(channel_id = %channel_id, "Support thread deleted"),
                        Ok(Err(e)) => warn!(
                            channel_id = %channel_id,
                            error = %e,
                            "Failed to delete support thread"
                        ),
                        Err(_) => {
                            warn!(channel_id = %channel_id, "Timed out deleting support thread");
                        }
                    }
                }
            }

            let mut pending = pending.lock().await;
            if pending
                .get(&channel_id)
                .is_some_and(|(current, _)| *current == generation)
            {
                pending.remove(&channel_id);
            }
        });
    }

    /// Cancel a pending deletion. Returns whether one was pending.
    pub async fn cancel(&self, channel_id: &str) -> bool {
        match self.pending.lock().await.remove(channel_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of deletions that have not fired yet.
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingChat;

    const GRACE: Duration = Duration::from_secs(5);
    const TIMEOUT: Duration = Duration::from_secs(15);

    fn scheduler(chat: Arc<RecordingChat>, shutdown: &CancellationToken) -> DeletionScheduler {
        DeletionScheduler::new(chat, GRACE, TIMEOUT, shutdown)
    }

    #[tokio::test(start_paused = true)]
    async fn deletes_after_grace_period() {
        let chat = Arc::new(RecordingChat::default());
        let shutdown = CancellationToken::new();
        let scheduler = scheduler(chat.clone(), &shutdown);

        scheduler.schedule("T1").await;
        assert_eq!(scheduler.pending().await, 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(chat.deleted().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(chat.deleted(), ["T1"]);
        assert_eq!(scheduler.pending().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_deletion() {
        let chat = Arc::new(RecordingChat::default());
        let shutdown = CancellationToken::new();
        let scheduler = scheduler(chat.clone(), &shutdown);

        scheduler.schedule("T1").await;
        assert!(scheduler.cancel("T1").await);
        assert!(!scheduler.cancel("T1").await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(chat.deleted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_deletions() {
        let chat = Arc::new(RecordingChat::default());
        let shutdown = CancellationToken::new();
        let scheduler = scheduler(chat.clone(), &shutdown);

        scheduler.schedule("T1").await;
        scheduler.schedule("T2").await;
        shutdown.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(chat.deleted().is_empty());
        assert_eq!(scheduler.pending().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_deletes_once() {
        let chat = Arc::new(RecordingChat::default());
        let shutdown = CancellationToken::new();
        let scheduler = scheduler(chat.clone(), &shutdown);

        scheduler.schedule("T1").await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        scheduler.schedule("T1").await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(chat.deleted().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(chat.deleted(), ["T1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_deletion_is_not_retried() {
        let chat = Arc::new(RecordingChat::default());
        chat.fail_deletes();
        let shutdown = CancellationToken::new();
        let scheduler = scheduler(chat.clone(), &shutdown);

        scheduler.schedule("T1").await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(chat.deleted().is_empty());
        assert_eq!(scheduler.pending().await, 0);
    }
}
