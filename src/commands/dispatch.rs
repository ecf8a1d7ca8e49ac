// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator command handling.
//!
//! Every command produces a reply; failures are reported as text rather
//! than errors so the operator always sees an outcome.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use super::{CommandReply, OperatorCommand};
use crate::admin::{AdminOperations, AdminOutcome};
use crate::audit_log;
use crate::challenge::{ChallengeError, ChallengeManager, PendingAction};
use crate::chat::{ChatPlatform, DirectFile, InboundCommand};
use crate::relay::{RelayError, TicketRelay};
use crate::storage::{AccessControlList, AuditEvent, AuditEventType, SupportDatabase};

const DEFAULT_BAN_REASON: &str = "No reason provided";

pub struct CommandHandler {
    relay: Arc<TicketRelay>,
    challenges: Arc<ChallengeManager>,
    admin: Arc<AdminOperations>,
    chat: Arc<dyn ChatPlatform>,
    db: Arc<SupportDatabase>,
    admin_user_id: String,
    chat_timeout: Duration,
}

impl CommandHandler {
    pub fn new(
        relay: Arc<TicketRelay>,
        challenges: Arc<ChallengeManager>,
        admin: Arc<AdminOperations>,
        chat: Arc<dyn ChatPlatform>,
        db: Arc<SupportDatabase>,
        admin_user_id: String,
        chat_timeout: Duration,
    ) -> Self {
        Self {
            relay,
            challenges,
            admin,
            chat,
            db,
            admin_user_id,
            chat_timeout,
        }
    }

    pub async fn handle(&self, event: &InboundCommand) -> CommandReply {
        if event.user_id != self.admin_user_id {
            warn!(
                user_id = %event.user_id,
                command = event.command.name(),
                "Operator command denied"
            );
            audit_log!(
                &self.db,
                AuditEvent::new(AuditEventType::PermissionDenied)
                    .with_actor(event.user_id.as_str())
                    .with_details(json!({ "command": event.command.name() }))
                    .failed("not the administrator")
            );
            return CommandReply::private("❌ No Perms");
        }

        info!(command = event.command.name(), channel_id = %event.channel_id, "Operator command");
        let actor = event.user_id.as_str();

        match &event.command {
            OperatorCommand::CloseSupport => self.close(actor, &event.channel_id).await,
            OperatorCommand::QuestionsList => CommandReply::private(self.relay.list_questions()),
            OperatorCommand::Question { id } => self.question(&event.channel_id, *id),
            OperatorCommand::Ban { identity, reason } => {
                self.ban(actor, identity, reason.as_deref())
            }
            OperatorCommand::Unban { identity } => self.unban(actor, identity),
            OperatorCommand::Backup => self.request(actor, PendingAction::Backup).await,
            OperatorCommand::DeleteAll => self.request(actor, PendingAction::DeleteAll).await,
            OperatorCommand::Restore { attachment_url } => {
                self.request_restore(actor, attachment_url).await
            }
            OperatorCommand::Verify { code } => self.verify(actor, code).await,
        }
    }

    async fn close(&self, actor: &str, channel_id: &str) -> CommandReply {
        match self.relay.close_session(channel_id).await {
            Ok(_) => {
                audit_log!(&self.db, AuditEventType::SessionClosed, actor, "ticket", channel_id);
                CommandReply::public("🔒 Closing in 5s...")
            }
            Err(RelayError::TicketNotFound(_)) => {
                CommandReply::private("❌ This channel is not a support thread.")
            }
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Failed to close ticket");
                CommandReply::private(format!("❌ Failed to close ticket: {e}"))
            }
        }
    }

    fn question(&self, channel_id: &str, id: u32) -> CommandReply {
        match self.relay.send_predefined_question(channel_id, id) {
            Ok(_) => CommandReply::private(format!("✅ Sent Q#{id}")),
            Err(RelayError::UnknownQuestionId(_)) => {
                CommandReply::private(format!("❌ Unknown question #{id}. Use /questions-list."))
            }
            Err(RelayError::TicketNotFound(_)) => {
                CommandReply::private("❌ This channel is not a support thread.")
            }
            Err(e) => CommandReply::private(format!("❌ Failed to send question: {e}")),
        }
    }

    fn ban(&self, actor: &str, identity: &str, reason: Option<&str>) -> CommandReply {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_BAN_REASON);

        match AccessControlList::new(&self.db).ban(identity, reason) {
            Ok(denial) => {
                audit_log!(
                    &self.db,
                    AuditEvent::new(AuditEventType::IdentityBanned)
                        .with_actor(actor)
                        .with_resource("identity", denial.identity.as_str())
                        .with_details(json!({ "reason": reason }))
                );
                CommandReply::private(format!("🚫 Banned {}: {reason}", denial.identity))
            }
            Err(e) => CommandReply::private(format!("❌ Failed to ban {identity}: {e}")),
        }
    }

    fn unban(&self, actor: &str, identity: &str) -> CommandReply {
        match AccessControlList::new(&self.db).unban(identity) {
            Ok(true) => {
                audit_log!(&self.db, AuditEventType::IdentityUnbanned, actor, "identity", identity);
                CommandReply::private(format!("✅ Unbanned {identity}"))
            }
            Ok(false) => CommandReply::private(format!("ℹ️ {identity} was not banned")),
            Err(e) => CommandReply::private(format!("❌ Failed to unban {identity}: {e}")),
        }
    }

    /// Issue a challenge for a sensitive action.
    async fn request(&self, actor: &str, action: PendingAction) -> CommandReply {
        let tag = action.tag();
        match self.challenges.issue(action).await {
            Ok(issued) => {
                audit_log!(
                    &self.db,
                    AuditEvent::new(AuditEventType::ChallengeIssued)
                        .with_actor(actor)
                        .with_details(json!({ "action": tag, "expires_at": issued.expires_at }))
                );
                CommandReply::private(format!(
                    "📧 A verification code for `{tag}` was sent to the admin email. \
                     Run /verify with the code within 10 minutes."
                ))
            }
            Err(e) => {
                audit_log!(
                    &self.db,
                    AuditEvent::new(AuditEventType::ChallengeIssued)
                        .with_actor(actor)
                        .with_details(json!({ "action": tag }))
                        .failed(e.to_string())
                );
                CommandReply::private(format!("❌ Could not send the verification code: {e}"))
            }
        }
    }

    /// Download and validate the backup first; the challenge carries the result.
    async fn request_restore(&self, actor: &str, attachment_url: &str) -> CommandReply {
        let download =
            tokio::time::timeout(self.chat_timeout, self.chat.fetch_attachment(attachment_url))
                .await;
        let bytes = match download {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                return CommandReply::private(format!("❌ Could not download backup: {e}"))
            }
            Err(_) => return CommandReply::private("❌ Could not download backup: timed out"),
        };

        match self.admin.decode_backup(&bytes) {
            Ok(tickets) => self.request(actor, PendingAction::Restore { tickets }).await,
            Err(e) => {
                warn!(error = %e, "Rejected backup upload");
                CommandReply::private(format!("❌ Backup rejected: {e}"))
            }
        }
    }

    async fn verify(&self, actor: &str, code: &str) -> CommandReply {
        let authorized = match self.challenges.validate(code).await {
            Ok(authorized) => authorized,
            Err(e) => {
                audit_log!(
                    &self.db,
                    AuditEvent::new(AuditEventType::ChallengeFailed)
                        .with_actor(actor)
                        .failed(e.to_string())
                );
                let text = match e {
                    ChallengeError::NoPendingChallenge => {
                        "❌ No pending action to verify.".to_string()
                    }
                    ChallengeError::ChallengeExpired => {
                        "⌛ Code expired. Request the action again.".to_string()
                    }
                    ChallengeError::CodeMismatch => "❌ Incorrect code.".to_string(),
                    other => format!("❌ Verification failed: {other}"),
                };
                return CommandReply::private(text);
            }
        };

        let tag = authorized.action().tag();
        match self.admin.execute(authorized) {
            Ok(AdminOutcome::Exported(backup)) => {
                audit_log!(
                    &self.db,
                    AuditEvent::new(AuditEventType::BackupExported)
                        .with_actor(actor)
                        .with_resource("store", backup.filename.as_str())
                        .with_details(json!({ "tickets": backup.ticket_count }))
                );

                let count = backup.ticket_count;
                let filename = backup.filename.clone();
                let file = DirectFile {
                    filename: backup.filename,
                    bytes: backup.ciphertext,
                    note: format!("🔐 Encrypted support backup ({count} tickets)"),
                };
                let sent = tokio::time::timeout(
                    self.chat_timeout,
                    self.chat.send_direct_file(&self.admin_user_id, file),
                )
                .await;
                match sent {
                    Ok(Ok(())) => CommandReply::private(format!(
                        "✅ Backup with {count} tickets sent to your DMs ({filename})."
                    )),
                    Ok(Err(e)) => {
                        warn!(error = %e, "Failed to deliver backup");
                        CommandReply::private(format!(
                            "⚠️ Backup created ({filename}, {count} tickets) \
                             but could not be delivered: {e}"
                        ))
                    }
                    Err(_) => CommandReply::private(format!(
                        "⚠️ Backup created ({filename}, {count} tickets) \
                         but could not be delivered: timed out"
                    )),
                }
            }
            Ok(AdminOutcome::Wiped { removed }) => {
                audit_log!(
                    &self.db,
                    AuditEvent::new(AuditEventType::StoreWiped)
                        .with_actor(actor)
                        .with_details(json!({ "removed": removed }))
                );
                CommandReply::private(format!("🗑️ Deleted {removed} tickets."))
            }
            Ok(AdminOutcome::Restored { restored }) => {
                audit_log!(
                    &self.db,
                    AuditEvent::new(AuditEventType::StoreRestored)
                        .with_actor(actor)
                        .with_details(json!({ "restored": restored }))
                );
                CommandReply::private(format!("♻️ Restored {restored} tickets from backup."))
            }
            Err(e) => {
                warn!(action = tag, error = %e, "Administrative action failed");
                CommandReply::private(format!("❌ {tag} failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AuditRepository, TicketRepository, TicketStatus};
    use crate::test_support::{Harness, ADMIN_EMAIL, ADMIN_USER};
    use chrono::{Duration as ChronoDuration, Utc};

    fn command(user_id: &str, channel_id: &str, command: OperatorCommand) -> InboundCommand {
        InboundCommand {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            command,
        }
    }

    async fn run(h: &Harness, cmd: OperatorCommand) -> CommandReply {
        h.state.commands.handle(&command(ADMIN_USER, "T1", cmd)).await
    }

    #[tokio::test]
    async fn non_admin_is_refused() {
        let h = Harness::new();
        h.seed("T1");

        let reply = h
            .state
            .commands
            .handle(&command("intruder", "T1", OperatorCommand::DeleteAll))
            .await;
        assert_eq!(reply, CommandReply::private("❌ No Perms"));
        assert!(h.delivery.sent().is_empty());

        let events = AuditRepository::new(&h.state.db).recent(1).unwrap();
        assert_eq!(events[0].event_type, AuditEventType::PermissionDenied);
        assert_eq!(events[0].actor_id.as_deref(), Some("intruder"));
    }

    #[tokio::test]
    async fn close_support_replies_publicly() {
        let h = Harness::new();
        h.seed("T1");

        let reply = run(&h, OperatorCommand::CloseSupport).await;
        assert_eq!(reply, CommandReply::public("🔒 Closing in 5s..."));
        assert_eq!(
            TicketRepository::new(&h.state.db).get("T1").unwrap().unwrap().status,
            TicketStatus::Closed
        );
        assert_eq!(h.state.relay.deletions().pending().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_deletion_of_closed_thread() {
        let h = Harness::new();
        h.seed("T1");

        run(&h, OperatorCommand::CloseSupport).await;
        h.shutdown.cancel();

        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        assert!(h.chat.deleted().is_empty());
        assert_eq!(h.state.relay.deletions().pending().await, 0);
    }

    #[tokio::test]
    async fn close_outside_support_thread() {
        let h = Harness::new();
        let reply = run(&h, OperatorCommand::CloseSupport).await;
        assert_eq!(reply.content, "❌ This channel is not a support thread.");
    }

    #[tokio::test]
    async fn question_commands() {
        let h = Harness::new();
        h.seed("T1");

        assert_eq!(run(&h, OperatorCommand::Question { id: 3 }).await.content, "✅ Sent Q#3");
        assert_eq!(
            run(&h, OperatorCommand::Question { id: 6 }).await.content,
            "❌ Unknown question #6. Use /questions-list."
        );

        let list = run(&h, OperatorCommand::QuestionsList).await;
        assert!(list.ephemeral);
        assert!(list.content.starts_with("**Available Questions:**"));
    }

    #[tokio::test]
    async fn ban_and_unban() {
        let h = Harness::new();

        let reply = run(
            &h,
            OperatorCommand::Ban {
                identity: "spammer@example.com".to_string(),
                reason: None,
            },
        )
        .await;
        assert_eq!(reply.content, "🚫 Banned spammer@example.com: No reason provided");
        assert!(AccessControlList::new(&h.state.db).is_denied("spammer@example.com").unwrap());

        let reply = run(
            &h,
            OperatorCommand::Unban {
                identity: "spammer@example.com".to_string(),
            },
        )
        .await;
        assert_eq!(reply.content, "✅ Unbanned spammer@example.com");

        let reply = run(
            &h,
            OperatorCommand::Unban {
                identity: "spammer@example.com".to_string(),
            },
        )
        .await;
        assert_eq!(reply.content, "ℹ️ spammer@example.com was not banned");
    }

    #[tokio::test]
    async fn backup_is_code_gated_and_sent_to_admin() {
        let h = Harness::new();
        h.seed("T1");
        h.seed("T2");

        let reply = run(&h, OperatorCommand::Backup).await;
        assert!(reply.content.starts_with("📧"));
        assert!(h.chat.direct_files().is_empty());

        let code = h.delivery.last_code().unwrap();
        assert!(!reply.content.contains(&code));

        let sent = h.delivery.sent();
        assert_eq!(sent[0].address, ADMIN_EMAIL);
        assert_eq!(sent[0].action, PendingAction::Backup.label());

        let reply = run(&h, OperatorCommand::Verify { code }).await;
        assert!(reply.content.starts_with("✅ Backup with 2 tickets"));

        let files = h.chat.direct_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, ADMIN_USER);
        assert!(files[0].1.filename.starts_with("support-backup-"));
    }

    #[tokio::test]
    async fn undeliverable_backup_is_reported() {
        let h = Harness::new();
        h.seed("T1");
        h.chat.fail_direct_files();

        run(&h, OperatorCommand::Backup).await;
        let code = h.delivery.last_code().unwrap();
        let reply = run(&h, OperatorCommand::Verify { code }).await;
        assert!(reply.content.starts_with("⚠️ Backup created"));
    }

    #[tokio::test]
    async fn delete_all_with_wrong_then_right_code() {
        let h = Harness::new();
        h.seed("T1");

        run(&h, OperatorCommand::DeleteAll).await;
        let code = h.delivery.last_code().unwrap();
        let wrong = if code == "999999" { "000000" } else { "999999" };

        let reply = run(&h, OperatorCommand::Verify { code: wrong.to_string() }).await;
        assert_eq!(reply.content, "❌ Incorrect code.");
        assert_eq!(TicketRepository::new(&h.state.db).count().unwrap(), 1);

        let reply = run(&h, OperatorCommand::Verify { code: code.clone() }).await;
        assert_eq!(reply.content, "🗑️ Deleted 1 tickets.");
        assert_eq!(TicketRepository::new(&h.state.db).count().unwrap(), 0);

        let reply = run(&h, OperatorCommand::Verify { code }).await;
        assert_eq!(reply.content, "❌ No pending action to verify.");
    }

    #[tokio::test]
    async fn expired_delete_all_leaves_store_untouched() {
        let h = Harness::new();
        h.seed("T1");

        h.state
            .commands
            .challenges
            .issue_at(PendingAction::DeleteAll, Utc::now() - ChronoDuration::minutes(11))
            .await
            .unwrap();
        let code = h.delivery.last_code().unwrap();

        let reply = run(&h, OperatorCommand::Verify { code }).await;
        assert_eq!(reply.content, "⌛ Code expired. Request the action again.");
        assert_eq!(TicketRepository::new(&h.state.db).count().unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_code_delivery_is_reported() {
        let h = Harness::new();
        h.delivery.fail_next();

        let reply = run(&h, OperatorCommand::DeleteAll).await;
        assert!(reply.content.starts_with("❌ Could not send the verification code"));
        assert_eq!(
            run(&h, OperatorCommand::Verify { code: "123456".to_string() }).await.content,
            "❌ No pending action to verify."
        );
    }

    #[tokio::test]
    async fn restore_round_trip() {
        let h = Harness::new();
        h.seed("T1");
        h.seed("T2");
        let original = TicketRepository::new(&h.state.db).list_all().unwrap();

        run(&h, OperatorCommand::Backup).await;
        let code = h.delivery.last_code().unwrap();
        run(&h, OperatorCommand::Verify { code }).await;
        let backup = h.chat.direct_files().remove(0).1;

        TicketRepository::new(&h.state.db).delete_all().unwrap();
        h.seed("STRAY");

        let url = "https://cdn.discordapp.com/attachments/1/2/backup.enc";
        h.chat.add_attachment(url, backup.bytes);

        let reply = run(
            &h,
            OperatorCommand::Restore {
                attachment_url: url.to_string(),
            },
        )
        .await;
        assert!(reply.content.starts_with("📧"));
        // Nothing is applied before verification
        assert_eq!(TicketRepository::new(&h.state.db).count().unwrap(), 1);

        let code = h.delivery.last_code().unwrap();
        let reply = run(&h, OperatorCommand::Verify { code }).await;
        assert_eq!(reply.content, "♻️ Restored 2 tickets from backup.");
        assert_eq!(TicketRepository::new(&h.state.db).list_all().unwrap(), original);
    }

    #[tokio::test]
    async fn corrupt_restore_issues_no_challenge() {
        let h = Harness::new();
        h.seed("T1");

        let url = "https://cdn.discordapp.com/attachments/1/2/garbage.enc";
        h.chat.add_attachment(url, b"definitely not a backup".to_vec());

        let reply = run(
            &h,
            OperatorCommand::Restore {
                attachment_url: url.to_string(),
            },
        )
        .await;
        assert!(reply.content.starts_with("❌ Backup rejected"));
        assert!(h.delivery.sent().is_empty());
        assert_eq!(TicketRepository::new(&h.state.db).count().unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_attachment_is_reported() {
        let h = Harness::new();
        let reply = run(
            &h,
            OperatorCommand::Restore {
                attachment_url: "https://cdn.discordapp.com/missing".to_string(),
            },
        )
        .await;
        assert!(reply.content.starts_with("❌ Could not download backup"));
    }

    #[tokio::test]
    async fn admin_actions_are_audited() {
        let h = Harness::new();
        h.seed("T1");

        run(&h, OperatorCommand::DeleteAll).await;
        let code = h.delivery.last_code().unwrap();
        run(&h, OperatorCommand::Verify { code }).await;

        let types: Vec<_> = AuditRepository::new(&h.state.db)
            .recent(10)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert!(types.contains(&AuditEventType::ChallengeIssued));
        assert!(types.contains(&AuditEventType::StoreWiped));
    }
}
