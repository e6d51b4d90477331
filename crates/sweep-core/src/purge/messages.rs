use std::sync::Arc;

use crate::{
    config::PurgeLimits,
    domain::{BasicGroupId, ChatCategory, ChatId, ChatInfo, MessageId, PrivilegeLevel, UserId},
    notify::{tell, Notifier},
    purge::TerminalReason,
    remote::{port::RemoteChatService, types::LastMessage},
    Error, Result,
};

pub const NO_DELETE_PERMISSION: &str = "You do not have delete messages permission!";
pub const UPGRADED_FROM_BASIC_GROUP: &str = "Seems this group was upgraded from Basic Group.";
pub const PURGING_ANCESTOR: &str = "Deleting Basic Group chat history...Please wait a moment.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted_batches: usize,
    /// Ids submitted for deletion. Synthesized supergroup ids count even if
    /// the backend had nothing under them.
    pub deleted_messages: usize,
    /// Ancestor basic group chat purged along the way.
    pub ancestor: Option<ChatId>,
    pub terminal: TerminalReason,
}

impl PurgeReport {
    fn absorb(&mut self, other: &PurgeReport) {
        self.deleted_batches += other.deleted_batches;
        self.deleted_messages += other.deleted_messages;
    }
}

/// Deletes message history by sender or wholesale, per chat category.
#[derive(Clone)]
pub struct BulkMessagePurger {
    remote: Arc<dyn RemoteChatService>,
    notifier: Arc<dyn Notifier>,
    limits: PurgeLimits,
}

impl BulkMessagePurger {
    pub fn new(
        remote: Arc<dyn RemoteChatService>,
        notifier: Arc<dyn Notifier>,
        limits: PurgeLimits,
    ) -> Self {
        Self {
            remote,
            notifier,
            limits,
        }
    }

    /// Delete every message `sender` authored in `chat`.
    ///
    /// `actor` may always purge their own messages; anyone else's need delete
    /// rights.
    pub async fn purge_by_sender(
        &self,
        chat: &ChatInfo,
        sender: UserId,
        actor: UserId,
        privilege: PrivilegeLevel,
    ) -> Result<PurgeReport> {
        if !privilege.can_purge_sender(actor, sender) {
            return Err(Error::PermissionDenied(NO_DELETE_PERMISSION.to_string()));
        }

        // Join/leave service messages cannot be removed without delete rights.
        let skip_structural = chat.category.is_supergroup() && !privilege.can_delete();

        tracing::info!(chat_id = chat.id.0, sender = sender.0, "purging sender messages");
        let report = self.drain_sender(chat.id, sender, skip_structural).await?;
        tracing::info!(
            chat_id = chat.id.0,
            sender = sender.0,
            deleted = report.deleted_messages,
            terminal = ?report.terminal,
            "sender purge finished"
        );
        Ok(report)
    }

    /// Delete the whole history of a group or channel.
    pub async fn purge_all(&self, chat: &ChatInfo, privilege: PrivilegeLevel) -> Result<PurgeReport> {
        if !privilege.can_delete() {
            return Err(Error::PermissionDenied(NO_DELETE_PERMISSION.to_string()));
        }

        tracing::info!(chat_id = chat.id.0, category = ?chat.category, "purging chat history");
        let report = match chat.category {
            ChatCategory::Private { .. } => {
                return Err(Error::UnsupportedChat(
                    "Only groups and channels can be purged".to_string(),
                ))
            }
            ChatCategory::BasicGroup { .. } => self.drain_basic_group(chat.id).await?,
            ChatCategory::Supergroup { upgraded_from, .. } => {
                self.sweep_supergroup(chat.id, upgraded_from).await?
            }
        };
        tracing::info!(
            chat_id = chat.id.0,
            batches = report.deleted_batches,
            deleted = report.deleted_messages,
            terminal = ?report.terminal,
            "chat purge finished"
        );
        Ok(report)
    }

    /// Search-and-delete pages of `sender`'s messages until a page reports
    /// fewer matches than the page size.
    async fn drain_sender(
        &self,
        chat: ChatId,
        sender: UserId,
        skip_structural: bool,
    ) -> Result<PurgeReport> {
        let page_size = self.limits.search_page_size;
        let mut report = PurgeReport::default();

        for iteration in 0..self.limits.max_iterations {
            let page = self
                .remote
                .search_messages_by_sender(chat, sender, 0, page_size)
                .await?;
            if iteration == 0 && page.total_count == 0 {
                return Ok(report);
            }

            let ids: Vec<MessageId> = page
                .messages
                .iter()
                .filter(|m| !(skip_structural && m.kind.is_membership_change()))
                .map(|m| m.id)
                .collect();
            tracing::debug!(
                chat_id = chat.0,
                sender = sender.0,
                total = page.total_count,
                batch = ids.len(),
                "sender page"
            );

            if !ids.is_empty() {
                self.remote.delete_messages(chat, &ids, true).await?;
                report.deleted_batches += 1;
                report.deleted_messages += ids.len();
            }

            if page.total_count < page_size {
                report.terminal = TerminalReason::BelowPageSize;
                return Ok(report);
            }
            if ids.is_empty() {
                report.terminal = TerminalReason::Stalled;
                return Ok(report);
            }

            tokio::time::sleep(self.limits.page_delay).await;
        }

        tracing::warn!(chat_id = chat.0, sender = sender.0, "sender purge hit iteration cap");
        report.terminal = TerminalReason::IterationCap;
        Ok(report)
    }

    /// Basic groups have no dense id space: repeatedly take the author of the
    /// last message and drain everything they wrote.
    async fn drain_basic_group(&self, chat: ChatId) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        let mut previous: Option<LastMessage> = None;

        for _ in 0..self.limits.max_iterations {
            let summary = self.remote.fetch_chat_summary(chat).await?;
            let Some(last) = summary.last_message else {
                if report.deleted_messages > 0 {
                    report.terminal = TerminalReason::Exhausted;
                }
                return Ok(report);
            };
            if previous == Some(last) {
                tracing::warn!(chat_id = chat.0, message_id = last.id.0, "last message survived a full pass");
                report.terminal = TerminalReason::Stalled;
                return Ok(report);
            }
            let Some(sender) = last.sender else {
                tracing::warn!(chat_id = chat.0, message_id = last.id.0, "last message has no user sender");
                report.terminal = TerminalReason::Stalled;
                return Ok(report);
            };

            let pass = self.drain_sender(chat, sender, false).await?;
            report.absorb(&pass);
            if pass.terminal == TerminalReason::IterationCap {
                report.terminal = TerminalReason::IterationCap;
                return Ok(report);
            }
            previous = Some(last);
        }

        tracing::warn!(chat_id = chat.0, "basic group purge hit iteration cap");
        report.terminal = TerminalReason::IterationCap;
        Ok(report)
    }

    /// Supergroup ids are `sequence * QUANTUM`, so the whole history is every
    /// sequence number up to the last one. Sequence 1 is reserved.
    async fn sweep_supergroup(
        &self,
        chat: ChatId,
        upgraded_from: Option<BasicGroupId>,
    ) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        let summary = self.remote.fetch_chat_summary(chat).await?;
        let Some(last) = summary.last_message else {
            return Ok(report);
        };

        // A migrated group starts its own history right after the upgrade
        // notice; earlier messages live in the ancestor basic group.
        if last.id.is_first_in_sequence() {
            if let Some(ancestor) = upgraded_from {
                tell(self.notifier.as_ref(), UPGRADED_FROM_BASIC_GROUP).await;
                tell(self.notifier.as_ref(), PURGING_ANCESTOR).await;
                let ancestor_chat = self.remote.open_basic_group_chat(ancestor).await?;
                tracing::info!(chat_id = chat.0, ancestor = ancestor_chat.0, "purging ancestor basic group");
                let inherited = self.drain_basic_group(ancestor_chat).await?;
                report.absorb(&inherited);
                report.ancestor = Some(ancestor_chat);
            }
        }

        let ids: Vec<MessageId> = (2..=last.id.sequence())
            .rev()
            .map(MessageId::from_sequence)
            .collect();
        if !ids.is_empty() {
            self.remote.delete_messages(chat, &ids, true).await?;
            report.deleted_batches += 1;
            report.deleted_messages += ids.len();
        }

        if report.deleted_messages > 0 || report.ancestor.is_some() {
            report.terminal = TerminalReason::Exhausted;
        }
        Ok(report)
    }
}
