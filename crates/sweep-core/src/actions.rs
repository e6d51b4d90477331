//! User-facing chat workflows and their operator notices.

use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;

use crate::{
    broadcast::{BroadcastComposer, BroadcastMode, BroadcastReport},
    config::{BroadcastLimits, PurgeLimits},
    deferred::{ActionKey, ActionKind, ActionUpdate, DeferredActionScheduler, PendingHandle, Phase},
    directory::ChatDirectory,
    domain::{ChatCategory, ChatId, ChatInfo, MessageId, PrivilegeLevel, UserId},
    notify::{tell, Notifier},
    permission::PermissionResolver,
    purge::{
        members::NO_BAN_PERMISSION, messages::NO_DELETE_PERMISSION, BulkMessagePurger,
        MemberPurgeReport, MembershipPurger, PurgeReport, TerminalReason,
    },
    remote::{port::RemoteChatService, types::ChatMemberStatus},
    Error, Result,
};

pub const EMPTY_CHAT: &str = "This chat do not have any messages!";
pub const PURGE_SENDER_DONE: &str = "All of your/specific user messages is deleted!";

/// Which workflows make sense for a chat and the acting account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuCapabilities {
    pub delete_my_messages: bool,
    pub delete_all_messages: bool,
    pub remove_all_members: bool,
    pub tag_members: bool,
    pub clear_history: bool,
    pub leave_label: &'static str,
}

/// Tunables for `ChatControl`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlSettings {
    pub undo_window: Duration,
    pub purge: PurgeLimits,
    pub broadcast: BroadcastLimits,
}

#[derive(Clone)]
pub struct ChatControl {
    remote: Arc<dyn RemoteChatService>,
    directory: Arc<dyn ChatDirectory>,
    notifier: Arc<dyn Notifier>,
    scheduler: DeferredActionScheduler,
    permissions: PermissionResolver,
    messages: BulkMessagePurger,
    members: MembershipPurger,
    composer: BroadcastComposer,
    undo_window: Duration,
}

impl ChatControl {
    pub fn new(
        remote: Arc<dyn RemoteChatService>,
        directory: Arc<dyn ChatDirectory>,
        notifier: Arc<dyn Notifier>,
        settings: ControlSettings,
    ) -> Self {
        Self {
            scheduler: DeferredActionScheduler::new(notifier.clone()),
            permissions: PermissionResolver::new(remote.clone()),
            messages: BulkMessagePurger::new(remote.clone(), notifier.clone(), settings.purge),
            members: MembershipPurger::new(remote.clone(), notifier.clone(), settings.purge),
            composer: BroadcastComposer::new(remote.clone(), settings.broadcast),
            undo_window: settings.undo_window,
            remote,
            directory,
            notifier,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionUpdate> {
        self.scheduler.subscribe()
    }

    pub fn pending(&self) -> Vec<(ActionKey, Phase)> {
        self.scheduler.pending()
    }

    pub async fn menu(&self, chat: ChatId) -> Result<MenuCapabilities> {
        let info = self.directory.chat(chat).await?;
        let privilege = match info.category {
            ChatCategory::Private { .. } => PrivilegeLevel::None,
            _ => self.privilege(chat).await?,
        };
        let group = info.category.is_group();
        let channel = info.category.is_channel();

        Ok(MenuCapabilities {
            delete_my_messages: group && !channel,
            delete_all_messages: group && privilege.can_delete(),
            remove_all_members: group && privilege.can_delete(),
            tag_members: group && !channel,
            clear_history: !info.category.is_supergroup(),
            leave_label: match info.category {
                ChatCategory::Private { .. } => "Delete chat",
                ChatCategory::Supergroup {
                    is_channel: true, ..
                } => "Leave channel",
                _ => "Leave group",
            },
        })
    }

    /// Delete the acting account's own messages right away.
    pub async fn delete_my_messages(&self, chat: ChatId) -> Result<PurgeReport> {
        let result = async {
            let me = self.directory.me().await?;
            self.purge_sender(chat, me, me).await
        }
        .await;
        self.report(result, PURGE_SENDER_DONE).await
    }

    pub async fn delete_user_messages(&self, chat: ChatId, user: UserId) -> Result<PurgeReport> {
        let result = async {
            let me = self.directory.me().await?;
            self.purge_sender(chat, user, me).await
        }
        .await;
        self.report(result, PURGE_SENDER_DONE).await
    }

    async fn purge_sender(&self, chat: ChatId, sender: UserId, me: UserId) -> Result<PurgeReport> {
        let info = self.directory.chat(chat).await?;
        let privilege = self.privilege(chat).await?;
        self.messages
            .purge_by_sender(&info, sender, me, privilege)
            .await
    }

    /// Gate, then schedule a full history purge behind the undo window.
    pub async fn delete_all_messages(&self, chat: ChatId) -> Result<PendingHandle> {
        let result = async {
            let info = self.group(chat).await?;
            let privilege = self.privilege(chat).await?;
            if !privilege.can_delete() {
                return Err(Error::PermissionDenied(NO_DELETE_PERMISSION.to_string()));
            }

            let this = self.clone();
            let notice = format!("Deleting all messages in {}...", info.title);
            self.defer(chat, ActionKind::DeleteAllMessages, &notice, move || async move {
                this.commit_delete_all(info, privilege).await
            })
            .await
        }
        .await;
        self.surface(result).await
    }

    async fn commit_delete_all(&self, info: ChatInfo, privilege: PrivilegeLevel) -> Result<()> {
        let report = self.messages.purge_all(&info, privilege).await;
        let report = self.surface(report).await?;
        tell(self.notifier.as_ref(), &purge_summary(&info, &report)).await;
        Ok(())
    }

    /// Gate, then schedule removal of every non-admin member.
    pub async fn remove_all_members(&self, chat: ChatId) -> Result<PendingHandle> {
        let result = async {
            let info = self.group(chat).await?;
            let me = self.directory.me().await?;
            let privilege = self.privilege(chat).await?;
            if !privilege.can_restrict() {
                return Err(Error::PermissionDenied(NO_BAN_PERMISSION.to_string()));
            }

            let this = self.clone();
            let notice = format!("Removing all members of {}...", info.title);
            self.defer(chat, ActionKind::RemoveAllMembers, &notice, move || async move {
                this.commit_remove_all(info, me, privilege).await
            })
            .await
        }
        .await;
        self.surface(result).await
    }

    async fn commit_remove_all(
        &self,
        info: ChatInfo,
        me: UserId,
        privilege: PrivilegeLevel,
    ) -> Result<()> {
        let report = self.members.purge_all_members(&info, me, privilege).await;
        let report = self.surface(report).await?;
        tell(self.notifier.as_ref(), &removal_summary(&info, &report)).await;
        Ok(())
    }

    pub async fn leave_chat(&self, chat: ChatId) -> Result<PendingHandle> {
        let result = async {
            let info = self.directory.chat(chat).await?;
            let this = self.clone();
            let notice = format!("Leaving {}...", info.title);
            self.defer(chat, ActionKind::LeaveChat, &notice, move || async move {
                this.commit_leave(info).await
            })
            .await
        }
        .await;
        self.surface(result).await
    }

    async fn commit_leave(&self, info: ChatInfo) -> Result<()> {
        let result = async {
            match info.category {
                ChatCategory::Private { .. } => {
                    self.remote.delete_chat_history(info.id, true).await?;
                    Ok("Chat deleted")
                }
                ChatCategory::Supergroup { is_channel, .. } => {
                    let me = self.directory.me().await?;
                    if self.privilege(info.id).await? == PrivilegeLevel::Creator {
                        // A creator keeps ownership but stops being a member.
                        self.remote
                            .set_member_status(
                                info.id,
                                me,
                                ChatMemberStatus::Creator { is_member: false },
                            )
                            .await?;
                    } else {
                        self.remote.leave_chat(info.id).await?;
                    }
                    Ok(if is_channel { "Left channel" } else { "Left group" })
                }
                ChatCategory::BasicGroup { .. } => {
                    self.remote.leave_chat(info.id).await?;
                    Ok("Left group")
                }
            }
        }
        .await;
        let text = self.surface(result).await?;
        self.directory.forget(info.id).await;
        tell(self.notifier.as_ref(), text).await;
        Ok(())
    }

    pub async fn clear_history(&self, chat: ChatId) -> Result<PendingHandle> {
        let result = async {
            let info = self.directory.chat(chat).await?;
            if info.category.is_supergroup() {
                return Err(Error::UnsupportedChat(
                    "History can only be cleared in private chats and basic groups".to_string(),
                ));
            }
            let remote = self.remote.clone();
            let notifier = self.notifier.clone();
            let notice = format!("Clearing history of {}...", info.title);
            self.defer(chat, ActionKind::ClearHistory, &notice, move || async move {
                match remote.delete_chat_history(chat, false).await {
                    Ok(()) => {
                        tell(notifier.as_ref(), "History cleared").await;
                        Ok(())
                    }
                    Err(e) => {
                        tell(notifier.as_ref(), &notice_for(&e)).await;
                        Err(e)
                    }
                }
            })
            .await
        }
        .await;
        self.surface(result).await
    }

    pub async fn tag_admins(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
    ) -> Result<BroadcastReport> {
        self.tag(chat, BroadcastMode::Admins, reply_to).await
    }

    pub async fn tag_everyone(
        &self,
        chat: ChatId,
        reply_to: Option<MessageId>,
    ) -> Result<BroadcastReport> {
        self.tag(chat, BroadcastMode::Everyone, reply_to).await
    }

    async fn tag(
        &self,
        chat: ChatId,
        mode: BroadcastMode,
        reply_to: Option<MessageId>,
    ) -> Result<BroadcastReport> {
        let result = async {
            let info = self.group(chat).await?;
            let privilege = self.privilege(chat).await?;
            self.composer.compose(&info, mode, reply_to, privilege).await
        }
        .await;
        let report = self.surface(result).await?;
        if report.message.is_none() {
            tell(self.notifier.as_ref(), "Nobody to mention!").await;
        }
        Ok(report)
    }

    /// Cancel a deferred action inside its undo window.
    pub async fn undo(&self, key: ActionKey) -> bool {
        self.scheduler.cancel(key).await
    }

    async fn defer<F, Fut>(
        &self,
        chat: ChatId,
        kind: ActionKind,
        notice: &str,
        commit: F,
    ) -> Result<PendingHandle>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let key = ActionKey::new(chat, kind);
        let notifier = self.notifier.clone();
        let on_cancel = Box::new(move || {
            tokio::spawn(async move {
                tell(notifier.as_ref(), "Action cancelled.").await;
            });
        });
        self.scheduler
            .schedule(key, notice, self.undo_window, commit, Some(on_cancel))
            .await
    }

    async fn group(&self, chat: ChatId) -> Result<ChatInfo> {
        let info = self.directory.chat(chat).await?;
        if !info.category.is_group() {
            return Err(Error::UnsupportedChat(
                "This works in groups and channels only".to_string(),
            ));
        }
        Ok(info)
    }

    /// Privilege of the acting account; an unresolved lookup counts as none.
    async fn privilege(&self, chat: ChatId) -> Result<PrivilegeLevel> {
        let me = self.directory.me().await?;
        Ok(self.permissions.resolve_or_none(chat, me).await)
    }

    async fn report(&self, result: Result<PurgeReport>, done: &str) -> Result<PurgeReport> {
        let report = self.surface(result).await?;
        tell(self.notifier.as_ref(), done).await;
        Ok(report)
    }

    /// Forward an error to the operator as a transient notice.
    async fn surface<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "workflow failed");
            tell(self.notifier.as_ref(), &notice_for(e)).await;
        }
        result
    }
}

fn noun(info: &ChatInfo) -> &'static str {
    if info.category.is_channel() {
        "channel"
    } else {
        "group"
    }
}

fn purge_summary(info: &ChatInfo, report: &PurgeReport) -> String {
    match report.terminal {
        TerminalReason::NothingToDo => EMPTY_CHAT.to_string(),
        TerminalReason::Exhausted | TerminalReason::BelowPageSize => {
            format!("All {} messages removed!", noun(info))
        }
        TerminalReason::Stalled | TerminalReason::IterationCap | TerminalReason::QuotaReached => {
            format!(
                "Deleted {} messages; the rest of the {} history could not be removed.",
                report.deleted_messages,
                noun(info)
            )
        }
    }
}

fn removal_summary(info: &ChatInfo, report: &MemberPurgeReport) -> String {
    match report.terminal {
        TerminalReason::NothingToDo => "There are no members to remove!".to_string(),
        TerminalReason::QuotaReached => format!("All {} members removed!", noun(info)),
        _ => format!(
            "Removed {} members; {} removal attempts failed.",
            report.removed, report.failed
        ),
    }
}

/// Operator-facing text for a failed workflow.
pub fn notice_for(e: &Error) -> String {
    match e {
        Error::PermissionDenied(text) | Error::UnsupportedChat(text) => text.clone(),
        Error::TooManyMembers { limit, .. } => {
            format!("@everyone can used at (<=){limit} users group only!")
        }
        Error::AlreadyPending(_) => "This action is already pending.".to_string(),
        Error::Backend { message, .. } => format!("Error: {message}"),
        other => format!("Error: {other}"),
    }
}
