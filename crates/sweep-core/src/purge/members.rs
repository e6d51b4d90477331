use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::PurgeLimits,
    domain::{ChatCategory, ChatInfo, MemberStatus, MembershipRecord, PrivilegeLevel, UserId},
    notify::{tell, Notifier},
    purge::TerminalReason,
    remote::{
        port::RemoteChatService,
        types::{ChatMemberStatus, MembersFilter},
    },
    Error, Result,
};

pub const NO_BAN_PERMISSION: &str = "You do not have ban users permission!";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemberPurgeReport {
    pub removed: usize,
    /// Removal attempts the backend rejected, counted once per attempt.
    pub failed: usize,
    pub terminal: TerminalReason,
}

/// Evicts every non-admin member with a short temporary ban.
#[derive(Clone)]
pub struct MembershipPurger {
    remote: Arc<dyn RemoteChatService>,
    notifier: Arc<dyn Notifier>,
    limits: PurgeLimits,
}

impl MembershipPurger {
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

    pub async fn purge_all_members(
        &self,
        chat: &ChatInfo,
        actor: UserId,
        privilege: PrivilegeLevel,
    ) -> Result<MemberPurgeReport> {
        if !privilege.can_restrict() {
            return Err(Error::PermissionDenied(NO_BAN_PERMISSION.to_string()));
        }

        let (member_count, admin_count, mut first_page) = match chat.category {
            ChatCategory::Private { .. } => {
                return Err(Error::UnsupportedChat(
                    "Only groups and channels have members to remove".to_string(),
                ))
            }
            ChatCategory::BasicGroup { basic_group_id } => {
                let full = self.remote.fetch_basic_group_full_info(basic_group_id).await?;
                let admins = full.members.iter().filter(|m| m.status.is_privileged()).count();
                (full.members.len(), admins, Some(full.members))
            }
            ChatCategory::Supergroup { supergroup_id, .. } => {
                let full = self.remote.fetch_supergroup_full_info(supergroup_id).await?;
                (full.member_count, full.administrator_count, None)
            }
        };

        let target = member_count.saturating_sub(admin_count);
        let mut quota = target;
        let mut report = MemberPurgeReport::default();
        tracing::info!(
            chat_id = chat.id.0,
            members = member_count,
            admins = admin_count,
            "removing members"
        );
        if quota == 0 {
            return Ok(report);
        }

        let noun = if chat.category.is_channel() { "channel" } else { "group" };

        for _ in 0..self.limits.max_iterations {
            let page = match first_page.take() {
                Some(members) => members,
                None => self.members_page(chat).await?,
            };
            // Only admins are left.
            if page.len() == admin_count {
                report.terminal = TerminalReason::Stalled;
                return Ok(self.finish(chat, report));
            }

            let mut candidates = 0;
            for member in &page {
                if member.user_id == actor
                    || member.status.is_privileged()
                    || member.status == MemberStatus::Banned
                {
                    continue;
                }
                candidates += 1;

                match self.evict(chat, member.user_id).await {
                    Ok(()) => {
                        quota -= 1;
                        report.removed += 1;
                        if self.limits.progress_every > 0
                            && report.removed % self.limits.progress_every == 0
                        {
                            let text = format!("Removing {noun} members... {quota}/{target}");
                            tell(self.notifier.as_ref(), &text).await;
                        }
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            chat_id = chat.id.0,
                            user_id = member.user_id.0,
                            error = %e,
                            "member removal failed"
                        );
                    }
                }

                if quota == 0 {
                    report.terminal = TerminalReason::QuotaReached;
                    return Ok(self.finish(chat, report));
                }
                tokio::time::sleep(self.limits.removal_delay).await;
            }

            // Members whose removal failed are still listed and get retried.
            if candidates == 0 {
                report.terminal = TerminalReason::Stalled;
                return Ok(self.finish(chat, report));
            }
        }

        tracing::warn!(chat_id = chat.id.0, "member removal hit iteration cap");
        report.terminal = TerminalReason::IterationCap;
        Ok(self.finish(chat, report))
    }

    async fn members_page(&self, chat: &ChatInfo) -> Result<Vec<MembershipRecord>> {
        match chat.category {
            ChatCategory::BasicGroup { basic_group_id } => Ok(self
                .remote
                .fetch_basic_group_full_info(basic_group_id)
                .await?
                .members),
            ChatCategory::Supergroup { supergroup_id, .. } => Ok(self
                .remote
                .fetch_members_page(
                    supergroup_id,
                    MembersFilter::Recent,
                    0,
                    self.limits.member_page_size,
                )
                .await?
                .members),
            ChatCategory::Private { .. } => Ok(Vec::new()),
        }
    }

    async fn evict(&self, chat: &ChatInfo, user: UserId) -> Result<()> {
        let until_date = Utc::now().timestamp() + self.limits.ban_duration.as_secs() as i64;
        self.remote
            .set_member_status(chat.id, user, ChatMemberStatus::Banned { until_date })
            .await
    }

    fn finish(&self, chat: &ChatInfo, report: MemberPurgeReport) -> MemberPurgeReport {
        tracing::info!(
            chat_id = chat.id.0,
            removed = report.removed,
            failed = report.failed,
            terminal = ?report.terminal,
            "member removal finished"
        );
        report
    }
}
