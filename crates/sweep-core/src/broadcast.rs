use std::sync::Arc;

use crate::{
    config::BroadcastLimits,
    domain::{ChatCategory, ChatInfo, MemberStatus, MessageId, PrivilegeLevel, UserId},
    formatting::MentionList,
    remote::{port::RemoteChatService, types::MembersFilter},
    Error, Result,
};

pub const ADMINS_ONLY_EVERYONE: &str = "Only group admin can @everyone!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastMode {
    Admins,
    Everyone,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub mentioned: usize,
    /// `None` when there was nobody to mention and nothing was sent.
    pub message: Option<MessageId>,
}

/// Mentions a bounded list of users in one message.
#[derive(Clone)]
pub struct BroadcastComposer {
    remote: Arc<dyn RemoteChatService>,
    limits: BroadcastLimits,
}

impl BroadcastComposer {
    pub fn new(remote: Arc<dyn RemoteChatService>, limits: BroadcastLimits) -> Self {
        Self { remote, limits }
    }

    pub async fn compose(
        &self,
        chat: &ChatInfo,
        mode: BroadcastMode,
        reply_to: Option<MessageId>,
        privilege: PrivilegeLevel,
    ) -> Result<BroadcastReport> {
        let users = match mode {
            BroadcastMode::Admins => self.remote.fetch_administrators(chat.id).await?,
            BroadcastMode::Everyone => {
                if !privilege.is_admin() {
                    return Err(Error::PermissionDenied(ADMINS_ONLY_EVERYONE.to_string()));
                }
                self.everyone(chat).await?
            }
        };

        let mut list = MentionList::new();
        for user in users {
            let profile = self.remote.fetch_user(user).await?;
            list.push(&profile);
        }

        let mentioned = list.len();
        if list.is_empty() {
            tracing::info!(chat_id = chat.id.0, ?mode, "nobody to mention");
            return Ok(BroadcastReport::default());
        }

        let message = self
            .remote
            .submit_message(chat.id, list.finish(), reply_to)
            .await?;
        tracing::info!(chat_id = chat.id.0, ?mode, mentioned, "mention list sent");
        Ok(BroadcastReport {
            mentioned,
            message: Some(message),
        })
    }

    /// Members to mention, failing before any submission if the chat is over
    /// the cap for its category.
    async fn everyone(&self, chat: &ChatInfo) -> Result<Vec<UserId>> {
        let members = match chat.category {
            ChatCategory::Private { .. } => {
                return Err(Error::UnsupportedChat(
                    "Mentions are only available in groups".to_string(),
                ))
            }
            ChatCategory::BasicGroup { basic_group_id } => {
                let limit = self.limits.basic_group_cap;
                let members = self
                    .remote
                    .fetch_basic_group_full_info(basic_group_id)
                    .await?
                    .members;
                if members.len() > limit {
                    return Err(Error::TooManyMembers {
                        count: members.len(),
                        limit,
                    });
                }
                members
            }
            ChatCategory::Supergroup { supergroup_id, .. } => {
                let limit = self.limits.supergroup_cap;
                // One extra to detect overflow.
                let page = self
                    .remote
                    .fetch_members_page(supergroup_id, MembersFilter::Recent, 0, limit + 1)
                    .await?;
                if page.members.len() > limit {
                    return Err(Error::TooManyMembers {
                        count: page.total_count.max(page.members.len()),
                        limit,
                    });
                }
                page.members
            }
        };

        Ok(members
            .into_iter()
            .filter(|m| m.status != MemberStatus::Banned)
            .map(|m| m.user_id)
            .collect())
    }
}
