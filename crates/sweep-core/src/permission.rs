use std::sync::Arc;

use crate::{
    domain::{ChatId, PrivilegeLevel, UserId},
    remote::{port::RemoteChatService, types::ChatMemberStatus},
    Result,
};

/// Classifies the acting user's privilege in a chat with one membership query.
#[derive(Clone)]
pub struct PermissionResolver {
    remote: Arc<dyn RemoteChatService>,
}

impl PermissionResolver {
    pub fn new(remote: Arc<dyn RemoteChatService>) -> Self {
        Self { remote }
    }

    pub async fn resolve(&self, chat: ChatId, user: UserId) -> Result<PrivilegeLevel> {
        let status = self.remote.fetch_membership_status(chat, user).await?;
        Ok(privilege_from_status(status))
    }

    /// Like `resolve`, but an unresolved permission counts as `None`.
    pub async fn resolve_or_none(&self, chat: ChatId, user: UserId) -> PrivilegeLevel {
        match self.resolve(chat, user).await {
            Ok(level) => level,
            Err(e) => {
                tracing::warn!(chat_id = chat.0, user_id = user.0, error = %e, "permission lookup failed");
                PrivilegeLevel::None
            }
        }
    }
}

pub fn privilege_from_status(status: ChatMemberStatus) -> PrivilegeLevel {
    match status {
        ChatMemberStatus::Creator { .. } => PrivilegeLevel::Creator,
        ChatMemberStatus::Administrator {
            can_delete_messages,
            can_restrict_members,
        } => PrivilegeLevel::Admin {
            can_delete_messages,
            can_restrict_members,
        },
        ChatMemberStatus::Member
        | ChatMemberStatus::Restricted
        | ChatMemberStatus::Left
        | ChatMemberStatus::Banned { .. } => PrivilegeLevel::Member,
    }
}
