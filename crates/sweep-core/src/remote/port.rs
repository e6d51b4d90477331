use async_trait::async_trait;

use crate::{
    domain::{BasicGroupId, ChatId, MessageId, SupergroupId, UserId},
    remote::types::{
        BasicGroupFullInfo, ChatMemberStatus, ChatSummary, FormattedText, MembersFilter,
        MembersPage, MessagePage, SupergroupFullInfo, UserProfile,
    },
    Result,
};

/// Port for the remote chat backend.
///
/// Every method is one remote call and one suspend point. Implementations
/// return `Error::Backend` for any failed call.
#[async_trait]
pub trait RemoteChatService: Send + Sync {
    async fn fetch_membership_status(&self, chat: ChatId, user: UserId)
        -> Result<ChatMemberStatus>;

    async fn fetch_chat_summary(&self, chat: ChatId) -> Result<ChatSummary>;

    async fn search_messages_by_sender(
        &self,
        chat: ChatId,
        sender: UserId,
        offset: usize,
        limit: usize,
    ) -> Result<MessagePage>;

    /// Ids that do not exist are ignored by the backend.
    async fn delete_messages(&self, chat: ChatId, ids: &[MessageId], revoke: bool) -> Result<()>;

    async fn set_member_status(
        &self,
        chat: ChatId,
        user: UserId,
        status: ChatMemberStatus,
    ) -> Result<()>;

    async fn fetch_members_page(
        &self,
        group: SupergroupId,
        filter: MembersFilter,
        offset: usize,
        limit: usize,
    ) -> Result<MembersPage>;

    async fn fetch_administrators(&self, chat: ChatId) -> Result<Vec<UserId>>;

    async fn fetch_basic_group_full_info(&self, group: BasicGroupId)
        -> Result<BasicGroupFullInfo>;

    async fn fetch_supergroup_full_info(&self, group: SupergroupId)
        -> Result<SupergroupFullInfo>;

    /// Resolve the chat hosting a basic group.
    async fn open_basic_group_chat(&self, group: BasicGroupId) -> Result<ChatId>;

    async fn fetch_user(&self, user: UserId) -> Result<UserProfile>;

    async fn fetch_me(&self) -> Result<UserId>;

    async fn submit_message(
        &self,
        chat: ChatId,
        text: FormattedText,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId>;

    async fn leave_chat(&self, chat: ChatId) -> Result<()>;

    async fn delete_chat_history(&self, chat: ChatId, remove_from_chat_list: bool) -> Result<()>;
}
