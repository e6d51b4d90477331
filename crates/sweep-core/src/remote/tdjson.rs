//! `'@type'`-tagged JSON codec for the remote chat backend.
//!
//! Requests are serde internally-tagged enums; responses are decoded into
//! closed enums and mapped onto the typed port. Both the legacy flat field
//! layout (`user_id`, `sender_user_id`, flat admin rights) and the newer nested
//! one (`member_id`, `sender_id`, `rights`) are accepted.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{BasicGroupId, ChatId, MembershipRecord, MessageId, SupergroupId, UserId},
    remote::{
        port::RemoteChatService,
        types::{
            BasicGroupFullInfo, ChatKind, ChatMemberStatus, ChatSummary, FormattedText,
            FoundMessage, LastMessage, MembersFilter, MembersPage, MessageKind, MessagePage,
            SupergroupFullInfo, UserKind, UserProfile,
        },
    },
    Error, Result,
};

/// Opaque asynchronous channel carrying one JSON request and its JSON response.
#[async_trait]
pub trait JsonTransport: Send + Sync {
    async fn send(&self, payload: Value) -> Result<Value>;
}

#[async_trait]
impl<T: JsonTransport + ?Sized> JsonTransport for Arc<T> {
    async fn send(&self, payload: Value) -> Result<Value> {
        (**self).send(payload).await
    }
}

// === Requests ===

#[derive(Debug, Serialize)]
#[serde(tag = "@type", rename_all = "camelCase")]
enum Request {
    GetChatMember {
        chat_id: i64,
        user_id: i64,
    },
    GetChat {
        chat_id: i64,
    },
    SearchChatMessages {
        chat_id: i64,
        query: &'static str,
        sender_user_id: i64,
        from_message_id: i64,
        offset: usize,
        limit: usize,
        filter: Option<()>,
    },
    DeleteMessages {
        chat_id: i64,
        message_ids: Vec<i64>,
        revoke: bool,
    },
    SetChatMemberStatus {
        chat_id: i64,
        user_id: i64,
        status: WireMemberStatus,
    },
    GetSupergroupMembers {
        supergroup_id: i64,
        filter: WireMembersFilter,
        offset: usize,
        limit: usize,
    },
    GetChatAdministrators {
        chat_id: i64,
    },
    GetBasicGroupFullInfo {
        basic_group_id: i64,
    },
    GetSupergroupFullInfo {
        supergroup_id: i64,
    },
    CreateBasicGroupChat {
        basic_group_id: i64,
        force: bool,
    },
    GetUser {
        user_id: i64,
    },
    GetMe,
    SendMessage {
        chat_id: i64,
        reply_to_message_id: i64,
        input_message_content: WireInputContent,
    },
    LeaveChat {
        chat_id: i64,
    },
    DeleteChatHistory {
        chat_id: i64,
        remove_from_chat_list: bool,
        revoke: bool,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "@type", rename_all = "camelCase")]
enum WireMembersFilter {
    SupergroupMembersFilterRecent,
}

#[derive(Debug, Serialize)]
#[serde(tag = "@type", rename_all = "camelCase")]
enum WireInputContent {
    InputMessageText {
        text: WireFormattedText,
        disable_web_page_preview: bool,
        clear_draft: bool,
    },
}

#[derive(Debug, Serialize)]
struct WireFormattedText {
    #[serde(rename = "@type")]
    tag: &'static str,
    text: String,
    entities: Vec<WireTextEntity>,
}

#[derive(Debug, Serialize)]
struct WireTextEntity {
    #[serde(rename = "@type")]
    tag: &'static str,
    offset: usize,
    length: usize,
    #[serde(rename = "type")]
    kind: WireEntityType,
}

#[derive(Debug, Serialize)]
#[serde(tag = "@type", rename_all = "camelCase")]
enum WireEntityType {
    TextEntityTypeMentionName { user_id: i64 },
}

impl From<FormattedText> for WireFormattedText {
    fn from(t: FormattedText) -> Self {
        Self {
            tag: "formattedText",
            text: t.text,
            entities: t
                .entities
                .into_iter()
                .map(|e| WireTextEntity {
                    tag: "textEntity",
                    offset: e.offset,
                    length: e.length,
                    kind: WireEntityType::TextEntityTypeMentionName {
                        user_id: e.mention.0,
                    },
                })
                .collect(),
        }
    }
}

// === Shared wire enums ===

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
struct WireAdminRights {
    #[serde(default)]
    can_delete_messages: bool,
    #[serde(default)]
    can_restrict_members: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "@type")]
enum WireMemberStatus {
    #[serde(rename = "chatMemberStatusCreator")]
    Creator {
        #[serde(default)]
        is_member: bool,
    },
    #[serde(rename = "chatMemberStatusAdministrator")]
    Administrator {
        #[serde(default)]
        can_delete_messages: bool,
        #[serde(default)]
        can_restrict_members: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rights: Option<WireAdminRights>,
    },
    #[serde(rename = "chatMemberStatusMember")]
    Member {},
    #[serde(rename = "chatMemberStatusRestricted")]
    Restricted {},
    #[serde(rename = "chatMemberStatusLeft")]
    Left {},
    #[serde(rename = "chatMemberStatusBanned")]
    Banned {
        #[serde(default)]
        banned_until_date: i64,
    },
}

impl From<WireMemberStatus> for ChatMemberStatus {
    fn from(w: WireMemberStatus) -> Self {
        match w {
            WireMemberStatus::Creator { is_member } => ChatMemberStatus::Creator { is_member },
            WireMemberStatus::Administrator {
                can_delete_messages,
                can_restrict_members,
                rights,
            } => {
                let rights = rights.unwrap_or_default();
                ChatMemberStatus::Administrator {
                    can_delete_messages: can_delete_messages || rights.can_delete_messages,
                    can_restrict_members: can_restrict_members || rights.can_restrict_members,
                }
            }
            WireMemberStatus::Member {} => ChatMemberStatus::Member,
            WireMemberStatus::Restricted {} => ChatMemberStatus::Restricted,
            WireMemberStatus::Left {} => ChatMemberStatus::Left,
            WireMemberStatus::Banned { banned_until_date } => ChatMemberStatus::Banned {
                until_date: banned_until_date,
            },
        }
    }
}

impl From<ChatMemberStatus> for WireMemberStatus {
    fn from(s: ChatMemberStatus) -> Self {
        match s {
            ChatMemberStatus::Creator { is_member } => WireMemberStatus::Creator { is_member },
            ChatMemberStatus::Administrator {
                can_delete_messages,
                can_restrict_members,
            } => WireMemberStatus::Administrator {
                can_delete_messages,
                can_restrict_members,
                rights: None,
            },
            ChatMemberStatus::Member => WireMemberStatus::Member {},
            ChatMemberStatus::Restricted => WireMemberStatus::Restricted {},
            ChatMemberStatus::Left => WireMemberStatus::Left {},
            ChatMemberStatus::Banned { until_date } => WireMemberStatus::Banned {
                banned_until_date: until_date,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "@type")]
enum WireSender {
    #[serde(rename = "messageSenderUser")]
    User { user_id: i64 },
    #[serde(other)]
    Other,
}

fn pick_user(legacy: i64, nested: Option<&WireSender>) -> Option<UserId> {
    if legacy != 0 {
        return Some(UserId(legacy));
    }
    match nested {
        Some(WireSender::User { user_id }) => Some(UserId(*user_id)),
        Some(WireSender::Other) | None => None,
    }
}

// === Responses ===

#[derive(Debug, Deserialize)]
struct WireChatMember {
    #[serde(default)]
    user_id: i64,
    #[serde(default)]
    member_id: Option<WireSender>,
    status: WireMemberStatus,
}

impl WireChatMember {
    fn into_record(self) -> Option<MembershipRecord> {
        let user_id = pick_user(self.user_id, self.member_id.as_ref())?;
        let status: ChatMemberStatus = self.status.into();
        Some(MembershipRecord {
            user_id,
            status: status.coarse(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "@type")]
enum WireContent {
    #[serde(rename = "messageChatAddMembers")]
    ChatAddMembers {},
    #[serde(rename = "messageChatJoinByLink")]
    ChatJoinByLink {},
    #[serde(rename = "messageChatDeleteMember")]
    ChatDeleteMember {},
    #[default]
    #[serde(other)]
    Other,
}

impl From<WireContent> for MessageKind {
    fn from(c: WireContent) -> Self {
        match c {
            WireContent::ChatAddMembers {} => MessageKind::ChatAddMembers,
            WireContent::ChatJoinByLink {} => MessageKind::ChatJoinByLink,
            WireContent::ChatDeleteMember {} => MessageKind::ChatDeleteMember,
            WireContent::Other => MessageKind::Regular,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: i64,
    #[serde(default)]
    sender_user_id: i64,
    #[serde(default)]
    sender_id: Option<WireSender>,
    #[serde(default)]
    content: WireContent,
}

#[derive(Debug, Deserialize)]
struct WireMessages {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    messages: Vec<Option<WireMessage>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "@type")]
enum WireChatType {
    #[serde(rename = "chatTypePrivate")]
    Private { user_id: i64 },
    #[serde(rename = "chatTypeSecret")]
    Secret { user_id: i64 },
    #[serde(rename = "chatTypeBasicGroup")]
    BasicGroup { basic_group_id: i64 },
    #[serde(rename = "chatTypeSupergroup")]
    Supergroup {
        supergroup_id: i64,
        #[serde(default)]
        is_channel: bool,
    },
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(rename = "type")]
    kind: WireChatType,
    #[serde(default)]
    last_message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireChatMembers {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    members: Vec<WireChatMember>,
}

#[derive(Debug, Deserialize)]
struct WireAdministrator {
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct WireAdministrators {
    #[serde(default)]
    administrators: Vec<WireAdministrator>,
    #[serde(default)]
    user_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct WireBasicGroupFullInfo {
    #[serde(default)]
    members: Vec<WireChatMember>,
}

#[derive(Debug, Deserialize)]
struct WireSupergroupFullInfo {
    #[serde(default)]
    member_count: usize,
    #[serde(default)]
    administrator_count: usize,
    #[serde(default)]
    upgraded_from_basic_group_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "@type")]
enum WireUserType {
    #[serde(rename = "userTypeRegular")]
    Regular {},
    #[serde(rename = "userTypeBot")]
    Bot {},
    #[serde(rename = "userTypeDeleted")]
    Deleted {},
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct WireUsernames {
    #[serde(default)]
    active_usernames: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: i64,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    usernames: Option<WireUsernames>,
    #[serde(rename = "type", default)]
    kind: WireUserType,
}

#[derive(Debug, Deserialize)]
struct WireSentMessage {
    id: i64,
}

fn backend_error(resp: &Value) -> Option<Error> {
    if resp.get("@type").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let code = resp.get("code").and_then(Value::as_i64).unwrap_or(0) as i32;
    let message = resp
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Some(Error::Backend { code, message })
}

// === Port implementation ===

/// `RemoteChatService` over any `JsonTransport`.
pub struct TdJsonRemote<T> {
    transport: T,
}

impl<T: JsonTransport> TdJsonRemote<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn exchange(&self, req: Request) -> Result<Value> {
        let payload = serde_json::to_value(&req)?;
        let resp = self.transport.send(payload).await?;
        match backend_error(&resp) {
            Some(err) => Err(err),
            None => Ok(resp),
        }
    }

    async fn call<R: DeserializeOwned>(&self, req: Request) -> Result<R> {
        let resp = self.exchange(req).await?;
        Ok(serde_json::from_value(resp)?)
    }

    async fn call_ok(&self, req: Request) -> Result<()> {
        self.exchange(req).await.map(|_| ())
    }
}

#[async_trait]
impl<T: JsonTransport> RemoteChatService for TdJsonRemote<T> {
    async fn fetch_membership_status(
        &self,
        chat: ChatId,
        user: UserId,
    ) -> Result<ChatMemberStatus> {
        let member: WireChatMember = self
            .call(Request::GetChatMember {
                chat_id: chat.0,
                user_id: user.0,
            })
            .await?;
        Ok(member.status.into())
    }

    async fn fetch_chat_summary(&self, chat: ChatId) -> Result<ChatSummary> {
        let wire: WireChat = self.call(Request::GetChat { chat_id: chat.0 }).await?;
        let kind = match wire.kind {
            WireChatType::Private { user_id } | WireChatType::Secret { user_id } => {
                ChatKind::Private {
                    user_id: UserId(user_id),
                }
            }
            WireChatType::BasicGroup { basic_group_id } => ChatKind::BasicGroup {
                basic_group_id: BasicGroupId(basic_group_id),
            },
            WireChatType::Supergroup {
                supergroup_id,
                is_channel,
            } => ChatKind::Supergroup {
                supergroup_id: SupergroupId(supergroup_id),
                is_channel,
            },
        };
        let last_message = wire.last_message.map(|m| LastMessage {
            id: MessageId(m.id),
            sender: pick_user(m.sender_user_id, m.sender_id.as_ref()),
        });
        Ok(ChatSummary {
            id: ChatId(wire.id),
            title: wire.title,
            kind,
            last_message,
        })
    }

    async fn search_messages_by_sender(
        &self,
        chat: ChatId,
        sender: UserId,
        offset: usize,
        limit: usize,
    ) -> Result<MessagePage> {
        let wire: WireMessages = self
            .call(Request::SearchChatMessages {
                chat_id: chat.0,
                query: "",
                sender_user_id: sender.0,
                from_message_id: 0,
                offset,
                limit,
                filter: None,
            })
            .await?;
        Ok(MessagePage {
            total_count: wire.total_count,
            messages: wire
                .messages
                .into_iter()
                .flatten()
                .map(|m| FoundMessage {
                    id: MessageId(m.id),
                    kind: m.content.into(),
                })
                .collect(),
        })
    }

    async fn delete_messages(&self, chat: ChatId, ids: &[MessageId], revoke: bool) -> Result<()> {
        self.call_ok(Request::DeleteMessages {
            chat_id: chat.0,
            message_ids: ids.iter().map(|id| id.0).collect(),
            revoke,
        })
        .await
    }

    async fn set_member_status(
        &self,
        chat: ChatId,
        user: UserId,
        status: ChatMemberStatus,
    ) -> Result<()> {
        self.call_ok(Request::SetChatMemberStatus {
            chat_id: chat.0,
            user_id: user.0,
            status: status.into(),
        })
        .await
    }

    async fn fetch_members_page(
        &self,
        group: SupergroupId,
        filter: MembersFilter,
        offset: usize,
        limit: usize,
    ) -> Result<MembersPage> {
        let filter = match filter {
            MembersFilter::Recent => WireMembersFilter::SupergroupMembersFilterRecent,
        };
        let wire: WireChatMembers = self
            .call(Request::GetSupergroupMembers {
                supergroup_id: group.0,
                filter,
                offset,
                limit,
            })
            .await?;
        Ok(MembersPage {
            total_count: wire.total_count,
            members: wire
                .members
                .into_iter()
                .filter_map(WireChatMember::into_record)
                .collect(),
        })
    }

    async fn fetch_administrators(&self, chat: ChatId) -> Result<Vec<UserId>> {
        let wire: WireAdministrators = self
            .call(Request::GetChatAdministrators { chat_id: chat.0 })
            .await?;
        let ids = if wire.administrators.is_empty() {
            wire.user_ids.into_iter().map(UserId).collect()
        } else {
            wire.administrators
                .into_iter()
                .map(|a| UserId(a.user_id))
                .collect()
        };
        Ok(ids)
    }

    async fn fetch_basic_group_full_info(
        &self,
        group: BasicGroupId,
    ) -> Result<BasicGroupFullInfo> {
        let wire: WireBasicGroupFullInfo = self
            .call(Request::GetBasicGroupFullInfo {
                basic_group_id: group.0,
            })
            .await?;
        Ok(BasicGroupFullInfo {
            members: wire
                .members
                .into_iter()
                .filter_map(WireChatMember::into_record)
                .collect(),
        })
    }

    async fn fetch_supergroup_full_info(
        &self,
        group: SupergroupId,
    ) -> Result<SupergroupFullInfo> {
        let wire: WireSupergroupFullInfo = self
            .call(Request::GetSupergroupFullInfo {
                supergroup_id: group.0,
            })
            .await?;
        Ok(SupergroupFullInfo {
            member_count: wire.member_count,
            administrator_count: wire.administrator_count,
            upgraded_from: (wire.upgraded_from_basic_group_id != 0)
                .then_some(BasicGroupId(wire.upgraded_from_basic_group_id)),
        })
    }

    async fn open_basic_group_chat(&self, group: BasicGroupId) -> Result<ChatId> {
        let wire: WireChat = self
            .call(Request::CreateBasicGroupChat {
                basic_group_id: group.0,
                force: false,
            })
            .await?;
        Ok(ChatId(wire.id))
    }

    async fn fetch_user(&self, user: UserId) -> Result<UserProfile> {
        let wire: WireUser = self.call(Request::GetUser { user_id: user.0 }).await?;
        let username = Some(wire.username)
            .filter(|u| !u.is_empty())
            .or_else(|| {
                wire.usernames
                    .and_then(|u| u.active_usernames.into_iter().next())
            });
        let kind = match wire.kind {
            WireUserType::Regular {} => UserKind::Regular,
            WireUserType::Bot {} => UserKind::Bot,
            WireUserType::Deleted {} => UserKind::Deleted,
            WireUserType::Unknown => UserKind::Unknown,
        };
        Ok(UserProfile {
            id: UserId(wire.id),
            first_name: wire.first_name,
            last_name: wire.last_name,
            username,
            kind,
        })
    }

    async fn fetch_me(&self) -> Result<UserId> {
        let wire: WireUser = self.call(Request::GetMe).await?;
        Ok(UserId(wire.id))
    }

    async fn submit_message(
        &self,
        chat: ChatId,
        text: FormattedText,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId> {
        let wire: WireSentMessage = self
            .call(Request::SendMessage {
                chat_id: chat.0,
                reply_to_message_id: reply_to.map(|m| m.0).unwrap_or(0),
                input_message_content: WireInputContent::InputMessageText {
                    text: text.into(),
                    disable_web_page_preview: false,
                    clear_draft: true,
                },
            })
            .await?;
        Ok(MessageId(wire.id))
    }

    async fn leave_chat(&self, chat: ChatId) -> Result<()> {
        self.call_ok(Request::LeaveChat { chat_id: chat.0 }).await
    }

    async fn delete_chat_history(&self, chat: ChatId, remove_from_chat_list: bool) -> Result<()> {
        self.call_ok(Request::DeleteChatHistory {
            chat_id: chat.0,
            remove_from_chat_list,
            revoke: false,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use serde_json::json;

    use super::*;
    use crate::{domain::MemberStatus, remote::types::TextEntity};

    /// Replays canned responses and records every payload sent.
    #[derive(Default)]
    struct ScriptedTransport {
        sent: Mutex<Vec<Value>>,
        replies: Mutex<VecDeque<Value>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl JsonTransport for ScriptedTransport {
        async fn send(&self, payload: Value) -> Result<Value> {
            self.sent.lock().unwrap().push(payload);
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| json!({"@type": "ok"})))
        }
    }

    #[tokio::test]
    async fn membership_status_decodes_flat_and_nested_admin_rights() {
        let transport = ScriptedTransport::replying(vec![
            json!({
                "@type": "chatMember",
                "user_id": 5,
                "status": {"@type": "chatMemberStatusAdministrator", "can_delete_messages": true}
            }),
            json!({
                "@type": "chatMember",
                "member_id": {"@type": "messageSenderUser", "user_id": 5},
                "status": {
                    "@type": "chatMemberStatusAdministrator",
                    "rights": {"@type": "chatAdministratorRights", "can_restrict_members": true}
                }
            }),
        ]);
        let remote = TdJsonRemote::new(transport.clone());

        let flat = remote
            .fetch_membership_status(ChatId(-100), UserId(5))
            .await
            .unwrap();
        assert_eq!(
            flat,
            ChatMemberStatus::Administrator {
                can_delete_messages: true,
                can_restrict_members: false
            }
        );

        let nested = remote
            .fetch_membership_status(ChatId(-100), UserId(5))
            .await
            .unwrap();
        assert_eq!(
            nested,
            ChatMemberStatus::Administrator {
                can_delete_messages: false,
                can_restrict_members: true
            }
        );

        let sent = transport.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            json!({"@type": "getChatMember", "chat_id": -100, "user_id": 5})
        );
    }

    #[tokio::test]
    async fn error_responses_become_backend_errors() {
        let transport = ScriptedTransport::replying(vec![json!({
            "@type": "error",
            "code": 400,
            "message": "CHAT_ADMIN_REQUIRED"
        })]);
        let remote = TdJsonRemote::new(transport.clone());

        let err = remote
            .delete_messages(ChatId(1), &[MessageId(2)], true)
            .await
            .unwrap_err();
        match err {
            Error::Backend { code, message } => {
                assert_eq!(code, 400);
                assert_eq!(message, "CHAT_ADMIN_REQUIRED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_request_and_membership_change_kinds() {
        let transport = ScriptedTransport::replying(vec![json!({
            "@type": "messages",
            "total_count": 3,
            "messages": [
                {"@type": "message", "id": 10, "sender_user_id": 9,
                 "content": {"@type": "messageText", "text": {}}},
                {"@type": "message", "id": 11, "sender_user_id": 9,
                 "content": {"@type": "messageChatJoinByLink"}},
                {"@type": "message", "id": 12, "sender_user_id": 9,
                 "content": {"@type": "messageChatAddMembers", "member_user_ids": [1, 2]}}
            ]
        })]);
        let remote = TdJsonRemote::new(transport.clone());

        let page = remote
            .search_messages_by_sender(ChatId(-5), UserId(9), 0, 100)
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        let kinds: Vec<_> = page.messages.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::Regular,
                MessageKind::ChatJoinByLink,
                MessageKind::ChatAddMembers
            ]
        );

        let sent = transport.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            json!({
                "@type": "searchChatMessages",
                "chat_id": -5,
                "query": "",
                "sender_user_id": 9,
                "from_message_id": 0,
                "offset": 0,
                "limit": 100,
                "filter": null
            })
        );
    }

    #[tokio::test]
    async fn temporary_ban_is_encoded_as_banned_status() {
        let transport = Arc::new(ScriptedTransport::default());
        let remote = TdJsonRemote::new(transport.clone());

        remote
            .set_member_status(
                ChatId(-7),
                UserId(3),
                ChatMemberStatus::Banned { until_date: 1_700_000_060 },
            )
            .await
            .unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            json!({
                "@type": "setChatMemberStatus",
                "chat_id": -7,
                "user_id": 3,
                "status": {"@type": "chatMemberStatusBanned", "banned_until_date": 1_700_000_060}
            })
        );
    }

    #[tokio::test]
    async fn chat_summary_with_supergroup_type_and_last_message() {
        let transport = ScriptedTransport::replying(vec![json!({
            "@type": "chat",
            "id": -1001,
            "title": "Ops",
            "type": {"@type": "chatTypeSupergroup", "supergroup_id": 77, "is_channel": true},
            "last_message": {"@type": "message", "id": 3_145_728,
                             "sender_id": {"@type": "messageSenderChat", "chat_id": -1001},
                             "content": {"@type": "messageText"}}
        })]);
        let remote = TdJsonRemote::new(transport.clone());

        let summary = remote.fetch_chat_summary(ChatId(-1001)).await.unwrap();
        assert_eq!(
            summary.kind,
            ChatKind::Supergroup {
                supergroup_id: SupergroupId(77),
                is_channel: true
            }
        );
        assert_eq!(
            summary.last_message,
            Some(LastMessage {
                id: MessageId(3_145_728),
                sender: None
            })
        );
    }

    #[tokio::test]
    async fn administrators_accept_both_response_shapes() {
        let transport = ScriptedTransport::replying(vec![
            json!({"@type": "chatAdministrators",
                   "administrators": [{"@type": "chatAdministrator", "user_id": 1, "is_owner": true},
                                      {"@type": "chatAdministrator", "user_id": 2}]}),
            json!({"@type": "users", "total_count": 2, "user_ids": [3, 4]}),
        ]);
        let remote = TdJsonRemote::new(transport.clone());

        let a = remote.fetch_administrators(ChatId(-1)).await.unwrap();
        let b = remote.fetch_administrators(ChatId(-1)).await.unwrap();
        assert_eq!(a, vec![UserId(1), UserId(2)]);
        assert_eq!(b, vec![UserId(3), UserId(4)]);
    }

    #[tokio::test]
    async fn members_page_maps_statuses() {
        let transport = ScriptedTransport::replying(vec![json!({
            "@type": "chatMembers",
            "total_count": 3,
            "members": [
                {"user_id": 1, "status": {"@type": "chatMemberStatusCreator", "is_member": true}},
                {"user_id": 2, "status": {"@type": "chatMemberStatusRestricted", "is_member": true}},
                {"member_id": {"@type": "messageSenderUser", "user_id": 3},
                 "status": {"@type": "chatMemberStatusMember"}}
            ]
        })]);
        let remote = TdJsonRemote::new(transport.clone());

        let page = remote
            .fetch_members_page(SupergroupId(9), MembersFilter::Recent, 0, 200)
            .await
            .unwrap();
        let statuses: Vec<_> = page.members.iter().map(|m| (m.user_id.0, m.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (1, MemberStatus::Creator),
                (2, MemberStatus::Member),
                (3, MemberStatus::Member)
            ]
        );

        let sent = transport.sent.lock().unwrap();
        assert_eq!(
            sent[0]["filter"],
            json!({"@type": "supergroupMembersFilterRecent"})
        );
    }

    #[tokio::test]
    async fn supergroup_full_info_zero_ancestor_is_none() {
        let transport = ScriptedTransport::replying(vec![
            json!({"@type": "supergroupFullInfo", "member_count": 10,
                   "administrator_count": 2, "upgraded_from_basic_group_id": 0}),
            json!({"@type": "supergroupFullInfo", "member_count": 10,
                   "administrator_count": 2, "upgraded_from_basic_group_id": 55}),
        ]);
        let remote = TdJsonRemote::new(transport.clone());

        let plain = remote
            .fetch_supergroup_full_info(SupergroupId(1))
            .await
            .unwrap();
        let migrated = remote
            .fetch_supergroup_full_info(SupergroupId(1))
            .await
            .unwrap();
        assert_eq!(plain.upgraded_from, None);
        assert_eq!(migrated.upgraded_from, Some(BasicGroupId(55)));
    }

    #[tokio::test]
    async fn send_message_carries_mention_entities() {
        let transport = ScriptedTransport::replying(vec![json!({"@type": "message", "id": 99})]);
        let remote = TdJsonRemote::new(transport.clone());

        let text = FormattedText {
            text: "Ann Lee\n".to_string(),
            entities: vec![TextEntity {
                offset: 0,
                length: 7,
                mention: UserId(4),
            }],
        };
        let id = remote
            .submit_message(ChatId(-3), text, Some(MessageId(12)))
            .await
            .unwrap();
        assert_eq!(id, MessageId(99));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            json!({
                "@type": "sendMessage",
                "chat_id": -3,
                "reply_to_message_id": 12,
                "input_message_content": {
                    "@type": "inputMessageText",
                    "text": {
                        "@type": "formattedText",
                        "text": "Ann Lee\n",
                        "entities": [{
                            "@type": "textEntity",
                            "offset": 0,
                            "length": 7,
                            "type": {"@type": "textEntityTypeMentionName", "user_id": 4}
                        }]
                    },
                    "disable_web_page_preview": false,
                    "clear_draft": true
                }
            })
        );
    }

    #[tokio::test]
    async fn user_profile_prefers_legacy_username_then_active_usernames() {
        let transport = ScriptedTransport::replying(vec![
            json!({"@type": "user", "id": 1, "first_name": "A", "last_name": "",
                   "username": "", "usernames": {"active_usernames": ["alpha"]},
                   "type": {"@type": "userTypeRegular"}}),
            json!({"@type": "user", "id": 2, "first_name": "B",
                   "type": {"@type": "userTypeBot", "can_join_groups": true}}),
        ]);
        let remote = TdJsonRemote::new(transport.clone());

        let a = remote.fetch_user(UserId(1)).await.unwrap();
        let b = remote.fetch_user(UserId(2)).await.unwrap();
        assert_eq!(a.username.as_deref(), Some("alpha"));
        assert_eq!(a.kind, UserKind::Regular);
        assert_eq!(b.username, None);
        assert_eq!(b.kind, UserKind::Bot);
    }
}
