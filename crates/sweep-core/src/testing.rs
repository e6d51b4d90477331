//! In-memory doubles for the remote backend and the notifier.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{
        BasicGroupId, ChatId, MemberStatus, MembershipRecord, MessageId, SupergroupId, UserId,
    },
    notify::{NoticeId, Notifier, NotifyOptions},
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

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Search {
        chat: ChatId,
        sender: UserId,
        offset: usize,
        limit: usize,
    },
    Delete {
        chat: ChatId,
        ids: Vec<MessageId>,
        revoke: bool,
    },
    SetStatus {
        chat: ChatId,
        user: UserId,
        status: ChatMemberStatus,
    },
    Submit {
        chat: ChatId,
        text: FormattedText,
        reply_to: Option<MessageId>,
    },
    DeleteHistory {
        chat: ChatId,
        remove_from_chat_list: bool,
    },
    Other(&'static str),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Search { .. } => "search_messages_by_sender",
            Call::Delete { .. } => "delete_messages",
            Call::SetStatus { .. } => "set_member_status",
            Call::Submit { .. } => "submit_message",
            Call::DeleteHistory { .. } => "delete_chat_history",
            Call::Other(name) => name,
        }
    }
}

#[derive(Clone, Copy)]
struct StoredMessage {
    id: MessageId,
    /// `None` for posts made on behalf of a chat.
    sender: Option<UserId>,
    kind: MessageKind,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    fail_next: HashMap<&'static str, usize>,
    refuse_ban: HashSet<UserId>,
    me: Option<UserId>,
    chats: HashMap<ChatId, (String, ChatKind)>,
    messages: HashMap<ChatId, Vec<StoredMessage>>,
    statuses: HashMap<(ChatId, UserId), ChatMemberStatus>,
    basic_members: HashMap<BasicGroupId, Vec<MembershipRecord>>,
    super_members: HashMap<SupergroupId, Vec<MembershipRecord>>,
    super_info: HashMap<SupergroupId, SupergroupFullInfo>,
    administrators: HashMap<ChatId, Vec<UserId>>,
    users: HashMap<UserId, UserProfile>,
    next_message: i64,
}

impl State {
    fn kind(&self, chat: ChatId) -> Result<ChatKind> {
        self.chats
            .get(&chat)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| Error::backend(400, "Chat not found"))
    }

    fn members_of(&self, chat: ChatId) -> Vec<MembershipRecord> {
        match self.chats.get(&chat).map(|(_, kind)| *kind) {
            Some(ChatKind::BasicGroup { basic_group_id }) => self
                .basic_members
                .get(&basic_group_id)
                .cloned()
                .unwrap_or_default(),
            Some(ChatKind::Supergroup { supergroup_id, .. }) => self
                .super_members
                .get(&supergroup_id)
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn evict(&mut self, chat: ChatId, user: UserId) {
        let list = match self.chats.get(&chat).map(|(_, kind)| *kind) {
            Some(ChatKind::BasicGroup { basic_group_id }) => {
                self.basic_members.get_mut(&basic_group_id)
            }
            Some(ChatKind::Supergroup { supergroup_id, .. }) => {
                self.super_members.get_mut(&supergroup_id)
            }
            _ => None,
        };
        if let Some(list) = list {
            list.retain(|m| m.user_id != user);
        }
    }
}

/// Scriptable `RemoteChatService` that records every call.
///
/// Message search and deletion, member enumeration and bans operate on an
/// in-memory model, so convergence loops observe their own effects.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

pub fn member(id: i64) -> MembershipRecord {
    MembershipRecord {
        user_id: UserId(id),
        status: MemberStatus::Member,
    }
}

pub fn admin(id: i64) -> MembershipRecord {
    MembershipRecord {
        user_id: UserId(id),
        status: MemberStatus::Admin,
    }
}

pub fn creator(id: i64) -> MembershipRecord {
    MembershipRecord {
        user_id: UserId(id),
        status: MemberStatus::Creator,
    }
}

impl FakeRemote {
    pub const ME: UserId = UserId(1);

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn enter(&self, call: Call) -> Result<()> {
        let mut s = self.state();
        let name = call.name();
        s.calls.push(call);
        if let Some(n) = s.fail_next.get_mut(name) {
            if *n > 0 {
                *n -= 1;
                return Err(Error::backend(500, format!("{name} failed")));
            }
        }
        Ok(())
    }

    // ---- scripting ----

    pub fn set_me(&self, me: UserId) {
        self.state().me = Some(me);
    }

    pub fn add_private(&self, chat: ChatId, user: UserId) {
        self.state().chats.insert(
            chat,
            ("private".to_string(), ChatKind::Private { user_id: user }),
        );
    }

    pub fn add_basic_group(&self, chat: ChatId, group: BasicGroupId, members: Vec<MembershipRecord>) {
        let mut s = self.state();
        s.chats.insert(
            chat,
            (
                "basic group".to_string(),
                ChatKind::BasicGroup {
                    basic_group_id: group,
                },
            ),
        );
        s.basic_members.insert(group, members);
    }

    pub fn add_supergroup(&self, chat: ChatId, group: SupergroupId, is_channel: bool) {
        self.state().chats.insert(
            chat,
            (
                "supergroup".to_string(),
                ChatKind::Supergroup {
                    supergroup_id: group,
                    is_channel,
                },
            ),
        );
    }

    pub fn set_supergroup_members(&self, group: SupergroupId, members: Vec<MembershipRecord>) {
        self.state().super_members.insert(group, members);
    }

    pub fn set_supergroup_info(&self, group: SupergroupId, info: SupergroupFullInfo) {
        self.state().super_info.insert(group, info);
    }

    pub fn set_status(&self, chat: ChatId, user: UserId, status: ChatMemberStatus) {
        self.state().statuses.insert((chat, user), status);
    }

    pub fn set_administrators(&self, chat: ChatId, admins: Vec<UserId>) {
        self.state().administrators.insert(chat, admins);
    }

    pub fn add_user(&self, profile: UserProfile) {
        self.state().users.insert(profile.id, profile);
    }

    pub fn add_message(&self, chat: ChatId, id: MessageId, sender: UserId, kind: MessageKind) {
        self.state()
            .messages
            .entry(chat)
            .or_default()
            .push(StoredMessage {
                id,
                sender: Some(sender),
                kind,
            });
    }

    /// Add `count` regular messages by `sender` after the current last message.
    pub fn add_messages(&self, chat: ChatId, sender: UserId, count: usize) {
        let mut s = self.state();
        let list = s.messages.entry(chat).or_default();
        let mut seq = list.iter().map(|m| m.id.sequence()).max().unwrap_or(0);
        for _ in 0..count {
            seq += 1;
            list.push(StoredMessage {
                id: MessageId::from_sequence(seq),
                sender: Some(sender),
                kind: MessageKind::Regular,
            });
        }
    }

    /// Add a message posted on behalf of a chat rather than a user.
    pub fn add_chat_post(&self, chat: ChatId) {
        let mut s = self.state();
        let list = s.messages.entry(chat).or_default();
        let seq = list.iter().map(|m| m.id.sequence()).max().unwrap_or(0) + 1;
        list.push(StoredMessage {
            id: MessageId::from_sequence(seq),
            sender: None,
            kind: MessageKind::Regular,
        });
    }

    pub fn fail_next(&self, method: &'static str) {
        *self.state().fail_next.entry(method).or_default() += 1;
    }

    pub fn refuse_ban(&self, user: UserId) {
        self.state().refuse_ban.insert(user);
    }

    // ---- inspection ----

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|c| c.name() == name).count()
    }

    pub fn deleted_batches(&self) -> Vec<Vec<MessageId>> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Delete { ids, .. } => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn status_changes(&self) -> Vec<(UserId, ChatMemberStatus)> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetStatus { user, status, .. } => Some((*user, *status)),
                _ => None,
            })
            .collect()
    }

    pub fn submissions(&self) -> Vec<FormattedText> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Submit { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn message_count(&self, chat: ChatId) -> usize {
        self.state().messages.get(&chat).map_or(0, Vec::len)
    }

    pub fn member_count(&self, chat: ChatId) -> usize {
        self.state().members_of(chat).len()
    }
}

#[async_trait]
impl RemoteChatService for FakeRemote {
    async fn fetch_membership_status(
        &self,
        chat: ChatId,
        user: UserId,
    ) -> Result<ChatMemberStatus> {
        self.enter(Call::Other("fetch_membership_status"))?;
        Ok(self
            .state()
            .statuses
            .get(&(chat, user))
            .copied()
            .unwrap_or(ChatMemberStatus::Member))
    }

    async fn fetch_chat_summary(&self, chat: ChatId) -> Result<ChatSummary> {
        self.enter(Call::Other("fetch_chat_summary"))?;
        let s = self.state();
        let (title, kind) = s
            .chats
            .get(&chat)
            .cloned()
            .ok_or_else(|| Error::backend(400, "Chat not found"))?;
        let last_message = s
            .messages
            .get(&chat)
            .and_then(|list| list.iter().max_by_key(|m| m.id))
            .map(|m| LastMessage {
                id: m.id,
                sender: m.sender,
            });
        Ok(ChatSummary {
            id: chat,
            title,
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
        self.enter(Call::Search {
            chat,
            sender,
            offset,
            limit,
        })?;
        let s = self.state();
        let mut matches: Vec<StoredMessage> = s
            .messages
            .get(&chat)
            .map(|list| list.iter().filter(|m| m.sender == Some(sender)).copied().collect())
            .unwrap_or_default();
        matches.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(MessagePage {
            total_count: matches.len(),
            messages: matches
                .iter()
                .skip(offset)
                .take(limit)
                .map(|m| FoundMessage {
                    id: m.id,
                    kind: m.kind,
                })
                .collect(),
        })
    }

    async fn delete_messages(&self, chat: ChatId, ids: &[MessageId], revoke: bool) -> Result<()> {
        self.enter(Call::Delete {
            chat,
            ids: ids.to_vec(),
            revoke,
        })?;
        let wanted: HashSet<MessageId> = ids.iter().copied().collect();
        if let Some(list) = self.state().messages.get_mut(&chat) {
            list.retain(|m| !wanted.contains(&m.id));
        }
        Ok(())
    }

    async fn set_member_status(
        &self,
        chat: ChatId,
        user: UserId,
        status: ChatMemberStatus,
    ) -> Result<()> {
        self.enter(Call::SetStatus { chat, user, status })?;
        let mut s = self.state();
        if let ChatMemberStatus::Banned { .. } = status {
            if s.refuse_ban.contains(&user) {
                return Err(Error::backend(400, "CHAT_ADMIN_REQUIRED"));
            }
            s.evict(chat, user);
        }
        s.statuses.insert((chat, user), status);
        Ok(())
    }

    async fn fetch_members_page(
        &self,
        group: SupergroupId,
        _filter: MembersFilter,
        offset: usize,
        limit: usize,
    ) -> Result<MembersPage> {
        self.enter(Call::Other("fetch_members_page"))?;
        let s = self.state();
        let all = s.super_members.get(&group).cloned().unwrap_or_default();
        Ok(MembersPage {
            total_count: all.len(),
            members: all.into_iter().skip(offset).take(limit).collect(),
        })
    }

    async fn fetch_administrators(&self, chat: ChatId) -> Result<Vec<UserId>> {
        self.enter(Call::Other("fetch_administrators"))?;
        let s = self.state();
        if let Some(admins) = s.administrators.get(&chat) {
            return Ok(admins.clone());
        }
        Ok(s.members_of(chat)
            .into_iter()
            .filter(|m| m.status.is_privileged())
            .map(|m| m.user_id)
            .collect())
    }

    async fn fetch_basic_group_full_info(
        &self,
        group: BasicGroupId,
    ) -> Result<BasicGroupFullInfo> {
        self.enter(Call::Other("fetch_basic_group_full_info"))?;
        let s = self.state();
        let members = s
            .basic_members
            .get(&group)
            .cloned()
            .ok_or_else(|| Error::backend(400, "Basic group not found"))?;
        Ok(BasicGroupFullInfo { members })
    }

    async fn fetch_supergroup_full_info(
        &self,
        group: SupergroupId,
    ) -> Result<SupergroupFullInfo> {
        self.enter(Call::Other("fetch_supergroup_full_info"))?;
        let s = self.state();
        if let Some(info) = s.super_info.get(&group) {
            return Ok(*info);
        }
        let members = s.super_members.get(&group).cloned().unwrap_or_default();
        Ok(SupergroupFullInfo {
            member_count: members.len(),
            administrator_count: members.iter().filter(|m| m.status.is_privileged()).count(),
            upgraded_from: None,
        })
    }

    async fn open_basic_group_chat(&self, group: BasicGroupId) -> Result<ChatId> {
        self.enter(Call::Other("open_basic_group_chat"))?;
        let s = self.state();
        s.chats
            .iter()
            .find(|(_, (_, kind))| {
                matches!(kind, ChatKind::BasicGroup { basic_group_id } if *basic_group_id == group)
            })
            .map(|(id, _)| *id)
            .ok_or_else(|| Error::backend(400, "Basic group not found"))
    }

    async fn fetch_user(&self, user: UserId) -> Result<UserProfile> {
        self.enter(Call::Other("fetch_user"))?;
        Ok(self
            .state()
            .users
            .get(&user)
            .cloned()
            .unwrap_or_else(|| UserProfile {
                id: user,
                first_name: format!("User{}", user.0),
                last_name: String::new(),
                username: None,
                kind: UserKind::Regular,
            }))
    }

    async fn fetch_me(&self) -> Result<UserId> {
        self.enter(Call::Other("fetch_me"))?;
        Ok(self.state().me.unwrap_or(Self::ME))
    }

    async fn submit_message(
        &self,
        chat: ChatId,
        text: FormattedText,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId> {
        self.enter(Call::Submit {
            chat,
            text,
            reply_to,
        })?;
        let mut s = self.state();
        s.kind(chat)?;
        s.next_message += 1;
        Ok(MessageId::from_sequence(10_000 + s.next_message))
    }

    async fn leave_chat(&self, chat: ChatId) -> Result<()> {
        self.enter(Call::Other("leave_chat"))?;
        self.state().kind(chat)?;
        Ok(())
    }

    async fn delete_chat_history(&self, chat: ChatId, remove_from_chat_list: bool) -> Result<()> {
        self.enter(Call::DeleteHistory {
            chat,
            remove_from_chat_list,
        })?;
        self.state().messages.remove(&chat);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub text: String,
    pub opts: NotifyOptions,
}

/// Notifier that keeps every notice and dismissal in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    dismissed: Mutex<Vec<NoticeId>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.text).collect()
    }

    pub fn dismissed(&self) -> Vec<NoticeId> {
        self.dismissed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str, opts: NotifyOptions) -> Result<NoticeId> {
        let mut notices = self.notices.lock().unwrap();
        let id = NoticeId(notices.len() as i64 + 1);
        notices.push(Notice {
            id,
            text: text.to_string(),
            opts,
        });
        Ok(id)
    }

    async fn dismiss(&self, id: NoticeId) -> Result<()> {
        self.dismissed.lock().unwrap().push(id);
        Ok(())
    }
}
