use crate::domain::{
    BasicGroupId, ChatId, MemberStatus, MembershipRecord, MessageId, SupergroupId, UserId,
};

/// Full membership status as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatMemberStatus {
    Creator {
        is_member: bool,
    },
    Administrator {
        can_delete_messages: bool,
        can_restrict_members: bool,
    },
    Member,
    Restricted,
    Left,
    Banned {
        /// Unix seconds; 0 means forever.
        until_date: i64,
    },
}

impl ChatMemberStatus {
    pub fn coarse(self) -> MemberStatus {
        match self {
            ChatMemberStatus::Creator { .. } => MemberStatus::Creator,
            ChatMemberStatus::Administrator { .. } => MemberStatus::Admin,
            ChatMemberStatus::Banned { .. } => MemberStatus::Banned,
            ChatMemberStatus::Member | ChatMemberStatus::Restricted | ChatMemberStatus::Left => {
                MemberStatus::Member
            }
        }
    }
}

/// Chat type as reported by the backend (before ancestry is resolved).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private {
        user_id: UserId,
    },
    BasicGroup {
        basic_group_id: BasicGroupId,
    },
    Supergroup {
        supergroup_id: SupergroupId,
        is_channel: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastMessage {
    pub id: MessageId,
    /// `None` for messages not authored by a user (e.g. channel posts).
    pub sender: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: ChatId,
    pub title: String,
    pub kind: ChatKind,
    pub last_message: Option<LastMessage>,
}

/// Content class of a found message; only the membership-change kinds matter here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Regular,
    ChatAddMembers,
    ChatJoinByLink,
    ChatDeleteMember,
}

impl MessageKind {
    pub fn is_membership_change(self) -> bool {
        !matches!(self, MessageKind::Regular)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoundMessage {
    pub id: MessageId,
    pub kind: MessageKind,
}

/// One page of a sender search. `total_count` counts every match, not just this page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub total_count: usize,
    pub messages: Vec<FoundMessage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembersFilter {
    Recent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembersPage {
    pub total_count: usize,
    pub members: Vec<MembershipRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BasicGroupFullInfo {
    pub members: Vec<MembershipRecord>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupergroupFullInfo {
    pub member_count: usize,
    pub administrator_count: usize,
    pub upgraded_from: Option<BasicGroupId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserKind {
    Regular,
    Bot,
    Deleted,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub kind: UserKind,
}

/// A mention entity; offsets and lengths are in UTF-16 code units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextEntity {
    pub offset: usize,
    pub length: usize,
    pub mention: UserId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormattedText {
    pub text: String,
    pub entities: Vec<TextEntity>,
}

impl FormattedText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
