use std::fmt;

/// Backend user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Backend chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// Backend message id.
///
/// In supergroups ids are `sequence * MessageId::QUANTUM`, so consecutive
/// messages are `QUANTUM` apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i64);

/// Id of a small-scale group, distinct from the id of the chat that hosts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BasicGroupId(pub i64);

/// Id of a large-scale group or channel, distinct from its chat id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SupergroupId(pub i64);

impl MessageId {
    /// Spacing between consecutive server message ids.
    pub const QUANTUM: i64 = 1 << 20;

    pub fn from_sequence(seq: i64) -> Self {
        Self(seq * Self::QUANTUM)
    }

    pub fn sequence(self) -> i64 {
        self.0 / Self::QUANTUM
    }

    /// The smallest id a non-empty supergroup can report as its last message.
    pub fn is_first_in_sequence(self) -> bool {
        self.0 == Self::QUANTUM
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend category of a chat.
///
/// Fetched once per operation and treated as immutable for its duration; a
/// concurrent migration in the backend is not re-validated mid-loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatCategory {
    Private {
        user_id: UserId,
    },
    BasicGroup {
        basic_group_id: BasicGroupId,
    },
    Supergroup {
        supergroup_id: SupergroupId,
        is_channel: bool,
        /// Basic group this supergroup was migrated from, if any.
        upgraded_from: Option<BasicGroupId>,
    },
}

impl ChatCategory {
    pub fn is_group(&self) -> bool {
        !matches!(self, ChatCategory::Private { .. })
    }

    pub fn is_channel(&self) -> bool {
        matches!(
            self,
            ChatCategory::Supergroup {
                is_channel: true,
                ..
            }
        )
    }

    pub fn is_supergroup(&self) -> bool {
        matches!(self, ChatCategory::Supergroup { .. })
    }
}

/// Cached chat metadata used to route every workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: ChatId,
    pub title: String,
    pub category: ChatCategory,
}

/// Privilege of the acting user in a chat.
///
/// Derived from a single membership query per operation; never cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrivilegeLevel {
    None,
    Member,
    Admin {
        can_delete_messages: bool,
        can_restrict_members: bool,
    },
    Creator,
}

impl PrivilegeLevel {
    pub fn can_delete(self) -> bool {
        match self {
            PrivilegeLevel::Creator => true,
            PrivilegeLevel::Admin {
                can_delete_messages,
                ..
            } => can_delete_messages,
            PrivilegeLevel::None | PrivilegeLevel::Member => false,
        }
    }

    pub fn can_restrict(self) -> bool {
        match self {
            PrivilegeLevel::Creator => true,
            PrivilegeLevel::Admin {
                can_restrict_members,
                ..
            } => can_restrict_members,
            PrivilegeLevel::None | PrivilegeLevel::Member => false,
        }
    }

    /// Admin or creator, regardless of individual rights.
    pub fn is_admin(self) -> bool {
        matches!(self, PrivilegeLevel::Admin { .. } | PrivilegeLevel::Creator)
    }

    /// Whether `actor` holding this level may purge messages authored by `sender`.
    ///
    /// Users may always purge their own messages.
    pub fn can_purge_sender(self, actor: UserId, sender: UserId) -> bool {
        actor == sender || self.can_delete()
    }
}

/// Coarse membership status of an enumerated member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    Member,
    Admin,
    Creator,
    Banned,
}

impl MemberStatus {
    pub fn is_privileged(self) -> bool {
        matches!(self, MemberStatus::Admin | MemberStatus::Creator)
    }
}

/// One member produced by a paginated enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MembershipRecord {
    pub user_id: UserId,
    pub status: MemberStatus,
}
