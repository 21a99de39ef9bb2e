//! # Domain Models
//!
//! These structs represent the core entities of topic-board.
//! Row identifiers are store-assigned `i64`s; insertion order equals id order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest reply body accepted, in characters.
pub const MAX_REPLY_LEN: usize = 65_535;

/// Longest topic title accepted, in characters.
pub const MAX_TITLE_LEN: usize = 80;

/// The kind of container a topic hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    Group,
    Subject,
    /// Episode discussions are addressable but not backed by this core yet.
    Episode,
}

impl TopicType {
    pub fn as_str(self) -> &'static str {
        match self {
            TopicType::Group => "group",
            TopicType::Subject => "subject",
            TopicType::Episode => "episode",
        }
    }

    pub fn is_supported(self) -> bool {
        matches!(self, TopicType::Group | TopicType::Subject)
    }
}

/// Listing visibility of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    Ban,
    Normal,
    Review,
}

impl DisplayState {
    pub fn code(self) -> i16 {
        match self {
            DisplayState::Ban => 0,
            DisplayState::Normal => 1,
            DisplayState::Review => 2,
        }
    }
}

impl TryFrom<i16> for DisplayState {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DisplayState::Ban),
            1 => Ok(DisplayState::Normal),
            2 => Ok(DisplayState::Review),
            other => Err(format!("unknown display state {other}")),
        }
    }
}

/// Last moderation action recorded against a topic or reply.
///
/// Kept separate from [`DisplayState`]: the two overlap for some values but
/// the audit trail needs both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicState {
    #[default]
    Normal,
    AdminClosed,
    AdminReopened,
    AdminPinned,
    AdminMerged,
    AdminSunk,
    UserDeleted,
    AdminDeleted,
}

impl TopicState {
    pub fn code(self) -> i16 {
        match self {
            TopicState::Normal => 0,
            TopicState::AdminClosed => 1,
            TopicState::AdminReopened => 2,
            TopicState::AdminPinned => 3,
            TopicState::AdminMerged => 4,
            TopicState::AdminSunk => 5,
            TopicState::UserDeleted => 6,
            TopicState::AdminDeleted => 7,
        }
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, TopicState::UserDeleted | TopicState::AdminDeleted)
    }
}

impl TryFrom<i16> for TopicState {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => TopicState::Normal,
            1 => TopicState::AdminClosed,
            2 => TopicState::AdminReopened,
            3 => TopicState::AdminPinned,
            4 => TopicState::AdminMerged,
            5 => TopicState::AdminSunk,
            6 => TopicState::UserDeleted,
            7 => TopicState::AdminDeleted,
            other => return Err(format!("unknown topic state {other}")),
        })
    }
}

/// A discussion thread container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    /// Owning container (group id, subject id).
    pub parent_id: i64,
    pub creator_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Ranking value in unix seconds; starts at `created_at`.
    pub sort_timestamp: i64,
    /// Replies excluding the top post.
    pub replies_count: i64,
    pub display: DisplayState,
    pub state: TopicState,
}

/// One message in a topic's insertion-ordered reply sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub topic_id: i64,
    /// `0` once redacted.
    pub creator_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub state: TopicState,
    /// `0` for the top post and top-level replies.
    pub replied_to: i64,
}

/// Where a reply sits in the two-level tree.
///
/// Nesting stops at one level: a `SubReply` whose parent is itself a
/// sub-reply has no place in the rendered thread and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyRole {
    TopLevel,
    SubReply { parent: i64 },
}

impl Reply {
    pub fn role(&self) -> ReplyRole {
        match self.replied_to {
            0 => ReplyRole::TopLevel,
            parent => ReplyRole::SubReply { parent },
        }
    }
}

/// Input for the reply write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReply {
    pub kind: TopicType,
    pub topic_id: i64,
    pub creator_id: i64,
    pub content: String,
    #[serde(default)]
    pub replied_to: i64,
    #[serde(default)]
    pub state: TopicState,
}

/// Input for creating a topic together with its top post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTopic {
    pub kind: TopicType,
    pub parent_id: i64,
    pub creator_id: i64,
    pub title: String,
    pub content: String,
    pub display: DisplayState,
}

/// Listing projection of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: i64,
    pub parent_id: i64,
    pub creator_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub sort_timestamp: i64,
    pub replies_count: i64,
    pub display: DisplayState,
    pub state: TopicState,
}

impl From<Topic> for TopicSummary {
    fn from(t: Topic) -> Self {
        Self {
            id: t.id,
            parent_id: t.parent_id,
            creator_id: t.creator_id,
            title: t.title,
            created_at: t.created_at,
            sort_timestamp: t.sort_timestamp,
            replies_count: t.replies_count,
            display: t.display,
            state: t.state,
        }
    }
}

/// A top-level reply with the sub-replies addressed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyNode {
    pub reply: Reply,
    pub sub_replies: Vec<Reply>,
}

/// A topic rendered as top post plus two-level reply tree. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadView {
    pub topic: Topic,
    pub top_post: Reply,
    pub replies: Vec<ReplyNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Public profile of a user, as returned by the profile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub avatar: String,
    pub sign: String,
}

impl UserSummary {
    /// Stand-in for an author whose profile no longer resolves.
    pub fn unknown(id: i64) -> Self {
        Self {
            id,
            username: id.to_string(),
            nickname: String::new(),
            avatar: String::new(),
            sign: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyWithAuthor {
    #[serde(flatten)]
    pub reply: Reply,
    pub author: UserSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Member,
    Moderator,
    Admin,
}

/// Whoever is making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<i64>,
    pub role: Role,
}

impl Actor {
    pub fn guest() -> Self {
        Self { user_id: None, role: Role::Guest }
    }

    pub fn member(user_id: i64) -> Self {
        Self { user_id: Some(user_id), role: Role::Member }
    }

    pub fn is_staff(&self) -> bool {
        self.role >= Role::Moderator
    }
}
