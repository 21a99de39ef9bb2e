//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{
    Actor, DisplayState, NewReply, NewTopic, Reply, Topic, TopicType, UserSummary,
};

/// Read access and transactional writes for topics and their replies.
#[async_trait]
pub trait TopicStore: Send + Sync {
    async fn get_topic(&self, kind: TopicType, id: i64) -> anyhow::Result<Option<Topic>>;

    /// Topics under `parent_id` whose display is in `displays`,
    /// ordered by `sort_timestamp` DESC then id ASC.
    async fn list_topics(
        &self,
        kind: TopicType,
        parent_id: i64,
        displays: &[DisplayState],
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Topic>>;

    async fn count_topics(
        &self,
        kind: TopicType,
        parent_id: i64,
        displays: &[DisplayState],
    ) -> anyhow::Result<i64>;

    /// Every reply row of a topic in insertion order, top post first.
    async fn list_replies(&self, kind: TopicType, topic_id: i64) -> anyhow::Result<Vec<Reply>>;

    /// Reply rows including the top post.
    async fn count_replies(&self, kind: TopicType, topic_id: i64) -> anyhow::Result<i64>;

    /// Atomically inserts a topic and its top post.
    async fn create_topic(&self, topic: NewTopic, created_at: DateTime<Utc>) -> anyhow::Result<Topic>;

    /// Opens a unit of work. Dropping it without `commit` rolls back.
    async fn begin(&self) -> anyhow::Result<Box<dyn TopicTransaction>>;
}

/// A single store transaction on the reply write path.
#[async_trait]
pub trait TopicTransaction: Send {
    /// Loads a topic and holds it against concurrent writers until the
    /// transaction ends.
    async fn lock_topic(&mut self, kind: TopicType, id: i64) -> anyhow::Result<Option<Topic>>;

    async fn find_reply(
        &mut self,
        kind: TopicType,
        topic_id: i64,
        reply_id: i64,
    ) -> anyhow::Result<Option<Reply>>;

    async fn insert_reply(
        &mut self,
        reply: &NewReply,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<Reply>;

    async fn update_topic_activity(
        &mut self,
        kind: TopicType,
        topic_id: i64,
        replies_count: i64,
        sort_timestamp: i64,
    ) -> anyhow::Result<()>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}

/// Role-based visibility decisions.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait VisibilityPolicy: Send + Sync {
    /// Display states the actor may list. Always contains `Normal`.
    fn listable_displays(&self, actor: &Actor) -> Vec<DisplayState>;

    fn can_view(&self, actor: &Actor, topic: &Topic) -> bool;

    /// May blank `content`/`creator_id`; must keep `id`, `replied_to`, `state`.
    fn redact(&self, actor: &Actor, reply: Reply) -> Reply;
}

/// Public user profiles.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn fetch_profile(&self, user_id: i64) -> anyhow::Result<Option<UserSummary>>;
}

/// Turns a request credential into an [`Actor`].
pub trait ActorResolver: Send + Sync {
    /// `None` means no credential was presented.
    fn resolve(&self, bearer: Option<&str>) -> Result<Actor, AppError>;
}
