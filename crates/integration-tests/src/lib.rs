//! Shared fixtures for the integration tests: a `ForumService` wired to the
//! in-memory adapters and a hand-driven clock.

use std::sync::Arc;

use auth_adapters::RolePolicy;
use domains::{
    Actor, DisplayState, ManualClock, NewReply, NewTopic, ReplyWithAuthor, Role, Topic,
    TopicState, TopicStore, TopicType, UserSummary,
};
use services::{ForumService, RankingPolicy};
use storage_adapters::{MemoryProfileDirectory, MemoryTopicStore};

/// Group id on the ranking allow-list in every harness.
pub const GRAVITY_GROUP: i64 = 4;
/// Group id not on the allow-list.
pub const PLAIN_GROUP: i64 = 5;

pub struct Harness {
    pub store: MemoryTopicStore,
    pub profiles: Arc<MemoryProfileDirectory>,
    pub clock: Arc<ManualClock>,
    pub forum: Arc<ForumService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::starting_at(1_700_000_000)
    }

    pub fn starting_at(secs: i64) -> Self {
        let store = MemoryTopicStore::new();
        let profiles = Arc::new(MemoryProfileDirectory::new());
        let clock = Arc::new(ManualClock::at(secs));
        let forum = forum_over(Arc::new(store.clone()), profiles.clone(), clock.clone());
        Self { store, profiles, clock, forum: Arc::new(forum) }
    }

    pub async fn topic(&self, kind: TopicType, parent_id: i64, display: DisplayState) -> Topic {
        self.forum
            .create_topic(NewTopic {
                kind,
                parent_id,
                creator_id: 1,
                title: format!("topic in {parent_id}"),
                content: "top post".into(),
                display,
            })
            .await
            .expect("create topic")
    }

    pub async fn reply(
        &self,
        kind: TopicType,
        topic_id: i64,
        creator_id: i64,
        replied_to: i64,
    ) -> ReplyWithAuthor {
        self.forum
            .create_reply(&Actor::member(creator_id), new_reply(kind, topic_id, creator_id, replied_to))
            .await
            .expect("create reply")
    }

    pub async fn stored_topic(&self, kind: TopicType, id: i64) -> Topic {
        self.store.get_topic(kind, id).await.unwrap().expect("topic exists")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A service over any store, with `GRAVITY_GROUP` allow-listed.
pub fn forum_over(
    store: Arc<dyn TopicStore>,
    profiles: Arc<MemoryProfileDirectory>,
    clock: Arc<ManualClock>,
) -> ForumService {
    ForumService::new(
        store,
        Arc::new(RolePolicy),
        profiles,
        clock,
        RankingPolicy::new([GRAVITY_GROUP]),
    )
}

pub fn new_reply(kind: TopicType, topic_id: i64, creator_id: i64, replied_to: i64) -> NewReply {
    NewReply {
        kind,
        topic_id,
        creator_id,
        content: format!("from {creator_id}"),
        replied_to,
        state: TopicState::Normal,
    }
}

pub fn user(id: i64, nickname: &str) -> UserSummary {
    UserSummary {
        id,
        username: format!("user{id}"),
        nickname: nickname.into(),
        avatar: String::new(),
        sign: String::new(),
    }
}

pub fn moderator(id: i64) -> Actor {
    Actor { user_id: Some(id), role: Role::Moderator }
}

pub fn admin(id: i64) -> Actor {
    Actor { user_id: Some(id), role: Role::Admin }
}
