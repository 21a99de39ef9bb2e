//! # In-memory store
//!
//! A `TopicStore` backed by process memory, for local runs and tests.
//! One mutex guards all tables; a transaction owns that guard until it is
//! committed or dropped, so writers serialize and readers wait for them.
//! Writes are staged and only applied on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DisplayState, NewReply, NewTopic, Reply, Topic, TopicState, TopicStore, TopicTransaction,
    TopicType,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type Key = (TopicType, i64);

#[derive(Debug, Default)]
struct Tables {
    topics: BTreeMap<Key, Topic>,
    /// Keyed by reply id, so iteration is insertion order.
    replies: BTreeMap<Key, Reply>,
    last_topic_id: i64,
    last_reply_id: i64,
}

impl Tables {
    fn replies_of(&self, kind: TopicType, topic_id: i64) -> impl Iterator<Item = &Reply> {
        self.replies
            .iter()
            .filter(move |((k, _), r)| *k == kind && r.topic_id == topic_id)
            .map(|(_, r)| r)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTopicStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryTopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads rows exactly as given, bypassing every invariant check.
    /// Used to bring in existing data; ids must not collide.
    pub async fn import_topic(&self, kind: TopicType, topic: Topic, replies: Vec<Reply>) {
        let mut tables = self.tables.lock().await;
        tables.last_topic_id = tables.last_topic_id.max(topic.id);
        for reply in replies {
            tables.last_reply_id = tables.last_reply_id.max(reply.id);
            tables.replies.insert((kind, reply.id), reply);
        }
        tables.topics.insert((kind, topic.id), topic);
    }

    /// Records a moderation action on a topic. Returns `false` if absent.
    pub async fn set_topic_state(&self, kind: TopicType, id: i64, state: TopicState) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.topics.get_mut(&(kind, id)) {
            Some(topic) => {
                topic.state = state;
                true
            }
            None => false,
        }
    }

    /// Records a moderation action on a reply. Returns `false` if absent.
    pub async fn set_reply_state(&self, kind: TopicType, id: i64, state: TopicState) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.replies.get_mut(&(kind, id)) {
            Some(reply) => {
                reply.state = state;
                true
            }
            None => false,
        }
    }
}

fn filter_listed<'a>(
    tables: &'a Tables,
    kind: TopicType,
    parent_id: i64,
    displays: &'a [DisplayState],
) -> impl Iterator<Item = &'a Topic> {
    tables
        .topics
        .iter()
        .filter(move |((k, _), t)| {
            *k == kind && t.parent_id == parent_id && displays.contains(&t.display)
        })
        .map(|(_, t)| t)
}

#[async_trait]
impl TopicStore for MemoryTopicStore {
    async fn get_topic(&self, kind: TopicType, id: i64) -> anyhow::Result<Option<Topic>> {
        Ok(self.tables.lock().await.topics.get(&(kind, id)).cloned())
    }

    async fn list_topics(
        &self,
        kind: TopicType,
        parent_id: i64,
        displays: &[DisplayState],
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Topic>> {
        let tables = self.tables.lock().await;
        let mut topics: Vec<&Topic> = filter_listed(&tables, kind, parent_id, displays).collect();
        topics.sort_by(|a, b| b.sort_timestamp.cmp(&a.sort_timestamp).then(a.id.cmp(&b.id)));

        let offset = usize::try_from(offset)?;
        let limit = usize::try_from(limit)?;
        Ok(topics.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count_topics(
        &self,
        kind: TopicType,
        parent_id: i64,
        displays: &[DisplayState],
    ) -> anyhow::Result<i64> {
        let tables = self.tables.lock().await;
        Ok(filter_listed(&tables, kind, parent_id, displays).count() as i64)
    }

    async fn list_replies(&self, kind: TopicType, topic_id: i64) -> anyhow::Result<Vec<Reply>> {
        let tables = self.tables.lock().await;
        Ok(tables.replies_of(kind, topic_id).cloned().collect())
    }

    async fn count_replies(&self, kind: TopicType, topic_id: i64) -> anyhow::Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.replies_of(kind, topic_id).count() as i64)
    }

    async fn create_topic(&self, new: NewTopic, created_at: DateTime<Utc>) -> anyhow::Result<Topic> {
        let mut tables = self.tables.lock().await;
        tables.last_topic_id += 1;
        tables.last_reply_id += 1;

        let topic = Topic {
            id: tables.last_topic_id,
            parent_id: new.parent_id,
            creator_id: new.creator_id,
            title: new.title,
            created_at,
            sort_timestamp: created_at.timestamp(),
            replies_count: 0,
            display: new.display,
            state: TopicState::Normal,
        };
        let top_post = Reply {
            id: tables.last_reply_id,
            topic_id: topic.id,
            creator_id: new.creator_id,
            content: new.content,
            created_at,
            state: TopicState::Normal,
            replied_to: 0,
        };

        tables.replies.insert((new.kind, top_post.id), top_post);
        tables.topics.insert((new.kind, topic.id), topic.clone());
        Ok(topic)
    }

    async fn begin(&self) -> anyhow::Result<Box<dyn TopicTransaction>> {
        let tables = Arc::clone(&self.tables).lock_owned().await;
        let last_reply_id = tables.last_reply_id;
        Ok(Box::new(MemoryTransaction {
            tables,
            last_reply_id,
            staged_replies: Vec::new(),
            staged_topics: Vec::new(),
        }))
    }
}

struct StagedActivity {
    kind: TopicType,
    topic_id: i64,
    replies_count: i64,
    sort_timestamp: i64,
}

pub struct MemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
    last_reply_id: i64,
    staged_replies: Vec<(TopicType, Reply)>,
    staged_topics: Vec<StagedActivity>,
}

impl MemoryTransaction {
    fn current_topic(&self, kind: TopicType, id: i64) -> Option<Topic> {
        let mut topic = self.tables.topics.get(&(kind, id)).cloned()?;
        if let Some(staged) = self
            .staged_topics
            .iter()
            .rev()
            .find(|s| s.kind == kind && s.topic_id == id)
        {
            topic.replies_count = staged.replies_count;
            topic.sort_timestamp = staged.sort_timestamp;
        }
        Some(topic)
    }
}

#[async_trait]
impl TopicTransaction for MemoryTransaction {
    async fn lock_topic(&mut self, kind: TopicType, id: i64) -> anyhow::Result<Option<Topic>> {
        // The whole store is already held by this transaction.
        Ok(self.current_topic(kind, id))
    }

    async fn find_reply(
        &mut self,
        kind: TopicType,
        topic_id: i64,
        reply_id: i64,
    ) -> anyhow::Result<Option<Reply>> {
        let committed = self.tables.replies.get(&(kind, reply_id));
        let staged = self
            .staged_replies
            .iter()
            .find(|(k, r)| *k == kind && r.id == reply_id)
            .map(|(_, r)| r);
        Ok(committed.or(staged).filter(|r| r.topic_id == topic_id).cloned())
    }

    async fn insert_reply(
        &mut self,
        new: &NewReply,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<Reply> {
        self.last_reply_id += 1;
        let reply = Reply {
            id: self.last_reply_id,
            topic_id: new.topic_id,
            creator_id: new.creator_id,
            content: new.content.clone(),
            created_at,
            state: new.state,
            replied_to: new.replied_to,
        };
        self.staged_replies.push((new.kind, reply.clone()));
        Ok(reply)
    }

    async fn update_topic_activity(
        &mut self,
        kind: TopicType,
        topic_id: i64,
        replies_count: i64,
        sort_timestamp: i64,
    ) -> anyhow::Result<()> {
        if !self.tables.topics.contains_key(&(kind, topic_id)) {
            anyhow::bail!("{} topic {topic_id} vanished mid-transaction", kind.as_str());
        }
        self.staged_topics.push(StagedActivity { kind, topic_id, replies_count, sort_timestamp });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTransaction { mut tables, last_reply_id, staged_replies, staged_topics } = *self;

        let inserted = staged_replies.len();
        for (kind, reply) in staged_replies {
            tables.replies.insert((kind, reply.id), reply);
        }
        for staged in staged_topics {
            if let Some(topic) = tables.topics.get_mut(&(staged.kind, staged.topic_id)) {
                topic.replies_count = staged.replies_count;
                topic.sort_timestamp = staged.sort_timestamp;
            }
        }
        tables.last_reply_id = last_reply_id;

        debug!(inserted, "memory transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_topic(parent_id: i64, display: DisplayState) -> NewTopic {
        NewTopic {
            kind: TopicType::Group,
            parent_id,
            creator_id: 1,
            title: "title".into(),
            content: "top post".into(),
            display,
        }
    }

    fn new_reply(topic_id: i64) -> NewReply {
        NewReply {
            kind: TopicType::Group,
            topic_id,
            creator_id: 2,
            content: "reply".into(),
            replied_to: 0,
            state: TopicState::Normal,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn create_topic_writes_top_post() {
        let store = MemoryTopicStore::new();
        let topic = store.create_topic(new_topic(5, DisplayState::Normal), at(100)).await.unwrap();

        assert_eq!(topic.sort_timestamp, 100);
        assert_eq!(topic.replies_count, 0);
        let replies = store.list_replies(TopicType::Group, topic.id).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].replied_to, 0);
        assert!(store.list_replies(TopicType::Subject, topic.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = MemoryTopicStore::new();
        let topic = store.create_topic(new_topic(5, DisplayState::Normal), at(100)).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_reply(&new_reply(topic.id), at(200)).await.unwrap();
            tx.update_topic_activity(TopicType::Group, topic.id, 1, 200).await.unwrap();
        }

        assert_eq!(store.count_replies(TopicType::Group, topic.id).await.unwrap(), 1);
        let stored = store.get_topic(TopicType::Group, topic.id).await.unwrap().unwrap();
        assert_eq!(stored, topic);
    }

    #[tokio::test]
    async fn commit_applies_staged_rows_and_reads_see_own_writes() {
        let store = MemoryTopicStore::new();
        let topic = store.create_topic(new_topic(5, DisplayState::Normal), at(100)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let reply = tx.insert_reply(&new_reply(topic.id), at(200)).await.unwrap();
        assert!(tx.find_reply(TopicType::Group, topic.id, reply.id).await.unwrap().is_some());
        assert!(tx.find_reply(TopicType::Group, topic.id + 1, reply.id).await.unwrap().is_none());
        tx.update_topic_activity(TopicType::Group, topic.id, 1, 200).await.unwrap();
        assert_eq!(tx.lock_topic(TopicType::Group, topic.id).await.unwrap().unwrap().replies_count, 1);
        tx.commit().await.unwrap();

        let stored = store.get_topic(TopicType::Group, topic.id).await.unwrap().unwrap();
        assert_eq!((stored.replies_count, stored.sort_timestamp), (1, 200));
        assert_eq!(store.count_replies(TopicType::Group, topic.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn listing_orders_by_sort_timestamp_then_id() {
        let store = MemoryTopicStore::new();
        let a = store.create_topic(new_topic(5, DisplayState::Normal), at(100)).await.unwrap();
        let b = store.create_topic(new_topic(5, DisplayState::Normal), at(300)).await.unwrap();
        let c = store.create_topic(new_topic(5, DisplayState::Normal), at(100)).await.unwrap();
        store.create_topic(new_topic(5, DisplayState::Ban), at(900)).await.unwrap();
        store.create_topic(new_topic(6, DisplayState::Normal), at(900)).await.unwrap();

        let normal = [DisplayState::Normal];
        let ids: Vec<i64> = store
            .list_topics(TopicType::Group, 5, &normal, 10, 0)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id, c.id]);
        assert_eq!(store.count_topics(TopicType::Group, 5, &normal).await.unwrap(), 3);

        let page = store.list_topics(TopicType::Group, 5, &normal, 1, 2).await.unwrap();
        assert_eq!(page[0].id, c.id);
    }

    #[tokio::test]
    async fn update_on_missing_topic_fails() {
        let store = MemoryTopicStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.update_topic_activity(TopicType::Group, 42, 1, 1).await.is_err());
    }
}
