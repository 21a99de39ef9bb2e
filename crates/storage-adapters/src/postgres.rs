//! # Postgres store
//!
//! Maps the relational model onto `domains` entities. Each container kind has
//! its own topic/post table pair; the reply write path locks the topic row
//! with `SELECT ... FOR UPDATE` so concurrent replies cannot lose a count.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    DisplayState, NewReply, NewTopic, ProfileDirectory, Reply, Topic, TopicState, TopicStore,
    TopicTransaction, TopicType, UserSummary,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::info;

const TOPIC_COLUMNS: &str =
    "id, parent_id, creator_id, title, created_at, sort_timestamp, replies_count, display, state";
const POST_COLUMNS: &str = "id, topic_id, creator_id, content, created_at, state, replied_to";

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

struct Tables {
    topics: &'static str,
    posts: &'static str,
}

fn tables(kind: TopicType) -> anyhow::Result<Tables> {
    match kind {
        TopicType::Group => Ok(Tables { topics: "group_topics", posts: "group_posts" }),
        TopicType::Subject => Ok(Tables { topics: "subject_topics", posts: "subject_posts" }),
        TopicType::Episode => anyhow::bail!("episode topics have no tables"),
    }
}

fn display_codes(displays: &[DisplayState]) -> Vec<i16> {
    displays.iter().map(|d| d.code()).collect()
}

fn topic_from_row(row: &PgRow) -> anyhow::Result<Topic> {
    Ok(Topic {
        id: row.try_get("id")?,
        parent_id: row.try_get("parent_id")?,
        creator_id: row.try_get("creator_id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        sort_timestamp: row.try_get("sort_timestamp")?,
        replies_count: row.try_get("replies_count")?,
        display: DisplayState::try_from(row.try_get::<i16, _>("display")?)
            .map_err(anyhow::Error::msg)?,
        state: TopicState::try_from(row.try_get::<i16, _>("state")?).map_err(anyhow::Error::msg)?,
    })
}

fn reply_from_row(row: &PgRow) -> anyhow::Result<Reply> {
    Ok(Reply {
        id: row.try_get("id")?,
        topic_id: row.try_get("topic_id")?,
        creator_id: row.try_get("creator_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        state: TopicState::try_from(row.try_get::<i16, _>("state")?).map_err(anyhow::Error::msg)?,
        replied_to: row.try_get("replied_to")?,
    })
}

#[derive(Debug, Clone)]
pub struct PgTopicStore {
    pool: PgPool,
}

impl PgTopicStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl TopicStore for PgTopicStore {
    async fn get_topic(&self, kind: TopicType, id: i64) -> anyhow::Result<Option<Topic>> {
        let t = tables(kind)?;
        let row = sqlx::query(&format!("SELECT {TOPIC_COLUMNS} FROM {} WHERE id = $1", t.topics))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(topic_from_row).transpose()
    }

    async fn list_topics(
        &self,
        kind: TopicType,
        parent_id: i64,
        displays: &[DisplayState],
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Topic>> {
        let t = tables(kind)?;
        let rows = sqlx::query(&format!(
            "SELECT {TOPIC_COLUMNS} FROM {} WHERE parent_id = $1 AND display = ANY($2) \
             ORDER BY sort_timestamp DESC, id ASC LIMIT $3 OFFSET $4",
            t.topics
        ))
        .bind(parent_id)
        .bind(display_codes(displays))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(topic_from_row).collect()
    }

    async fn count_topics(
        &self,
        kind: TopicType,
        parent_id: i64,
        displays: &[DisplayState],
    ) -> anyhow::Result<i64> {
        let t = tables(kind)?;
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE parent_id = $1 AND display = ANY($2)",
            t.topics
        ))
        .bind(parent_id)
        .bind(display_codes(displays))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_replies(&self, kind: TopicType, topic_id: i64) -> anyhow::Result<Vec<Reply>> {
        let t = tables(kind)?;
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM {} WHERE topic_id = $1 ORDER BY id ASC",
            t.posts
        ))
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reply_from_row).collect()
    }

    async fn count_replies(&self, kind: TopicType, topic_id: i64) -> anyhow::Result<i64> {
        let t = tables(kind)?;
        let count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE topic_id = $1", t.posts))
                .bind(topic_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Topic row and top post go in together, so a topic never exists
    /// without its first reply.
    async fn create_topic(&self, new: NewTopic, created_at: DateTime<Utc>) -> anyhow::Result<Topic> {
        let t = tables(new.kind)?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO {} (parent_id, creator_id, title, created_at, sort_timestamp, replies_count, display, state) \
             VALUES ($1, $2, $3, $4, $5, 0, $6, $7) RETURNING {TOPIC_COLUMNS}",
            t.topics
        ))
        .bind(new.parent_id)
        .bind(new.creator_id)
        .bind(&new.title)
        .bind(created_at)
        .bind(created_at.timestamp())
        .bind(new.display.code())
        .bind(TopicState::Normal.code())
        .fetch_one(&mut *tx)
        .await?;
        let topic = topic_from_row(&row)?;

        sqlx::query(&format!(
            "INSERT INTO {} (topic_id, creator_id, content, created_at, state, replied_to) \
             VALUES ($1, $2, $3, $4, $5, 0)",
            t.posts
        ))
        .bind(topic.id)
        .bind(new.creator_id)
        .bind(&new.content)
        .bind(created_at)
        .bind(TopicState::Normal.code())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(topic)
    }

    async fn begin(&self) -> anyhow::Result<Box<dyn TopicTransaction>> {
        Ok(Box::new(PgTopicTransaction { tx: self.pool.begin().await? }))
    }
}

pub struct PgTopicTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TopicTransaction for PgTopicTransaction {
    async fn lock_topic(&mut self, kind: TopicType, id: i64) -> anyhow::Result<Option<Topic>> {
        let t = tables(kind)?;
        let row = sqlx::query(&format!(
            "SELECT {TOPIC_COLUMNS} FROM {} WHERE id = $1 FOR UPDATE",
            t.topics
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(topic_from_row).transpose()
    }

    async fn find_reply(
        &mut self,
        kind: TopicType,
        topic_id: i64,
        reply_id: i64,
    ) -> anyhow::Result<Option<Reply>> {
        let t = tables(kind)?;
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM {} WHERE id = $1 AND topic_id = $2",
            t.posts
        ))
        .bind(reply_id)
        .bind(topic_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(reply_from_row).transpose()
    }

    async fn insert_reply(
        &mut self,
        new: &NewReply,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<Reply> {
        let t = tables(new.kind)?;
        let row = sqlx::query(&format!(
            "INSERT INTO {} (topic_id, creator_id, content, created_at, state, replied_to) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {POST_COLUMNS}",
            t.posts
        ))
        .bind(new.topic_id)
        .bind(new.creator_id)
        .bind(&new.content)
        .bind(created_at)
        .bind(new.state.code())
        .bind(new.replied_to)
        .fetch_one(&mut *self.tx)
        .await?;
        reply_from_row(&row)
    }

    async fn update_topic_activity(
        &mut self,
        kind: TopicType,
        topic_id: i64,
        replies_count: i64,
        sort_timestamp: i64,
    ) -> anyhow::Result<()> {
        let t = tables(kind)?;
        let done = sqlx::query(&format!(
            "UPDATE {} SET replies_count = $1, sort_timestamp = $2 WHERE id = $3",
            t.topics
        ))
        .bind(replies_count)
        .bind(sort_timestamp)
        .bind(topic_id)
        .execute(&mut *self.tx)
        .await?;
        if done.rows_affected() != 1 {
            anyhow::bail!("{} topic {topic_id} vanished mid-transaction", kind.as_str());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// `ProfileDirectory` over the `members` table.
#[derive(Debug, Clone)]
pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn fetch_profile(&self, user_id: i64) -> anyhow::Result<Option<UserSummary>> {
        let row = sqlx::query("SELECT id, username, nickname, avatar, sign FROM members WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> anyhow::Result<UserSummary> {
            Ok(UserSummary {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                nickname: row.try_get("nickname")?,
                avatar: row.try_get("avatar")?,
                sign: row.try_get("sign")?,
            })
        })
        .transpose()
    }
}
