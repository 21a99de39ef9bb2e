//! Reply creation: the only write path that touches a topic's counter and
//! ranking timestamp.

use domains::{Actor, AppError, NewReply, ReplyWithAuthor, Result, UserSummary, MAX_REPLY_LEN};
use tracing::{info, instrument, warn};

use crate::{ensure_supported, rescore_on_new_reply, validate_text, ForumService};

impl ForumService {
    /// Inserts a reply and updates the topic's `replies_count` and
    /// `sort_timestamp` in one transaction, then attaches the author profile.
    ///
    /// A topic `actor` may not view is reported as missing. Any error before
    /// commit leaves the store untouched. Nothing after commit fails the
    /// call: an unavailable profile degrades to a placeholder author.
    #[instrument(skip(self, actor, new), fields(kind = ?new.kind, topic_id = new.topic_id))]
    pub async fn create_reply(&self, actor: &Actor, new: NewReply) -> Result<ReplyWithAuthor> {
        ensure_supported(new.kind)?;
        validate_text("content", &new.content, MAX_REPLY_LEN)?;
        if new.replied_to < 0 {
            return Err(AppError::Validation("replied_to must be non-negative".into()));
        }

        let event_time = self.clock.now();
        let mut tx = self.store.begin().await?;

        let topic = tx
            .lock_topic(new.kind, new.topic_id)
            .await?
            .filter(|topic| self.visibility.can_view(actor, topic))
            .ok_or_else(|| AppError::not_found("topic", new.topic_id))?;

        if new.replied_to != 0
            && tx.find_reply(new.kind, new.topic_id, new.replied_to).await?.is_none()
        {
            return Err(AppError::not_found("reply", new.replied_to));
        }

        let reply = tx.insert_reply(&new, event_time).await?;
        let sort_timestamp =
            rescore_on_new_reply(event_time.timestamp(), &topic, new.kind, &self.ranking);
        tx.update_topic_activity(new.kind, topic.id, topic.replies_count + 1, sort_timestamp)
            .await?;
        tx.commit().await?;

        info!(reply_id = reply.id, sort_timestamp, "reply created");

        // The reply is committed; failing here would invite a duplicate retry.
        let author = match self.profiles.fetch_profile(reply.creator_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(user_id = reply.creator_id, "reply author has no profile");
                UserSummary::unknown(reply.creator_id)
            }
            Err(e) => {
                warn!(user_id = reply.creator_id, error = %e, "profile lookup failed after commit");
                UserSummary::unknown(reply.creator_id)
            }
        };

        Ok(ReplyWithAuthor { reply, author })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::service;
    use domains::{TopicState, TopicType};

    fn new_reply(content: &str, replied_to: i64) -> NewReply {
        NewReply {
            kind: TopicType::Group,
            topic_id: 1,
            creator_id: 2,
            content: content.into(),
            replied_to,
            state: TopicState::Normal,
        }
    }

    #[tokio::test]
    async fn blank_content_never_opens_a_transaction() {
        let err = service().create_reply(&Actor::member(2), new_reply(" \t", 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn negative_parent_is_rejected() {
        let err = service().create_reply(&Actor::member(2), new_reply("hi", -3)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn episode_replies_are_unimplemented() {
        let mut new = new_reply("hi", 0);
        new.kind = TopicType::Episode;
        let err = service().create_reply(&Actor::member(2), new).await.unwrap_err();
        assert!(matches!(err, AppError::Unimplemented(_)));
    }
}
