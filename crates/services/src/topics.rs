//! Topic listing and topic creation.

use domains::{
    Actor, AppError, DisplayState, NewTopic, Page, Result, Topic, TopicSummary, TopicType,
    MAX_REPLY_LEN, MAX_TITLE_LEN,
};
use tracing::{debug, info, instrument};

use crate::{ensure_supported, validate_text, ForumService};

impl ForumService {
    /// One page of a container's topics, hottest first, plus the number of
    /// topics the actor could page through.
    #[instrument(skip(self, actor))]
    pub async fn list_topics(
        &self,
        actor: &Actor,
        kind: TopicType,
        parent_id: i64,
        page: Page,
    ) -> Result<(i64, Vec<TopicSummary>)> {
        ensure_supported(kind)?;
        self.validate_page(page)?;

        let mut displays = self.visibility.listable_displays(actor);
        if !displays.contains(&DisplayState::Normal) {
            displays.push(DisplayState::Normal);
        }

        let total = self.store.count_topics(kind, parent_id, &displays).await?;
        if page.limit == 0 || page.offset >= total {
            return Ok((total, Vec::new()));
        }

        let topics = self
            .store
            .list_topics(kind, parent_id, &displays, page.limit, page.offset)
            .await?;
        debug!(total, returned = topics.len(), "listed topics");

        Ok((total, topics.into_iter().map(TopicSummary::from).collect()))
    }

    /// Creates a topic and its top post in one store transaction.
    #[instrument(skip(self, new), fields(kind = ?new.kind, parent_id = new.parent_id))]
    pub async fn create_topic(&self, new: NewTopic) -> Result<Topic> {
        ensure_supported(new.kind)?;
        validate_text("title", &new.title, MAX_TITLE_LEN)?;
        validate_text("content", &new.content, MAX_REPLY_LEN)?;

        let topic = self.store.create_topic(new, self.clock.now()).await?;
        info!(topic_id = topic.id, "topic created");
        Ok(topic)
    }

    /// Checks `replies_count` against the stored rows (minus the top post).
    #[instrument(skip(self))]
    pub async fn verify_reply_counter(&self, kind: TopicType, topic_id: i64) -> Result<()> {
        ensure_supported(kind)?;
        let topic = self
            .store
            .get_topic(kind, topic_id)
            .await?
            .ok_or_else(|| AppError::not_found("topic", topic_id))?;
        let rows = self.store.count_replies(kind, topic_id).await?;

        if rows == 0 || topic.replies_count != rows - 1 {
            return Err(AppError::ConsistencyViolation(format!(
                "topic {topic_id} counts {} replies but stores {rows} rows",
                topic.replies_count
            )));
        }
        Ok(())
    }

    fn validate_page(&self, page: Page) -> Result<()> {
        if page.limit < 0 || page.offset < 0 {
            return Err(AppError::Validation("limit and offset must be non-negative".into()));
        }
        if page.limit > self.max_page_limit {
            return Err(AppError::Validation(format!(
                "limit must not exceed {}",
                self.max_page_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::service;

    #[tokio::test]
    async fn negative_bounds_are_rejected_before_the_store() {
        let svc = service();
        for page in [Page { limit: -1, offset: 0 }, Page { limit: 10, offset: -5 }] {
            let err = svc
                .list_topics(&Actor::guest(), TopicType::Group, 1, page)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn oversized_limit_is_rejected() {
        let svc = service().with_max_page_limit(30);
        let err = svc
            .list_topics(&Actor::guest(), TopicType::Group, 1, Page { limit: 31, offset: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unsupported_kind_is_rejected_before_the_store() {
        let err = service()
            .list_topics(&Actor::guest(), TopicType::Episode, 1, Page { limit: 1, offset: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unimplemented(_)));
    }

    #[test]
    fn blank_title_is_rejected() {
        let new = NewTopic {
            kind: TopicType::Group,
            parent_id: 1,
            creator_id: 1,
            title: "   ".into(),
            content: "body".into(),
            display: DisplayState::Normal,
        };
        let err = tokio_test::block_on(service().create_topic(new)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
