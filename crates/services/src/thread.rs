//! # Thread assembly
//!
//! Rebuilds the two-level reply tree from a topic's flat, insertion-ordered
//! reply rows.

use std::collections::HashMap;

use domains::{
    Actor, AppError, Reply, ReplyNode, ReplyRole, Result, ThreadView, Topic, TopicType,
    VisibilityPolicy,
};
use tracing::{debug, error, instrument};

use crate::{ensure_supported, ForumService};

/// Builds the thread view for `topic` out of its reply rows.
///
/// The first row is the top post. Sub-replies are attached only to the
/// top-level reply named by their `replied_to`; replies aimed at a
/// sub-reply (or at the top post) have no slot and are left out.
/// Every emitted reply goes through [`VisibilityPolicy::redact`].
pub fn assemble_thread(
    topic: Topic,
    replies: Vec<Reply>,
    actor: &Actor,
    policy: &dyn VisibilityPolicy,
) -> Result<ThreadView> {
    let mut rows = replies.into_iter();
    let top_post = rows.next().ok_or_else(|| {
        AppError::ConsistencyViolation(format!("topic {} has no top post", topic.id))
    })?;

    let mut top_level = Vec::new();
    let mut nested: HashMap<i64, Vec<Reply>> = HashMap::new();
    for reply in rows {
        match reply.role() {
            ReplyRole::TopLevel => top_level.push(reply),
            ReplyRole::SubReply { parent } => nested.entry(parent).or_default().push(reply),
        }
    }

    let replies: Vec<ReplyNode> = top_level
        .into_iter()
        .map(|reply| {
            let sub_replies = nested
                .remove(&reply.id)
                .unwrap_or_default()
                .into_iter()
                .map(|sub| policy.redact(actor, sub))
                .collect();
            ReplyNode { reply: policy.redact(actor, reply), sub_replies }
        })
        .collect();

    if !nested.is_empty() {
        let dropped: usize = nested.values().map(Vec::len).sum();
        debug!(topic_id = topic.id, dropped, "replies nested deeper than one level left out");
    }

    Ok(ThreadView { top_post: policy.redact(actor, top_post), topic, replies })
}

impl ForumService {
    /// Renders a topic for `actor`. A topic the actor may not view is
    /// reported exactly like a missing one.
    #[instrument(skip(self, actor))]
    pub async fn render_thread(
        &self,
        actor: &Actor,
        kind: TopicType,
        topic_id: i64,
    ) -> Result<ThreadView> {
        ensure_supported(kind)?;

        let topic = self
            .store
            .get_topic(kind, topic_id)
            .await?
            .filter(|topic| self.visibility.can_view(actor, topic))
            .ok_or_else(|| AppError::not_found("topic", topic_id))?;

        let replies = self.store.list_replies(kind, topic_id).await?;
        debug!(rows = replies.len(), "loaded reply rows");

        assemble_thread(topic, replies, actor, self.visibility.as_ref()).inspect_err(|err| {
            if let AppError::ConsistencyViolation(msg) = err {
                error!(topic_id, %msg, "thread data is corrupt");
            }
        })
    }
}
