//! # services
//!
//! Topic and reply use cases on top of the `domains` ports: listing,
//! thread rendering, reply creation and the ranking transform it drives.

pub mod ranking;
pub mod reply;
pub mod thread;
pub mod topics;

use std::sync::Arc;

use domains::{AppError, Clock, ProfileDirectory, Result, TopicStore, TopicType, VisibilityPolicy};

pub use ranking::{rescore_on_new_reply, RankingPolicy};
pub use thread::assemble_thread;

/// Upper bound on `Page::limit` when none is configured.
pub const DEFAULT_MAX_PAGE_LIMIT: i64 = 100;

/// Entry point for every topic/reply operation.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct ForumService {
    store: Arc<dyn TopicStore>,
    visibility: Arc<dyn VisibilityPolicy>,
    profiles: Arc<dyn ProfileDirectory>,
    clock: Arc<dyn Clock>,
    ranking: RankingPolicy,
    max_page_limit: i64,
}

impl ForumService {
    pub fn new(
        store: Arc<dyn TopicStore>,
        visibility: Arc<dyn VisibilityPolicy>,
        profiles: Arc<dyn ProfileDirectory>,
        clock: Arc<dyn Clock>,
        ranking: RankingPolicy,
    ) -> Self {
        Self {
            store,
            visibility,
            profiles,
            clock,
            ranking,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
        }
    }

    pub fn with_max_page_limit(mut self, max_page_limit: i64) -> Self {
        self.max_page_limit = max_page_limit;
        self
    }
}

/// Rejects container kinds this core does not serve.
pub(crate) fn ensure_supported(kind: TopicType) -> Result<()> {
    if kind.is_supported() {
        Ok(())
    } else {
        Err(AppError::Unimplemented(format!("{} topics", kind.as_str())))
    }
}

/// Trimmed-non-empty and at most `max` characters.
pub(crate) fn validate_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!("{field} exceeds {max} characters")));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_is_unimplemented() {
        assert!(ensure_supported(TopicType::Group).is_ok());
        assert!(matches!(
            ensure_supported(TopicType::Episode),
            Err(AppError::Unimplemented(_))
        ));
    }

    #[test]
    fn text_validation_counts_characters() {
        assert!(validate_text("content", "  \n", 10).is_err());
        assert!(validate_text("content", "日本語", 3).is_ok());
        assert!(validate_text("content", "日本語!", 3).is_err());
    }
}
