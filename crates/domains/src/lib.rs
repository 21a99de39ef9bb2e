//! topic-board/crates/domains/src/lib.rs
//!
//! Entities, port traits and the error type shared by every other crate.

pub mod clock;
pub mod error;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use clock::*;
pub use error::*;
pub use models::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    fn reply(id: i64, replied_to: i64) -> Reply {
        Reply {
            id,
            topic_id: 1,
            creator_id: 7,
            content: "hi".to_string(),
            created_at: chrono::Utc::now(),
            state: TopicState::Normal,
            replied_to,
        }
    }

    #[test]
    fn role_follows_replied_to() {
        assert_eq!(reply(2, 0).role(), ReplyRole::TopLevel);
        assert_eq!(reply(3, 2).role(), ReplyRole::SubReply { parent: 2 });
    }

    #[test]
    fn state_codes_survive_storage_mapping() {
        for code in 0..=7 {
            let state = TopicState::try_from(code).unwrap();
            assert_eq!(state.code(), code);
        }
        assert!(TopicState::try_from(8).is_err());
        assert_eq!(DisplayState::try_from(2).unwrap(), DisplayState::Review);
        assert!(DisplayState::try_from(-1).is_err());
    }

    #[test]
    fn only_group_and_subject_are_backed() {
        assert!(TopicType::Group.is_supported());
        assert!(TopicType::Subject.is_supported());
        assert!(!TopicType::Episode.is_supported());
    }

    #[test]
    fn staff_starts_at_moderator() {
        assert!(!Actor::guest().is_staff());
        assert!(!Actor::member(1).is_staff());
        assert!(Actor { user_id: Some(1), role: Role::Moderator }.is_staff());
        assert!(Actor { user_id: Some(1), role: Role::Admin }.is_staff());
    }

    #[test]
    fn new_reply_defaults_to_top_level_normal() {
        let json = serde_json::json!({
            "kind": "group", "topic_id": 3, "creator_id": 9, "content": "x"
        });
        let new: NewReply = serde_json::from_value(json).unwrap();
        assert_eq!(new.replied_to, 0);
        assert_eq!(new.state, TopicState::Normal);
        assert_eq!(new.kind, TopicType::Group);
    }
}
