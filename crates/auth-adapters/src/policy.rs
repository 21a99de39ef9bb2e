//! Role-based `VisibilityPolicy`.
//!
//! | role      | listable displays    | deleted replies         |
//! |-----------|----------------------|-------------------------|
//! | guest     | normal               | content blanked         |
//! | member    | normal               | content blanked         |
//! | moderator | normal, review       | shown                   |
//! | admin     | normal, review, ban  | shown                   |
//!
//! Admin-deleted replies also lose their creator for non-staff.
//! A member may open their own topic while it is under review.

use domains::{Actor, DisplayState, Reply, Role, Topic, TopicState, VisibilityPolicy};

#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl VisibilityPolicy for RolePolicy {
    fn listable_displays(&self, actor: &Actor) -> Vec<DisplayState> {
        match actor.role {
            Role::Guest | Role::Member => vec![DisplayState::Normal],
            Role::Moderator => vec![DisplayState::Normal, DisplayState::Review],
            Role::Admin => vec![DisplayState::Normal, DisplayState::Review, DisplayState::Ban],
        }
    }

    fn can_view(&self, actor: &Actor, topic: &Topic) -> bool {
        if self.listable_displays(actor).contains(&topic.display) {
            return true;
        }
        topic.display == DisplayState::Review && actor.user_id == Some(topic.creator_id)
    }

    fn redact(&self, actor: &Actor, mut reply: Reply) -> Reply {
        if actor.is_staff() || !reply.state.is_deleted() {
            return reply;
        }
        reply.content.clear();
        if reply.state == TopicState::AdminDeleted {
            reply.creator_id = 0;
        }
        reply
    }
}
