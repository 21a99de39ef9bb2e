//! # Gravity-decay ranking
//!
//! When a reply lands, a topic's `sort_timestamp` is normally bumped to the
//! event time. Topics in allow-listed groups instead get a timestamp pulled
//! back by an amount that grows with topic age and shrinks with reply volume,
//! so an old thread with a handful of replies does not outrank fresh activity.

use std::collections::HashSet;

use domains::{Topic, TopicState, TopicType};

pub const GRAVITY: f64 = 1.8;
const DECAY_SCALE: f64 = 200.0;

/// Groups whose topics are ranked with gravity decay.
///
/// Built once from configuration and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct RankingPolicy {
    gravity_groups: HashSet<i64>,
}

impl RankingPolicy {
    pub fn new(gravity_groups: impl IntoIterator<Item = i64>) -> Self {
        Self { gravity_groups: gravity_groups.into_iter().collect() }
    }

    /// Whether topics of `parent_id` decay. Only group containers qualify.
    pub fn decays(&self, kind: TopicType, parent_id: i64) -> bool {
        kind == TopicType::Group && self.gravity_groups.contains(&parent_id)
    }
}

/// New `sort_timestamp` for `topic` when a reply arrives at `event_time`
/// (unix seconds). `topic.replies_count` must be the pre-insert count.
///
/// Never returns a value later than `event_time`.
pub fn rescore_on_new_reply(
    event_time: i64,
    topic: &Topic,
    kind: TopicType,
    policy: &RankingPolicy,
) -> i64 {
    if topic.state == TopicState::AdminSunk {
        return topic.sort_timestamp;
    }
    if !policy.decays(kind, topic.parent_id) || topic.replies_count <= 0 {
        return event_time;
    }

    // Clamped: a negative base under a fractional power is NaN.
    let age_hours = ((event_time - topic.created_at.timestamp()) as f64 / 3600.0).max(0.0);
    let decay = (age_hours + 0.1).powf(GRAVITY) / topic.replies_count as f64 * DECAY_SCALE;

    // `as` truncates toward zero.
    let candidate = (event_time as f64 - decay) as i64;
    candidate.min(event_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domains::DisplayState;

    const GROUP: i64 = 11;

    fn topic(created_at: i64, replies_count: i64, state: TopicState) -> Topic {
        Topic {
            id: 1,
            parent_id: GROUP,
            creator_id: 5,
            title: "t".into(),
            created_at: Utc.timestamp_opt(created_at, 0).unwrap(),
            sort_timestamp: created_at,
            replies_count,
            display: DisplayState::Normal,
            state,
        }
    }

    fn policy() -> RankingPolicy {
        RankingPolicy::new([GROUP])
    }

    #[test]
    fn one_hour_old_topic_with_one_reply() {
        // age 1h: (1.1^1.8 / 1) * 200 = 237.43..
        let t = topic(1000, 1, TopicState::Normal);
        let got = rescore_on_new_reply(4600, &t, TopicType::Group, &policy());
        assert_eq!(got, 4362);
    }

    #[test]
    fn sunk_topic_keeps_its_timestamp() {
        let mut t = topic(1000, 3, TopicState::AdminSunk);
        t.sort_timestamp = 1234;
        assert_eq!(rescore_on_new_reply(99_999, &t, TopicType::Group, &policy()), 1234);
        assert_eq!(
            rescore_on_new_reply(99_999, &t, TopicType::Subject, &RankingPolicy::default()),
            1234
        );
    }

    #[test]
    fn unlisted_group_bumps_to_event_time() {
        let mut t = topic(1000, 4, TopicState::Normal);
        t.parent_id = 12;
        assert_eq!(rescore_on_new_reply(50_000, &t, TopicType::Group, &policy()), 50_000);
    }

    #[test]
    fn subject_with_listed_id_is_not_decayed() {
        let t = topic(1000, 4, TopicState::Normal);
        assert_eq!(rescore_on_new_reply(50_000, &t, TopicType::Subject, &policy()), 50_000);
    }

    #[test]
    fn first_reply_bumps_to_event_time() {
        let t = topic(1000, 0, TopicState::Normal);
        assert_eq!(rescore_on_new_reply(90_000, &t, TopicType::Group, &policy()), 90_000);
    }

    #[test]
    fn pinned_topic_still_decays() {
        let t = topic(1000, 1, TopicState::AdminPinned);
        assert_eq!(rescore_on_new_reply(4600, &t, TopicType::Group, &policy()), 4362);
    }

    #[test]
    fn more_replies_means_less_decay() {
        let quiet = topic(0, 1, TopicState::Normal);
        let busy = topic(0, 50, TopicState::Normal);
        let now = 3 * 24 * 3600;
        let a = rescore_on_new_reply(now, &quiet, TopicType::Group, &policy());
        let b = rescore_on_new_reply(now, &busy, TopicType::Group, &policy());
        assert!(a < b);
        assert!(b <= now);
    }

    #[test]
    fn never_later_than_event_time() {
        for age in [0, 1, 59, 3600, 86_400, 10_000_000] {
            for replies in [1, 2, 10, 10_000, i64::from(u32::MAX)] {
                let t = topic(1_000_000, replies, TopicState::Normal);
                let now = 1_000_000 + age;
                assert!(rescore_on_new_reply(now, &t, TopicType::Group, &policy()) <= now);
            }
        }
    }

    #[test]
    fn reply_stamped_before_creation_is_clamped_to_zero_age() {
        // 0.1^1.8 * 200 = 3.17..
        let t = topic(5000, 1, TopicState::Normal);
        assert_eq!(rescore_on_new_reply(4000, &t, TopicType::Group, &policy()), 3996);
    }
}
