//! In-memory `ProfileDirectory`.

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{ProfileDirectory, UserSummary};

#[derive(Debug, Default)]
pub struct MemoryProfileDirectory {
    users: DashMap<i64, UserSummary>,
}

impl MemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, user: UserSummary) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfileDirectory {
    async fn fetch_profile(&self, user_id: i64) -> anyhow::Result<Option<UserSummary>> {
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_existing_profile() {
        let dir = MemoryProfileDirectory::new();
        let mut user = UserSummary::unknown(3);
        dir.upsert(user.clone());
        user.nickname = "sai".into();
        dir.upsert(user);

        let found = tokio_test::block_on(dir.fetch_profile(3)).unwrap().unwrap();
        assert_eq!(found.nickname, "sai");
        assert!(tokio_test::block_on(dir.fetch_profile(4)).unwrap().is_none());
    }
}
