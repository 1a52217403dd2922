use super::IUserRepo;
use crate::repos::shared::inmemory_repo::*;
use nudge_domain::{User, ID};

pub struct InMemoryUserRepo {
    users: std::sync::Mutex<Vec<User>>,
}

impl InMemoryUserRepo {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: std::sync::Mutex::new(users),
        }
    }
}

#[async_trait::async_trait]
impl IUserRepo for InMemoryUserRepo {
    async fn find(&self, user_id: &ID) -> Option<User> {
        find(user_id, &self.users)
    }
}
