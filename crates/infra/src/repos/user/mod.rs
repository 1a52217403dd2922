mod inmemory;
mod postgres;

pub use inmemory::InMemoryUserRepo;
use nudge_domain::{User, ID};
pub use postgres::PostgresUserRepo;

/// Read access to the `User` directory
#[async_trait::async_trait]
pub trait IUserRepo: Send + Sync {
    async fn find(&self, user_id: &ID) -> Option<User>;
}
