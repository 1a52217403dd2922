mod inmemory;
mod postgres;

pub use inmemory::InMemoryEventRepo;
use nudge_domain::{Event, ID};
pub use postgres::PostgresEventRepo;

/// Read access to the `Event` directory
#[async_trait::async_trait]
pub trait IEventRepo: Send + Sync {
    async fn find(&self, event_id: &ID) -> Option<Event>;
    async fn find_many(&self, event_ids: &[ID]) -> anyhow::Result<Vec<Event>>;
}
