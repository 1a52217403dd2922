use super::IEventRepo;
use crate::repos::shared::inmemory_repo::*;
use nudge_domain::{Event, ID};

pub struct InMemoryEventRepo {
    events: std::sync::Mutex<Vec<Event>>,
}

impl InMemoryEventRepo {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: std::sync::Mutex::new(events),
        }
    }
}

#[async_trait::async_trait]
impl IEventRepo for InMemoryEventRepo {
    async fn find(&self, event_id: &ID) -> Option<Event> {
        find(event_id, &self.events)
    }

    async fn find_many(&self, event_ids: &[ID]) -> anyhow::Result<Vec<Event>> {
        Ok(find_by(&self.events, |event| event_ids.contains(&event.id)))
    }
}
