use crate::shared::entity::{Entity, ID};

/// An `Event` listed in the directory. Owned by the directory, this
/// service only reads it to render notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: ID,
    pub title: String,
    /// Start of the `Event` as a timestamp in millis
    pub date: i64,
    pub location: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
}

impl Entity for Event {
    fn id(&self) -> &ID {
        &self.id
    }
}
