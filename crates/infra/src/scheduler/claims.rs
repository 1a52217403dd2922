use nudge_domain::ID;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// `Reminder`s that are being delivered by this process right now
#[derive(Default)]
pub struct DeliveryClaims {
    claimed: Mutex<HashSet<ID>>,
}

/// Released when dropped
pub struct DeliveryClaim {
    claims: Arc<DeliveryClaims>,
    reminder_id: ID,
}

impl DeliveryClaims {
    pub fn new() -> Self {
        Self::default()
    }

    fn claimed(&self) -> MutexGuard<'_, HashSet<ID>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `None` if another delivery of the `Reminder` is in progress
    pub fn claim(self: &Arc<Self>, reminder_id: &ID) -> Option<DeliveryClaim> {
        if !self.claimed().insert(reminder_id.clone()) {
            return None;
        }
        Some(DeliveryClaim {
            claims: self.clone(),
            reminder_id: reminder_id.clone(),
        })
    }

    pub fn is_claimed(&self, reminder_id: &ID) -> bool {
        self.claimed().contains(reminder_id)
    }
}

impl Drop for DeliveryClaim {
    fn drop(&mut self) {
        self.claims.claimed().remove(&self.reminder_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_are_exclusive_until_dropped() {
        let claims = Arc::new(DeliveryClaims::new());
        let id = ID::default();

        let claim = claims.claim(&id);
        assert!(claim.is_some());
        assert!(claims.claim(&id).is_none());
        assert!(claims.claim(&ID::default()).is_some());

        drop(claim);
        assert!(!claims.is_claimed(&id));
        assert!(claims.claim(&id).is_some());
    }
}
