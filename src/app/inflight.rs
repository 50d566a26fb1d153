use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Ids of operations currently being processed by this instance. A second
/// submission for the same id is refused until the first guard drops.
#[derive(Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<Uuid>>>,
}

pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, id: Uuid) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !ids.insert(id) {
            return None;
        }
        Some(InFlightGuard {
            ids: Arc::clone(&self.ids),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_submission_is_refused_while_held() {
        let inflight = InFlight::new();
        let id = Uuid::new_v4();

        let guard = inflight.try_acquire(id).expect("first acquire");
        assert!(inflight.try_acquire(id).is_none());

        drop(guard);
        assert!(inflight.try_acquire(id).is_some());
    }

    #[test]
    fn distinct_ids_do_not_block() {
        let inflight = InFlight::new();
        let _a = inflight.try_acquire(Uuid::new_v4()).unwrap();
        assert!(inflight.try_acquire(Uuid::new_v4()).is_some());
    }

    #[test]
    fn clones_share_state() {
        let inflight = InFlight::new();
        let other = inflight.clone();
        let id = Uuid::new_v4();
        let _guard = inflight.try_acquire(id).unwrap();
        assert!(other.try_acquire(id).is_none());
    }
}
