use nudge_domain::ID;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};
use tokio::task::JoinHandle;

struct TimerHandle {
    generation: u64,
    task: JoinHandle<()>,
}

/// Registry of the live in-process timers, keyed by `Reminder` id.
///
/// The lock is never held across an `.await`.
#[derive(Default)]
pub struct SchedulerState {
    timers: Mutex<HashMap<ID, TimerHandle>>,
    generations: AtomicU64,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<ID, TimerHandle>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the timer task produced by `spawn` and registers it for `id`.
    /// A previously registered timer for `id` is aborted. Both happen under
    /// the registry lock, so the new task cannot observe the registry before
    /// it is registered.
    pub fn register<F>(&self, id: ID, spawn: F) -> u64
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let mut timers = self.timers();
        let task = spawn(generation);
        if let Some(previous) = timers.insert(id, TimerHandle { generation, task }) {
            previous.task.abort();
        }
        generation
    }

    /// Aborts and forgets the timer for `id`. Returns whether there was one.
    pub fn cancel(&self, id: &ID) -> bool {
        match self.timers().remove(id) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    /// Called by a timer task once it has fired. A timer that has been
    /// replaced in the meantime must not remove its successor.
    pub fn remove_if_current(&self, id: &ID, generation: u64) -> bool {
        let mut timers = self.timers();
        match timers.get(id) {
            Some(timer) if timer.generation == generation => {
                timers.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: &ID) -> bool {
        self.timers().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.timers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
