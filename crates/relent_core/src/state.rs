use crate::notify::Notifier;
use crate::reminder_log::ReminderLog;
use crate::storage::Persistence;
use crate::store::TaskStore;
use std::sync::atomic::AtomicBool;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Everything a scheduler tick or a mutation reads and writes in one critical section.
#[derive(Debug, Default)]
pub(crate) struct TrackerState {
    pub tasks: TaskStore,
    pub log: ReminderLog,
}

pub(crate) struct Shared {
    state: Mutex<TrackerState>,
    pub persistence: Persistence,
    pub notifier: Notifier,
    /// Set while a scheduler tick runs.
    pub tick_in_flight: AtomicBool,
}

impl Shared {
    pub fn new(state: TrackerState, persistence: Persistence, notifier: Notifier) -> Self {
        Self {
            state: Mutex::new(state),
            persistence,
            notifier,
            tick_in_flight: AtomicBool::new(false),
        }
    }

    /// Ticks and mutations build the next state on a clone and swap it in whole, so a
    /// poisoned guard still holds a consistent snapshot.
    pub fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
