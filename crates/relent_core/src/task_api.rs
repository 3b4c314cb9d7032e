use crate::config::Config;
use crate::error::AppError;
use crate::model::{ReminderEntry, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::notify::{Notifier, sink_from_env};
use crate::reminder_log::ReminderLog;
use crate::scheduler::Scheduler;
use crate::state::{Shared, TrackerState};
use crate::storage::Persistence;
use crate::storage::json_store::{self, JsonFileStore};
use crate::store::TaskStore;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub done: usize,
    pub pending: usize,
    /// Reminders currently retained in the log.
    pub pings: usize,
}

/// Mutation surface shared by the CLI, the console and parsed drafts.
///
/// Every call is one critical section over the task store, serialised with
/// scheduler ticks through the same lock.
#[derive(Clone)]
pub struct Tracker {
    shared: Arc<Shared>,
}

impl Tracker {
    /// Loads both collections; absent collections start empty.
    pub fn open(persistence: Persistence, notifier: Notifier) -> Result<Self, AppError> {
        let tasks = persistence.load_tasks()?;
        let log = persistence.load_reminders()?;
        debug!(tasks = tasks.len(), reminders = log.len(), "tracker state loaded");

        let state = TrackerState {
            tasks: TaskStore::from_tasks(tasks),
            log: ReminderLog::from_entries(log),
        };
        Ok(Self {
            shared: Arc::new(Shared::new(state, persistence, notifier)),
        })
    }

    /// Opens the JSON file store and platform notifier described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let dir = json_store::store_dir(config.store_dir.as_deref())?;
        let notifier = Notifier::new(sink_from_env(config.notifications_enabled()));
        Self::open(Persistence::new(JsonFileStore::new(dir)), notifier)
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(Arc::clone(&self.shared))
    }

    pub fn notifier(&self) -> &Notifier {
        &self.shared.notifier
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    pub fn create(&self, draft: TaskDraft) -> Result<Task, AppError> {
        self.create_at(draft, OffsetDateTime::now_utc())
    }

    pub fn create_at(&self, draft: TaskDraft, now: OffsetDateTime) -> Result<Task, AppError> {
        let task = self.mutate(|tasks| tasks.create(draft, now))?;
        info!(task_id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    /// All tasks, newest-created first.
    pub fn list(&self) -> Vec<Task> {
        self.shared.lock().tasks.list().to_vec()
    }

    pub fn pending(&self) -> Vec<Task> {
        self.shared
            .lock()
            .tasks
            .list()
            .iter()
            .filter(|task| task.is_pending())
            .cloned()
            .collect()
    }

    /// Case-insensitive match on title or description. A blank query lists everything.
    pub fn search(&self, query: &str) -> Vec<Task> {
        let needle = query.trim().to_lowercase();
        self.shared
            .lock()
            .tasks
            .list()
            .iter()
            .filter(|task| {
                needle.is_empty()
                    || task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<Task, AppError> {
        let id = require_id(id)?;
        self.shared.lock().tasks.get(id).cloned()
    }

    pub fn find_by_prefix(&self, prefix: &str) -> Result<Task, AppError> {
        self.shared.lock().tasks.find_by_prefix(prefix).cloned()
    }

    pub fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, AppError> {
        let id = require_id(id)?;
        if patch.is_empty() {
            return Err(AppError::validation("nothing to update"));
        }
        let task = self.mutate(|tasks| tasks.update(id, patch))?;
        info!(task_id = %task.id, "task updated");
        Ok(task)
    }

    /// Flips PENDING and DONE. Resolving a task clears its alert.
    pub fn toggle_status(&self, id: &str) -> Result<Task, AppError> {
        let id = require_id(id)?;
        let mut state = self.shared.lock();
        let mut next = state.tasks.clone();
        let task = next.toggle_status(id)?;
        self.shared.persistence.save_tasks(next.list())?;
        state.tasks = next;

        if task.status == TaskStatus::Done {
            self.shared.notifier.clear(&task.title);
        }
        drop(state);

        info!(task_id = %task.id, status = task.status.label(), "task status toggled");
        Ok(task)
    }

    /// Hard delete. Log entries keep referring to the removed id.
    pub fn delete(&self, id: &str) -> Result<Task, AppError> {
        let id = require_id(id)?;
        let task = self.mutate(|tasks| tasks.delete(id))?;
        info!(task_id = %task.id, "task deleted");
        Ok(task)
    }

    /// Firings, newest first.
    pub fn reminder_log(&self) -> Vec<ReminderEntry> {
        self.shared.lock().log.entries().to_vec()
    }

    pub fn stats(&self) -> TaskStats {
        let state = self.shared.lock();
        TaskStats {
            total: state.tasks.len(),
            done: state.tasks.count_by_status(TaskStatus::Done),
            pending: state.tasks.count_by_status(TaskStatus::Pending),
            pings: state.log.len(),
        }
    }

    pub fn active_notifications(&self) -> Vec<String> {
        self.shared.notifier.active()
    }

    /// Applies `change` to a copy of the store and swaps it in only once persisted.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut TaskStore) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut state = self.shared.lock();
        let mut next = state.tasks.clone();
        let result = change(&mut next)?;
        self.shared.persistence.save_tasks(next.list())?;
        state.tasks = next;
        Ok(result)
    }
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("id is required"));
    }
    Ok(trimmed)
}
