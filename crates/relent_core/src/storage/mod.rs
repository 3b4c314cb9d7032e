//! Durable persistence of the task and reminder collections.
//!
//! Both collections are stored as their JSON form under stable keys. The
//! backing key-value mechanism is pluggable through [`DurableStore`].

pub mod json_store;

use crate::error::AppError;
use crate::model::{ReminderEntry, Task};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const TASKS_KEY: &str = "tasks";
pub const REMINDERS_KEY: &str = "reminders";

/// Key-value persistence collaborator.
pub trait DurableStore: Send + Sync {
    /// Returns `None` when nothing has been stored under `key` yet.
    fn load(&self, key: &str) -> Result<Option<String>, AppError>;

    fn save(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// In-process store for tests and headless embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `save` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        let values = self
            .values
            .lock()
            .map_err(|_| AppError::io("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| AppError::io("memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<T: DurableStore + ?Sized> DurableStore for std::sync::Arc<T> {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).save(key, value)
    }
}

/// Typed access to the two persisted collections.
pub struct Persistence {
    store: Box<dyn DurableStore>,
}

impl Persistence {
    pub fn new<S: DurableStore + 'static>(store: S) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.load_collection(TASKS_KEY)
    }

    pub fn load_reminders(&self) -> Result<Vec<ReminderEntry>, AppError> {
        self.load_collection(REMINDERS_KEY)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), AppError> {
        self.save_collection(TASKS_KEY, tasks)
    }

    pub fn save_reminders(&self, entries: &[ReminderEntry]) -> Result<(), AppError> {
        self.save_collection(REMINDERS_KEY, entries)
    }

    fn load_collection<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Vec<T>, AppError> {
        match self.store.load(key)? {
            Some(content) if !content.trim().is_empty() => serde_json::from_str(&content)
                .map_err(|err| AppError::invalid_data(format!("{key}: {err}"))),
            _ => Ok(Vec::new()),
        }
    }

    fn save_collection<T: serde::Serialize>(&self, key: &str, items: &[T]) -> Result<(), AppError> {
        let content = serde_json::to_string_pretty(items)?;
        self.store.save(key, &content)
    }
}
