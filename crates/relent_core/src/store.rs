use crate::error::AppError;
use crate::model::{Task, TaskDraft, TaskPatch, TaskStatus};
use time::OffsetDateTime;
use uuid::Uuid;

/// Authoritative in-memory task collection, newest-created first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn create(&mut self, draft: TaskDraft, now: OffsetDateTime) -> Result<Task, AppError> {
        let id = self.fresh_id();
        let task = draft.into_task(id, now)?;
        self.tasks.insert(0, task.clone());
        Ok(task)
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Result<&Task, AppError> {
        self.tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or_else(|| not_found(id))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Result<&mut Task, AppError> {
        self.tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| not_found(id))
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Resolves an id prefix. An exact id wins, then the newest pending match, then
    /// the newest match of any status.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&Task, AppError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(AppError::validation("id is required"));
        }

        if let Some(task) = self.tasks.iter().find(|task| task.id == prefix) {
            return Ok(task);
        }

        let mut matches = self.tasks.iter().filter(|task| task.id.starts_with(prefix));
        let first = matches.next().ok_or_else(|| not_found(prefix))?;
        if first.is_pending() {
            return Ok(first);
        }
        Ok(matches.find(|task| task.is_pending()).unwrap_or(first))
    }

    pub fn update(&mut self, id: &str, patch: &TaskPatch) -> Result<Task, AppError> {
        let task = self.get_mut(id)?;
        patch.apply(task)?;
        Ok(task.clone())
    }

    pub fn toggle_status(&mut self, id: &str) -> Result<Task, AppError> {
        let task = self.get_mut(id)?;
        task.status = task.status.toggled();
        Ok(task.clone())
    }

    pub fn delete(&mut self, id: &str) -> Result<Task, AppError> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(self.tasks.remove(index))
    }

    pub fn count_by_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|task| task.status == status).count()
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.tasks.iter().all(|task| task.id != id) {
                return id;
            }
        }
    }
}

fn not_found(id: &str) -> AppError {
    AppError::not_found(format!("task \"{id}\" not found"))
}
