mod reminder;
mod task;

pub use reminder::{Channel, ReminderEntry};
pub use task::{
    DEFAULT_DEADLINE_OFFSET_HOURS, DEFAULT_REMINDER_INTERVAL_MINUTES, PLACEHOLDER_TITLE, Task,
    TaskDraft, TaskPatch, TaskStatus,
};
